use std::fmt;

use log::kv::{self, VisitSource};
use sentry_core::protocol::Value;

use crate::entry::{Entry, Field, Level};
use crate::hooks::{Hook, LevelHooks};

/// Turns the key-values of a record into entry fields.
struct FieldVisitor<'a>(&'a mut Entry);

impl<'kvs> VisitSource<'kvs> for FieldVisitor<'_> {
    fn visit_pair(&mut self, key: kv::Key<'kvs>, value: kv::Value<'kvs>) -> Result<(), kv::Error> {
        self.0
            .fields
            .insert(key.as_str().to_owned(), Field::Value(value_from_kv(&value)));
        Ok(())
    }
}

fn value_from_kv(value: &kv::Value<'_>) -> Value {
    if let Some(b) = value.to_bool() {
        Value::from(b)
    } else if let Some(i) = value.to_i64() {
        Value::from(i)
    } else if let Some(u) = value.to_u64() {
        Value::from(u)
    } else if let Some(f) = value.to_f64() {
        Value::from(f)
    } else if let Some(s) = value.to_borrowed_str() {
        Value::from(s)
    } else {
        Value::from(value.to_string())
    }
}

/// Creates an [`Entry`] from a [`log::Record`].
///
/// Key-values of the record become fields. Errors logged as key-values are
/// only available by reference and are recorded through their `Display`
/// implementation. If visiting the key-values fails, the fields collected
/// so far are kept and the error is returned alongside the entry.
fn entry_from_record(record: &log::Record<'_>) -> (Entry, Option<kv::Error>) {
    let mut entry = Entry::new(record.level().into(), record.args().to_string())
        .with_target(record.target());
    let result = record.key_values().visit(&mut FieldVisitor(&mut entry));
    (entry, result.err())
}

/// Provides a dispatching logger.
///
/// Records are fired at the hooks registered for their level, and are then
/// passed on to an optional destination logger. Records of the crate's own
/// diagnostics target never reach the hooks.
///
/// # Examples
///
/// ```
/// use sentry_hook::{HookOptions, Level, Logger, SentryHook};
///
/// let hook = SentryHook::new(HookOptions::new([Level::Error])).unwrap();
/// let logger = Logger::new().with_hook(hook);
///
/// log::set_boxed_logger(Box::new(logger)).unwrap();
/// log::set_max_level(log::LevelFilter::Info);
/// ```
#[derive(Default)]
pub struct Logger {
    hooks: LevelHooks,
    dest_log: Option<Box<dyn log::Log>>,
    debug: bool,
}

impl Logger {
    /// Creates a logger without hooks and without a destination.
    pub fn new() -> Logger {
        Logger::default()
    }

    /// Registers a hook for all of its levels.
    #[must_use]
    pub fn with_hook<H: Hook + 'static>(mut self, hook: H) -> Logger {
        self.hooks.add(hook);
        self
    }

    /// Replaces all registered hooks.
    #[must_use]
    pub fn with_hooks(mut self, hooks: LevelHooks) -> Logger {
        self.hooks = hooks;
        self
    }

    /// Sets the destination logger records are passed on to.
    #[must_use]
    pub fn with_dest<L: log::Log + 'static>(mut self, dest_log: L) -> Logger {
        self.dest_log = Some(Box::new(dest_log));
        self
    }

    /// Prints diagnostics about failing hooks to stderr.
    #[must_use]
    pub fn with_debug(mut self, debug: bool) -> Logger {
        self.debug = debug;
        self
    }

    /// Returns the registered hooks.
    pub fn hooks(&self) -> &LevelHooks {
        &self.hooks
    }
}

impl fmt::Debug for Logger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Logger")
            .field("hooks", &self.hooks)
            .field("dest_log", &self.dest_log.as_ref().map(|_| "dyn Log"))
            .field("debug", &self.debug)
            .finish()
    }
}

impl log::Log for Logger {
    fn enabled(&self, md: &log::Metadata<'_>) -> bool {
        self.hooks.is_enabled(Level::from(md.level()))
            || self.dest_log.as_ref().is_some_and(|x| x.enabled(md))
    }

    fn log(&self, record: &log::Record<'_>) {
        if record.target() != crate::DEBUG_TARGET && self.hooks.is_enabled(record.level().into()) {
            let (entry, kv_error) = entry_from_record(record);
            if let Some(err) = kv_error {
                hook_debug!(self.debug, "failed to read key-values: {}", err);
            }
            if let Err(err) = self.hooks.fire(&entry) {
                hook_debug!(self.debug, "failed to fire hooks: {}", err);
            }
        }
        if let Some(ref log) = self.dest_log {
            if log.enabled(record.metadata()) {
                log.log(record);
            }
        }
    }

    fn flush(&self) {
        if let Some(ref log) = self.dest_log {
            log.flush();
        }
    }
}
