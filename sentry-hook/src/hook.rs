use std::collections::BTreeSet;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

use sentry_core::protocol::{Map, Value};
use sentry_core::types::Uuid;

use crate::converters::{Capture, ConvertContext, Converter, EventConverter};
use crate::entry::{Entry, Level};
use crate::hooks::{Hook, HookError};
use crate::sink::{default_sink, Sink, SinkError};

/// Options for a [`SentryHook`].
///
/// # Examples
///
/// ```
/// use sentry_hook::{HookOptions, Level, ScopeConverter, SentryHook};
///
/// let hook = SentryHook::new(
///     HookOptions::new([Level::Error, Level::Fatal, Level::Panic])
///         .tag("service", "billing")
///         .extra("build", "1f2e3d")
///         .converter(ScopeConverter),
/// )
/// .unwrap();
/// ```
pub struct HookOptions {
    levels: Vec<Level>,
    tags: Map<String, String>,
    extra: Map<String, Value>,
    converter: Option<Arc<dyn Converter>>,
    sink: Option<Arc<dyn Sink>>,
    debug: bool,
}

impl HookOptions {
    /// Creates options for a hook that fires for `levels`.
    pub fn new<I>(levels: I) -> HookOptions
    where
        I: IntoIterator<Item = Level>,
    {
        HookOptions {
            levels: levels.into_iter().collect(),
            tags: Map::new(),
            extra: Map::new(),
            converter: None,
            sink: None,
            debug: false,
        }
    }

    /// Adds a tag to every event.
    ///
    /// Entries carrying a field with the same key override the value.
    pub fn tag<K, V>(mut self, key: K, value: V) -> HookOptions
    where
        K: Into<String>,
        V: Into<String>,
    {
        self.tags.insert(key.into(), value.into());
        self
    }

    /// Adds extra data to every event.
    ///
    /// Entries carrying a field with the same key override the value.
    pub fn extra<K, V>(mut self, key: K, value: V) -> HookOptions
    where
        K: Into<String>,
        V: Into<Value>,
    {
        self.extra.insert(key.into(), value.into());
        self
    }

    /// Replaces the default [`EventConverter`].
    pub fn converter<C: Converter + 'static>(mut self, converter: C) -> HookOptions {
        self.converter = Some(Arc::new(converter));
        self
    }

    /// Sends captures to `sink` instead of the [`default_sink`].
    pub fn sink<S: Sink + 'static>(mut self, sink: S) -> HookOptions {
        self.sink = Some(Arc::new(sink));
        self
    }

    /// Prints diagnostics about every capture to stderr.
    pub fn debug(mut self, debug: bool) -> HookOptions {
        self.debug = debug;
        self
    }
}

impl fmt::Debug for HookOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        #[derive(Debug)]
        struct Custom;

        f.debug_struct("HookOptions")
            .field("levels", &self.levels)
            .field("tags", &self.tags)
            .field("extra", &self.extra)
            .field("converter", &self.converter.as_ref().map(|_| Custom))
            .field("sink", &self.sink.as_ref().map(|_| Custom))
            .field("debug", &self.debug)
            .finish()
    }
}

struct HookInner {
    levels: Vec<Level>,
    tags: Map<String, String>,
    extra: Map<String, Value>,
    converter: Arc<dyn Converter>,
    sink: Arc<dyn Sink>,
    debug: bool,
}

impl HookInner {
    fn dispatch(&self, capture: Capture) -> Result<Option<Uuid>, SinkError> {
        match capture {
            Capture::Ignore => Ok(None),
            Capture::Event(event) => self.sink.capture_event(event).map(Some),
            Capture::Exception(scope, error) => self.sink.capture_error(&scope, &error).map(Some),
            Capture::Message(scope, message) => {
                self.sink.capture_message(&scope, &message).map(Some)
            }
        }
    }
}

/// A [`Hook`] that sends log entries to Sentry.
///
/// Every entry the hook is fired for is converted by the configured
/// [`Converter`] and handed to the configured [`Sink`]. Failing or
/// panicking sinks never surface to the logger: [`fire`](Hook::fire)
/// always succeeds.
///
/// The hook is cheap to clone and can be shared between threads; its
/// configuration is immutable.
#[derive(Clone)]
pub struct SentryHook(Arc<HookInner>);

impl SentryHook {
    /// Creates a hook from `options`.
    ///
    /// Fails with [`HookError::NoLevels`] if no level was given. Without an
    /// explicit sink the [`default_sink`] is used.
    pub fn new(options: HookOptions) -> Result<SentryHook, HookError> {
        let levels: Vec<Level> = options
            .levels
            .into_iter()
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();
        if levels.is_empty() {
            return Err(HookError::NoLevels);
        }

        Ok(SentryHook(Arc::new(HookInner {
            levels,
            tags: options.tags,
            extra: options.extra,
            converter: options
                .converter
                .unwrap_or_else(|| Arc::new(EventConverter) as Arc<dyn Converter>),
            sink: options.sink.unwrap_or_else(default_sink),
            debug: options.debug,
        })))
    }

    /// Creates a hook with default options for `levels`.
    pub fn with_levels<I>(levels: I) -> Result<SentryHook, HookError>
    where
        I: IntoIterator<Item = Level>,
    {
        SentryHook::new(HookOptions::new(levels))
    }
}

impl fmt::Debug for SentryHook {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SentryHook")
            .field("levels", &self.0.levels)
            .field("tags", &self.0.tags)
            .field("extra", &self.0.extra)
            .finish()
    }
}

impl Hook for SentryHook {
    fn levels(&self) -> &[Level] {
        &self.0.levels
    }

    fn fire(&self, entry: &Entry) -> Result<(), HookError> {
        let inner = &*self.0;
        let result = panic::catch_unwind(AssertUnwindSafe(|| {
            let cx = ConvertContext {
                attach_stacktrace: inner.sink.options().attach_stacktrace,
                tags: &inner.tags,
                extra: &inner.extra,
            };
            inner.dispatch(inner.converter.convert(entry, &cx))
        }));

        match result {
            Ok(Ok(Some(event_id))) => {
                hook_debug!(inner.debug, "captured {} entry as {}", entry.level, event_id);
            }
            Ok(Ok(None)) => {
                hook_debug!(inner.debug, "ignored {} entry", entry.level);
            }
            Ok(Err(err)) => {
                hook_debug!(inner.debug, "failed to capture {} entry: {}", entry.level, err);
            }
            Err(_) => {
                hook_debug!(inner.debug, "panicked while capturing {} entry", entry.level);
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use sentry_core::protocol::Event;

    use super::*;
    use crate::converters::ScopeConverter;
    use crate::test::{Captured, FailingSink, TestSink};

    #[derive(Debug, thiserror::Error)]
    #[error("boom")]
    struct Boom;

    struct PanickingSink(AtomicUsize);

    impl Sink for PanickingSink {
        fn capture_event(&self, _event: Event<'static>) -> Result<Uuid, SinkError> {
            self.0.fetch_add(1, Ordering::SeqCst);
            panic!("transport exploded");
        }
    }

    #[test]
    fn requires_levels() {
        assert!(matches!(
            SentryHook::with_levels([]),
            Err(HookError::NoLevels)
        ));
    }

    #[test]
    fn levels_are_a_sorted_set() {
        let hook = SentryHook::new(
            HookOptions::new([Level::Panic, Level::Error, Level::Panic]).sink(TestSink::new()),
        )
        .unwrap();
        assert_eq!(hook.levels(), &[Level::Error, Level::Panic]);
    }

    #[test]
    fn fire_hands_events_to_the_sink() {
        let sink = TestSink::new();
        let hook = SentryHook::new(
            HookOptions::new([Level::Error])
                .tag("env", "prod")
                .sink(sink.clone()),
        )
        .unwrap();

        hook.fire(&Entry::new(Level::Error, "failed").with_error(Boom))
            .unwrap();

        let captured = sink.fetch_and_clear();
        assert_eq!(captured.len(), 1);
        match &captured[0] {
            Captured::Event(event) => {
                assert_eq!(event.level, sentry_core::Level::Error);
                assert_eq!(event.tags["env"], "prod");
                assert_eq!(event.exception.len(), 1);
                assert!(event.exception[0].stacktrace.is_none());
            }
            other => panic!("expected an event, got {:?}", other),
        }
    }

    #[test]
    fn attach_stacktrace_comes_from_the_sink() {
        let sink = TestSink::with_options(crate::SinkOptions {
            attach_stacktrace: true,
        });
        let hook = SentryHook::new(HookOptions::new([Level::Error]).sink(sink.clone())).unwrap();

        let error = crate::ErrorValue::new(Boom).with_backtrace(backtrace::Backtrace::new());
        hook.fire(&Entry::new(Level::Error, "failed").with_error_value(error))
            .unwrap();

        match &sink.fetch_and_clear()[0] {
            Captured::Event(event) => {
                let stacktrace = event.exception[0].stacktrace.as_ref().unwrap();
                assert!(!stacktrace.frames.is_empty());
            }
            other => panic!("expected an event, got {:?}", other),
        }
    }

    #[test]
    fn scope_converter_captures_exception_or_message() {
        let sink = TestSink::new();
        let hook = SentryHook::new(
            HookOptions::new(Level::ALL)
                .converter(ScopeConverter)
                .sink(sink.clone()),
        )
        .unwrap();

        hook.fire(&Entry::new(Level::Info, "hello")).unwrap();
        hook.fire(&Entry::new(Level::Error, "failed").with_error(Boom))
            .unwrap();

        let captured = sink.fetch_and_clear();
        assert_eq!(captured.len(), 2);
        assert!(matches!(&captured[0], Captured::Message(_, message) if message == "hello"));
        assert!(matches!(&captured[1], Captured::Exception(_, error) if error.to_string() == "boom"));
    }

    #[test]
    fn ignored_entries_reach_no_sink() {
        let sink = TestSink::new();
        let hook = SentryHook::new(
            HookOptions::new([Level::Debug])
                .converter(|_: &Entry, _: &ConvertContext<'_>| Capture::Ignore)
                .sink(sink.clone()),
        )
        .unwrap();

        hook.fire(&Entry::new(Level::Debug, "noise")).unwrap();
        assert!(sink.fetch_and_clear().is_empty());
    }

    #[test]
    fn sink_failures_are_absorbed() {
        let hook = SentryHook::new(HookOptions::new([Level::Error]).sink(FailingSink))
            .unwrap();
        assert!(hook.fire(&Entry::new(Level::Error, "lost")).is_ok());

        let hook = SentryHook::new(
            HookOptions::new([Level::Error])
                .converter(ScopeConverter)
                .sink(FailingSink),
        )
        .unwrap();
        assert!(hook
            .fire(&Entry::new(Level::Error, "lost").with_error(Boom))
            .is_ok());
    }

    #[test]
    fn sink_panics_are_absorbed() {
        let sink = Arc::new(PanickingSink(AtomicUsize::new(0)));
        let hook = SentryHook::new(HookOptions::new([Level::Fatal]).sink(sink.clone())).unwrap();

        assert!(hook.fire(&Entry::new(Level::Fatal, "down")).is_ok());
        assert!(hook.fire(&Entry::new(Level::Fatal, "down")).is_ok());
        assert_eq!(sink.0.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn concurrent_fires_build_independent_events() {
        let sink = TestSink::new();
        let hook = SentryHook::new(HookOptions::new([Level::Warn]).sink(sink.clone())).unwrap();

        std::thread::scope(|s| {
            for n in 0..4 {
                let hook = hook.clone();
                s.spawn(move || {
                    hook.fire(&Entry::new(Level::Warn, "busy").with_field("worker", n))
                        .unwrap();
                });
            }
        });

        let mut workers: Vec<_> = sink
            .fetch_and_clear()
            .into_iter()
            .map(|captured| match captured {
                Captured::Event(event) => event.extra["worker"].as_u64().unwrap(),
                other => panic!("expected an event, got {:?}", other),
            })
            .collect();
        workers.sort();
        assert_eq!(workers, vec![0, 1, 2, 3]);
    }
}
