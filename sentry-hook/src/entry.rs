use std::collections::BTreeMap;
use std::error::Error;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use backtrace::Backtrace;
use sentry_core::protocol::Value;

/// The field key under which an entry stores its error.
pub const ERROR_KEY: &str = "error";

/// The severity of a log [`Entry`].
///
/// Levels are ordered from the least to the most severe, so
/// `Level::Trace < Level::Panic`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Level {
    /// Very fine grained diagnostics.
    Trace,
    /// Debugging output.
    Debug,
    /// Regular operational messages.
    Info,
    /// Something unexpected happened but the application keeps going.
    Warn,
    /// An operation failed.
    Error,
    /// The application is about to exit.
    Fatal,
    /// The application is about to panic.
    Panic,
}

impl Level {
    /// All levels, least severe first.
    pub const ALL: [Level; 7] = [
        Level::Trace,
        Level::Debug,
        Level::Info,
        Level::Warn,
        Level::Error,
        Level::Fatal,
        Level::Panic,
    ];

    /// Returns the lowercase name of the level.
    pub fn as_str(self) -> &'static str {
        match self {
            Level::Trace => "trace",
            Level::Debug => "debug",
            Level::Info => "info",
            Level::Warn => "warn",
            Level::Error => "error",
            Level::Fatal => "fatal",
            Level::Panic => "panic",
        }
    }
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when parsing an unknown [`Level`] name.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
#[error("unknown log level `{0}`")]
pub struct ParseLevelError(String);

impl FromStr for Level {
    type Err = ParseLevelError;

    fn from_str(s: &str) -> Result<Level, ParseLevelError> {
        Ok(match s.trim().to_ascii_lowercase().as_str() {
            "trace" => Level::Trace,
            "debug" => Level::Debug,
            "info" => Level::Info,
            "warn" | "warning" => Level::Warn,
            "error" => Level::Error,
            "fatal" => Level::Fatal,
            "panic" => Level::Panic,
            _ => return Err(ParseLevelError(s.to_owned())),
        })
    }
}

#[cfg(feature = "log")]
impl From<log::Level> for Level {
    fn from(level: log::Level) -> Level {
        match level {
            log::Level::Error => Level::Error,
            log::Level::Warn => Level::Warn,
            log::Level::Info => Level::Info,
            log::Level::Debug => Level::Debug,
            log::Level::Trace => Level::Trace,
        }
    }
}

/// An error attached to an [`Entry`].
///
/// The type name of the error is recorded when the value is created from a
/// concrete error type, so exceptions can be named without inspecting the
/// error at runtime.
#[derive(Clone)]
pub struct ErrorValue {
    error: Arc<dyn Error + Send + Sync + 'static>,
    type_name: Option<&'static str>,
    backtrace: Option<Backtrace>,
}

impl ErrorValue {
    /// Wraps a concrete error, recording its type name.
    pub fn new<E>(error: E) -> ErrorValue
    where
        E: Error + Send + Sync + 'static,
    {
        ErrorValue {
            error: Arc::new(error),
            type_name: Some(std::any::type_name::<E>()),
            backtrace: None,
        }
    }

    /// Wraps an already boxed error.
    ///
    /// The concrete type is erased at this point, so the type name is
    /// unknown unless set with [`with_type_name`](Self::with_type_name).
    pub fn from_boxed(error: Box<dyn Error + Send + Sync + 'static>) -> ErrorValue {
        ErrorValue {
            error: Arc::from(error),
            type_name: None,
            backtrace: None,
        }
    }

    /// Overrides the recorded type name.
    pub fn with_type_name(mut self, type_name: &'static str) -> ErrorValue {
        self.type_name = Some(type_name);
        self
    }

    /// Attaches the backtrace of the place where the error originated.
    pub fn with_backtrace(mut self, backtrace: Backtrace) -> ErrorValue {
        self.backtrace = Some(backtrace);
        self
    }

    /// The wrapped error.
    pub fn error(&self) -> &(dyn Error + Send + Sync + 'static) {
        &*self.error
    }

    /// The full type name of the error, if known.
    pub fn type_name(&self) -> Option<&'static str> {
        self.type_name
    }

    /// The attached backtrace, if any.
    pub fn backtrace(&self) -> Option<&Backtrace> {
        self.backtrace.as_ref()
    }
}

impl fmt::Debug for ErrorValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ErrorValue")
            .field("error", &self.error)
            .field("type_name", &self.type_name)
            .field("backtrace", &self.backtrace.is_some())
            .finish()
    }
}

impl fmt::Display for ErrorValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.error, f)
    }
}

/// The value of a single [`Entry`] field.
#[derive(Clone, Debug)]
pub enum Field {
    /// Structured data.
    Value(Value),
    /// An error.
    Error(ErrorValue),
}

impl Field {
    /// Returns the field as a JSON value.
    ///
    /// Errors are rendered through their `Display` implementation.
    pub fn to_value(&self) -> Value {
        match self {
            Field::Value(value) => value.clone(),
            Field::Error(error) => Value::String(error.to_string()),
        }
    }
}

/// A single structured log entry.
///
/// # Examples
///
/// ```
/// use sentry_hook::{Entry, Level};
///
/// let entry = Entry::new(Level::Warn, "disk almost full")
///     .with_field("mount", "/var")
///     .with_field("free_bytes", 1024);
///
/// assert_eq!(entry.fields.len(), 2);
/// assert!(entry.error().is_none());
/// ```
#[derive(Clone, Debug)]
pub struct Entry {
    /// The severity of the entry.
    pub level: Level,
    /// The formatted message.
    pub message: String,
    /// The name of the logger that produced the entry.
    pub target: Option<String>,
    /// Structured fields.
    pub fields: BTreeMap<String, Field>,
}

impl Entry {
    /// Creates an entry without fields.
    pub fn new<M: Into<String>>(level: Level, message: M) -> Entry {
        Entry {
            level,
            message: message.into(),
            target: None,
            fields: BTreeMap::new(),
        }
    }

    /// Sets the logger name.
    pub fn with_target<T: Into<String>>(mut self, target: T) -> Entry {
        self.target = Some(target.into());
        self
    }

    /// Adds a structured field, replacing any previous value for `key`.
    pub fn with_field<K, V>(mut self, key: K, value: V) -> Entry
    where
        K: Into<String>,
        V: Into<Value>,
    {
        self.fields.insert(key.into(), Field::Value(value.into()));
        self
    }

    /// Stores an error under [`ERROR_KEY`].
    pub fn with_error<E>(self, error: E) -> Entry
    where
        E: Error + Send + Sync + 'static,
    {
        self.with_error_value(ErrorValue::new(error))
    }

    /// Stores an already wrapped error under [`ERROR_KEY`].
    pub fn with_error_value(mut self, error: ErrorValue) -> Entry {
        self.fields.insert(ERROR_KEY.into(), Field::Error(error));
        self
    }

    /// Returns the error stored under [`ERROR_KEY`], if that field holds one.
    pub fn error(&self) -> Option<&ErrorValue> {
        match self.fields.get(ERROR_KEY) {
            Some(Field::Error(error)) => Some(error),
            _ => None,
        }
    }
}
