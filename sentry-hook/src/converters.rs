use sentry_core::protocol::{Event, Map, User, Value};

use crate::entry::{Entry, ErrorValue, Field, ERROR_KEY};
use crate::exception::exception_from_error;
use crate::level::convert_level;
use crate::sink::ScopeUpdate;

/// The field key that is turned into the user of a capture by the
/// [`ScopeConverter`].
pub const USER_ID_KEY: &str = "user_id";

/// What the hook should hand to the sink for an [`Entry`].
#[allow(clippy::large_enum_variant)]
#[derive(Clone, Debug)]
pub enum Capture {
    /// Ignore the entry.
    Ignore,
    /// Capture the assembled [`Event`].
    Event(Event<'static>),
    /// Capture the error under an isolated scope.
    Exception(ScopeUpdate, ErrorValue),
    /// Capture the message under an isolated scope.
    Message(ScopeUpdate, String),
}

/// Data available to a [`Converter`] besides the entry itself.
#[derive(Clone, Copy, Debug)]
pub struct ConvertContext<'a> {
    /// Whether the sink wants stacktraces attached to errors.
    pub attach_stacktrace: bool,
    /// Tags configured on the hook.
    pub tags: &'a Map<String, String>,
    /// Extra data configured on the hook.
    pub extra: &'a Map<String, Value>,
}

/// Turns log entries into captures.
///
/// Any `Fn(&Entry, &ConvertContext<'_>) -> Capture` is a converter:
///
/// ```
/// use sentry_hook::{event_from_entry, Capture, ConvertContext, Entry, HookOptions, Level};
///
/// let options = HookOptions::new([Level::Error]).converter(|entry: &Entry, cx: &ConvertContext<'_>| {
///     let mut event = event_from_entry(entry, cx);
///     event.logger = Some("billing".into());
///     Capture::Event(event)
/// });
/// ```
pub trait Converter: Send + Sync {
    /// Converts a single entry.
    fn convert(&self, entry: &Entry, cx: &ConvertContext<'_>) -> Capture;
}

impl<F> Converter for F
where
    F: Fn(&Entry, &ConvertContext<'_>) -> Capture + Send + Sync,
{
    fn convert(&self, entry: &Entry, cx: &ConvertContext<'_>) -> Capture {
        self(entry, cx)
    }
}

/// The default converter, capturing every entry as a structured event.
///
/// See [`event_from_entry`].
#[derive(Clone, Copy, Debug, Default)]
pub struct EventConverter;

impl Converter for EventConverter {
    fn convert(&self, entry: &Entry, cx: &ConvertContext<'_>) -> Capture {
        Capture::Event(event_from_entry(entry, cx))
    }
}

/// A converter that enriches an isolated scope and captures either the
/// entry's error or its message.
///
/// See [`scope_from_entry`].
#[derive(Clone, Copy, Debug, Default)]
pub struct ScopeConverter;

impl Converter for ScopeConverter {
    fn convert(&self, entry: &Entry, cx: &ConvertContext<'_>) -> Capture {
        let scope = scope_from_entry(entry, cx);
        match entry.error() {
            Some(error) => Capture::Exception(scope, error.clone()),
            None => Capture::Message(scope, entry.message.clone()),
        }
    }
}

fn is_captured_error(key: &str, field: &Field) -> bool {
    key == ERROR_KEY && matches!(field, Field::Error(_))
}

fn tag_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Merges the hook's static data with the entry's fields.
///
/// Fields win over static extra of the same key, and a field whose key
/// matches a static tag replaces that tag's value.
fn merge_context(
    entry: &Entry,
    cx: &ConvertContext<'_>,
    skip: impl Fn(&str, &Field) -> bool,
) -> (Map<String, Value>, Map<String, String>) {
    let mut extra = cx.extra.clone();
    for (key, field) in &entry.fields {
        if skip(key.as_str(), field) {
            continue;
        }
        extra.insert(key.clone(), field.to_value());
    }

    let tags = cx
        .tags
        .iter()
        .map(|(key, value)| {
            let value = match entry.fields.get(key) {
                Some(field) if !skip(key.as_str(), field) => tag_value(&field.to_value()),
                _ => value.clone(),
            };
            (key.clone(), value)
        })
        .collect();

    (extra, tags)
}

/// Creates an [`Event`] from an [`Entry`].
///
/// All fields end up in `extra`, except an error stored under
/// [`ERROR_KEY`], which becomes the single exception of the event. The
/// hook's static extra and tags only fill in what the entry does not set.
///
/// # Examples
///
/// ```
/// use sentry_hook::{event_from_entry, ConvertContext, Entry, Level};
/// use sentry_core::protocol::Map;
///
/// let tags = Map::new();
/// let extra = Map::new();
/// let cx = ConvertContext { attach_stacktrace: false, tags: &tags, extra: &extra };
///
/// let entry = Entry::new(Level::Warn, "slow request").with_field("ms", 1200);
/// let event = event_from_entry(&entry, &cx);
///
/// assert_eq!(event.level, sentry_core::Level::Warning);
/// assert_eq!(event.message.as_deref(), Some("slow request"));
/// assert_eq!(event.extra["ms"], 1200);
/// assert!(event.exception.is_empty());
/// ```
pub fn event_from_entry(entry: &Entry, cx: &ConvertContext<'_>) -> Event<'static> {
    let (extra, tags) = merge_context(entry, cx, is_captured_error);

    let mut event = Event {
        level: convert_level(entry.level),
        message: Some(entry.message.clone()).filter(|m| !m.is_empty()),
        logger: entry.target.clone(),
        extra,
        tags,
        ..Default::default()
    };

    if let Some(error) = entry.error() {
        event.exception = vec![exception_from_error(error, cx.attach_stacktrace)].into();
    }

    event
}

/// Creates a [`ScopeUpdate`] from an [`Entry`].
///
/// The level comes from the entry, fields are merged into extra like in
/// [`event_from_entry`], and a string `user_id` field becomes the user of
/// the capture instead of an extra value.
pub fn scope_from_entry(entry: &Entry, cx: &ConvertContext<'_>) -> ScopeUpdate {
    let user_id = match entry.fields.get(USER_ID_KEY) {
        Some(Field::Value(Value::String(id))) => Some(id.clone()),
        _ => None,
    };
    let is_user_id = user_id.is_some();

    let (extra, tags) = merge_context(entry, cx, |key, field| {
        is_captured_error(key, field) || (is_user_id && key == USER_ID_KEY)
    });

    ScopeUpdate {
        level: Some(convert_level(entry.level)),
        user: user_id.map(|id| User {
            id: Some(id),
            ..Default::default()
        }),
        extra,
        tags,
    }
}
