use std::error::Error;
use std::sync::Arc;

use sentry_core::protocol::{Event, Map, User, Value};
use sentry_core::types::Uuid;
use sentry_core::{Hub, Scope};

use crate::entry::ErrorValue;
use crate::exception::exception_from_error;

/// Capture-time options exposed by a [`Sink`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SinkOptions {
    /// Whether stacktraces should be attached to captured errors.
    pub attach_stacktrace: bool,
}

/// Errors reported by a [`Sink`] when a capture did not go through.
#[derive(Debug, thiserror::Error)]
pub enum SinkError {
    /// The sink has no client to send events with.
    #[error("no client is bound to the sink")]
    Inactive,
    /// The client dropped the event, for example through sampling.
    #[error("the event was discarded")]
    Discarded,
    /// Any other failure of the sink.
    #[error("capture failed: {0}")]
    Failed(#[source] Box<dyn Error + Send + Sync + 'static>),
}

/// Enrichment for a single capture.
///
/// A `ScopeUpdate` is applied to an isolated copy of the sink's scope, never
/// to the scope other captures see.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ScopeUpdate {
    /// Overrides the level of the captured event.
    pub level: Option<sentry_core::Level>,
    /// The user the capture is attributed to.
    pub user: Option<User>,
    /// Additional unindexed data.
    pub extra: Map<String, Value>,
    /// Additional indexed data.
    pub tags: Map<String, String>,
}

impl ScopeUpdate {
    /// Applies the update to a [`Scope`].
    pub fn apply(&self, scope: &mut Scope) {
        if let Some(level) = self.level {
            scope.set_level(Some(level));
        }
        if let Some(user) = &self.user {
            scope.set_user(Some(user.clone()));
        }
        for (key, value) in &self.tags {
            scope.set_tag(key, value);
        }
        for (key, value) in &self.extra {
            scope.set_extra(key, value.clone());
        }
    }

    /// Applies the update directly to an [`Event`].
    pub fn apply_to_event(&self, mut event: Event<'static>) -> Event<'static> {
        if let Some(level) = self.level {
            event.level = level;
        }
        if let Some(user) = &self.user {
            event.user = Some(user.clone());
        }
        event
            .tags
            .extend(self.tags.iter().map(|(k, v)| (k.clone(), v.clone())));
        event
            .extra
            .extend(self.extra.iter().map(|(k, v)| (k.clone(), v.clone())));
        event
    }
}

/// The destination of converted log entries.
///
/// Implementations decide how events are transported; the hook only hands
/// them over. `capture_error` and `capture_message` have default
/// implementations that build an event and route it through
/// `capture_event`.
pub trait Sink: Send + Sync {
    /// Returns the options that apply to captures on this sink.
    fn options(&self) -> SinkOptions {
        SinkOptions::default()
    }

    /// Captures a fully assembled event.
    fn capture_event(&self, event: Event<'static>) -> Result<Uuid, SinkError>;

    /// Captures an error, enriched with `scope`.
    fn capture_error(&self, scope: &ScopeUpdate, error: &ErrorValue) -> Result<Uuid, SinkError> {
        let exception = exception_from_error(error, self.options().attach_stacktrace);
        let event = Event {
            exception: vec![exception].into(),
            level: sentry_core::Level::Error,
            ..Default::default()
        };
        self.capture_event(scope.apply_to_event(event))
    }

    /// Captures a plain message, enriched with `scope`.
    fn capture_message(&self, scope: &ScopeUpdate, message: &str) -> Result<Uuid, SinkError> {
        let event = Event {
            message: Some(message.to_owned()),
            level: sentry_core::Level::Info,
            ..Default::default()
        };
        self.capture_event(scope.apply_to_event(event))
    }
}

impl<S: Sink + ?Sized> Sink for Arc<S> {
    fn options(&self) -> SinkOptions {
        (**self).options()
    }

    fn capture_event(&self, event: Event<'static>) -> Result<Uuid, SinkError> {
        (**self).capture_event(event)
    }

    fn capture_error(&self, scope: &ScopeUpdate, error: &ErrorValue) -> Result<Uuid, SinkError> {
        (**self).capture_error(scope, error)
    }

    fn capture_message(&self, scope: &ScopeUpdate, message: &str) -> Result<Uuid, SinkError> {
        (**self).capture_message(scope, message)
    }
}

fn submitted(event_id: Uuid) -> Result<Uuid, SinkError> {
    if event_id.is_nil() {
        Err(SinkError::Discarded)
    } else {
        Ok(event_id)
    }
}

impl Sink for Arc<Hub> {
    fn options(&self) -> SinkOptions {
        SinkOptions {
            attach_stacktrace: self
                .client()
                .is_some_and(|client| client.options().attach_stacktrace),
        }
    }

    fn capture_event(&self, event: Event<'static>) -> Result<Uuid, SinkError> {
        let hub: &Hub = self;
        if hub.client().is_none() {
            return Err(SinkError::Inactive);
        }
        submitted(hub.capture_event(event))
    }

    fn capture_error(&self, scope: &ScopeUpdate, error: &ErrorValue) -> Result<Uuid, SinkError> {
        if self.client().is_none() {
            return Err(SinkError::Inactive);
        }
        let event = Event {
            exception: vec![exception_from_error(error, self.options().attach_stacktrace)].into(),
            level: sentry_core::Level::Error,
            ..Default::default()
        };
        let hub = Hub::new_from_top(self);
        hub.configure_scope(|s| scope.apply(s));
        submitted(hub.capture_event(event))
    }

    fn capture_message(&self, scope: &ScopeUpdate, message: &str) -> Result<Uuid, SinkError> {
        if self.client().is_none() {
            return Err(SinkError::Inactive);
        }
        let hub = Hub::new_from_top(self);
        hub.configure_scope(|s| scope.apply(s));
        submitted(hub.capture_message(message, sentry_core::Level::Info))
    }
}

/// Returns the process-wide default sink: the main thread's [`Hub`].
///
/// Hooks created without an explicit sink call this once, at construction.
pub fn default_sink() -> Arc<dyn Sink> {
    Arc::new(Hub::main())
}
