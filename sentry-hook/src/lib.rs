//! Sends entries of structured loggers to Sentry.
//!
//! A [`SentryHook`] is registered with a logger for a set of [`Level`]s.
//! Every [`Entry`] the logger fires at the hook is turned into a Sentry
//! event by a [`Converter`] and handed to a [`Sink`], by default the main
//! [`Hub`](sentry_core::Hub). Failures to deliver an event never reach the
//! logger.
//!
//! Two converters are provided: [`EventConverter`] assembles a complete
//! event per entry, [`ScopeConverter`] captures either the entry's error or
//! its message on an isolated scope and attributes the capture to the user
//! named by the `user_id` field.
//!
//! # Examples
//!
//! ```
//! use sentry_hook::{Entry, Hook, HookOptions, Level, SentryHook};
//!
//! let hook = SentryHook::new(
//!     HookOptions::new([Level::Error, Level::Fatal, Level::Panic])
//!         .tag("service", "billing")
//!         .extra("region", "eu-west-1"),
//! )
//! .unwrap();
//!
//! let entry = Entry::new(Level::Error, "payment failed")
//!     .with_field("order", 1234)
//!     .with_field("user_id", "u-42");
//! hook.fire(&entry).unwrap();
//! ```
//!
//! With the `log` feature (enabled by default), [`Logger`] fires hooks for
//! records of the `log` crate:
//!
//! ```
//! # #[cfg(feature = "log")] {
//! use sentry_hook::{HookOptions, Level, Logger, SentryHook};
//!
//! let hook = SentryHook::new(HookOptions::new([Level::Error])).unwrap();
//! let logger = Logger::new().with_hook(hook);
//! log::set_boxed_logger(Box::new(logger)).unwrap();
//! log::set_max_level(log::LevelFilter::Error);
//!
//! log::error!(order = 1234; "payment failed");
//! # }
//! ```

#![doc(html_favicon_url = "https://sentry-brand.storage.googleapis.com/favicon.ico")]
#![doc(html_logo_url = "https://sentry-brand.storage.googleapis.com/sentry-glyph-black.png")]
#![warn(missing_docs)]

#[macro_use]
mod macros;

mod converters;
mod entry;
mod exception;
mod hook;
mod hooks;
mod level;
#[cfg(feature = "log")]
mod logger;
mod sink;

pub use converters::{
    event_from_entry, scope_from_entry, Capture, ConvertContext, Converter, EventConverter,
    ScopeConverter, USER_ID_KEY,
};
pub use entry::{Entry, ErrorValue, Field, Level, ParseLevelError, ERROR_KEY};
pub use exception::exception_from_error;
pub use hook::{HookOptions, SentryHook};
pub use hooks::{Hook, HookError, LevelHooks};
pub use level::convert_level;
#[cfg(feature = "log")]
pub use logger::Logger;
pub use sink::{default_sink, ScopeUpdate, Sink, SinkError, SinkOptions};

/// The `log` target of the crate's own diagnostics.
///
/// [`Logger`] does not forward records of this target to hooks.
#[cfg(any(feature = "log", feature = "debug-logs"))]
pub const DEBUG_TARGET: &str = "sentry_hook";
