use sentry_core::protocol::{Exception, Stacktrace};

use crate::entry::ErrorValue;

/// Splits a full type name into its module path and the type's own name.
///
/// Generic parameters stay with the type name, so `a::B<c::D>` becomes
/// `(Some("a"), "B<c::D>")`.
fn split_type_name(tn: &str) -> (Option<String>, String) {
    let mut name_end = tn.len();

    // Find the `<` that opens the trailing generic block. Paths inside the
    // generics must not be mistaken for the module separator.
    if tn.ends_with('>') {
        let mut depth = 0usize;
        for (idx, chr) in tn.char_indices().rev() {
            match chr {
                '>' => depth += 1,
                '<' => {
                    depth = depth.saturating_sub(1);
                    if depth == 0 {
                        name_end = idx;
                        break;
                    }
                }
                _ => {}
            }
        }
    }

    match tn[..name_end].rfind("::") {
        Some(0) => (None, tn[2..].to_owned()),
        Some(idx) => (Some(tn[..idx].to_owned()), tn[idx + 2..].to_owned()),
        None => (None, tn.to_owned()),
    }
}

fn stacktrace_from_error(error: &ErrorValue) -> Option<Stacktrace> {
    match error.backtrace() {
        Some(backtrace) => sentry_backtrace::backtrace_to_stacktrace(backtrace),
        None => sentry_backtrace::current_stacktrace(),
    }
}

/// Creates an [`Exception`] from an [`ErrorValue`].
///
/// The exception type is the error's recorded type name; for errors whose
/// type was erased it is parsed from the `Debug` output instead. A
/// stacktrace is only attached when `attach_stacktrace` is set: the
/// backtrace carried by the error if there is one, the current one
/// otherwise. If no frames can be resolved the stacktrace stays `None`.
///
/// # Examples
///
/// ```
/// use sentry_hook::{exception_from_error, ErrorValue};
///
/// let err = "NaN".parse::<usize>().unwrap_err();
/// let exception = exception_from_error(&ErrorValue::new(err), false);
///
/// assert_eq!(exception.ty, "ParseIntError");
/// assert!(exception.module.is_some());
/// assert_eq!(exception.value.as_deref(), Some("invalid digit found in string"));
/// assert!(exception.stacktrace.is_none());
/// ```
pub fn exception_from_error(error: &ErrorValue, attach_stacktrace: bool) -> Exception {
    let (module, ty) = match error.type_name() {
        Some(type_name) => split_type_name(type_name),
        None => (
            None,
            sentry_core::parse_type_from_debug(&format!("{:#?}", error.error())).to_owned(),
        ),
    };

    Exception {
        ty,
        module,
        value: Some(error.to_string()),
        stacktrace: if attach_stacktrace {
            stacktrace_from_error(error)
        } else {
            None
        },
        ..Default::default()
    }
}

#[cfg(test)]
mod tests {
    use std::error::Error;

    use super::*;

    #[derive(Debug, thiserror::Error)]
    #[error("boom")]
    struct Boom;

    #[derive(Debug, thiserror::Error)]
    #[error("wrapped")]
    struct Wrapped<T: std::fmt::Debug>(T);

    #[test]
    fn test_split_type_name() {
        assert_eq!(split_type_name("JustName"), (None, "JustName".into()));
        assert_eq!(split_type_name("::Rooted"), (None, "Rooted".into()));
        assert_eq!(
            split_type_name("With<Generics>"),
            (None, "With<Generics>".into())
        );
        assert_eq!(
            split_type_name("with::module::Path"),
            (Some("with::module".into()), "Path".into())
        );
        assert_eq!(
            split_type_name("with::module::Path<and::Generics<nested::Too>>"),
            (
                Some("with::module".into()),
                "Path<and::Generics<nested::Too>>".into()
            )
        );
    }

    #[test]
    fn names_exception_after_the_error_type() {
        let exception = exception_from_error(&ErrorValue::new(Boom), false);
        assert_eq!(exception.ty, "Boom");
        assert!(exception.module.unwrap().ends_with("exception::tests"));
        assert_eq!(exception.value.as_deref(), Some("boom"));

        let exception = exception_from_error(&ErrorValue::new(Wrapped(1u8)), false);
        assert_eq!(exception.ty, "Wrapped<u8>");
    }

    #[test]
    fn erased_errors_are_named_from_debug() {
        let boxed: Box<dyn Error + Send + Sync> = Box::new(Boom);
        let exception = exception_from_error(&ErrorValue::from_boxed(boxed), false);
        assert_eq!(exception.ty, "Boom");
        assert_eq!(exception.module, None);

        let io = std::io::Error::new(std::io::ErrorKind::Other, "disk gone");
        let boxed: Box<dyn Error + Send + Sync> = Box::new(io);
        let exception = exception_from_error(&ErrorValue::from_boxed(boxed), false);
        assert_eq!(exception.ty, "Custom");
        assert_eq!(exception.value.as_deref(), Some("disk gone"));
    }

    #[test]
    fn stacktrace_only_when_requested() {
        let error = ErrorValue::new(Boom).with_backtrace(backtrace::Backtrace::new());

        let exception = exception_from_error(&error, false);
        assert!(exception.stacktrace.is_none());

        let exception = exception_from_error(&error, true);
        let stacktrace = exception.stacktrace.expect("stacktrace should be attached");
        assert!(!stacktrace.frames.is_empty());
    }

    #[test]
    fn current_stacktrace_is_used_without_backtrace() {
        let exception = exception_from_error(&ErrorValue::new(Boom), true);
        assert!(exception
            .stacktrace
            .map_or(true, |stacktrace| !stacktrace.frames.is_empty()));
    }
}
