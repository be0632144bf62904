/// Prints a diagnostic line if `$enabled` is true.
///
/// With the `debug-logs` feature the line goes to the `sentry_hook` log
/// target instead of stderr.
macro_rules! hook_debug {
    ($enabled:expr, $($arg:tt)*) => {
        if $enabled {
            #[cfg(feature = "debug-logs")]
            {
                ::log::debug!(target: $crate::DEBUG_TARGET, $($arg)*);
            }
            #[cfg(not(feature = "debug-logs"))]
            {
                eprint!("[sentry-hook] ");
                eprintln!($($arg)*);
            }
        }
    };
}
