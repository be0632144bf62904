use crate::entry::Level;

/// Converts an entry [`Level`] to a Sentry [`Level`](sentry_core::Level).
pub fn convert_level(level: Level) -> sentry_core::Level {
    match level {
        Level::Trace | Level::Debug => sentry_core::Level::Debug,
        Level::Info => sentry_core::Level::Info,
        Level::Warn => sentry_core::Level::Warning,
        Level::Error => sentry_core::Level::Error,
        Level::Fatal | Level::Panic => sentry_core::Level::Fatal,
    }
}

impl From<Level> for sentry_core::Level {
    fn from(level: Level) -> sentry_core::Level {
        convert_level(level)
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    #[rstest]
    #[case(Level::Trace, sentry_core::Level::Debug)]
    #[case(Level::Debug, sentry_core::Level::Debug)]
    #[case(Level::Info, sentry_core::Level::Info)]
    #[case(Level::Warn, sentry_core::Level::Warning)]
    #[case(Level::Error, sentry_core::Level::Error)]
    #[case(Level::Fatal, sentry_core::Level::Fatal)]
    #[case(Level::Panic, sentry_core::Level::Fatal)]
    fn maps_every_level(#[case] level: Level, #[case] expected: sentry_core::Level) {
        assert_eq!(convert_level(level), expected);
        assert_eq!(sentry_core::Level::from(level), expected);
    }
}
