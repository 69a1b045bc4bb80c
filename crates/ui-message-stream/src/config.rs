use std::env;
use std::path::Path;

/// Loads `.env.local` and then `.env` from the working directory.
///
/// Variables already set in the process win; missing files are ignored.
pub fn load_env() {
    for file in [".env.local", ".env"] {
        if Path::new(file).exists() && dotenvy::from_filename(file).is_err() {
            tracing::warn!(file, "failed to load env file");
        }
    }
}

/// Reads and parses `key`, falling back to `default` when unset, blank, or unparsable.
pub fn env_or<T: std::str::FromStr>(key: &str, default: T) -> T {
    match env::var(key) {
        Ok(raw) if !raw.trim().is_empty() => match raw.trim().parse() {
            Ok(value) => value,
            Err(_) => {
                tracing::error!(key, "error parsing env value; using default");
                default
            }
        },
        _ => default,
    }
}

/// Reads `key` as a non-blank string.
pub fn env_string(key: &str) -> Option<String> {
    env::var(key)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

/// Parses the usual boolean spellings (`1`/`true`/`on`, `0`/`false`/`off`, ...).
pub fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" | "enabled" => Some(true),
        "0" | "false" | "no" | "off" | "disabled" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn env_or_falls_back_for_missing_and_unparsable_values() {
        assert_eq!(env_or("UI_STREAM_TEST_UNSET_KEY", 7u32), 7);
        // SAFETY: no other test touches these keys.
        unsafe { env::set_var("UI_STREAM_TEST_BAD_NUMBER", "seven") };
        assert_eq!(env_or("UI_STREAM_TEST_BAD_NUMBER", 7u32), 7);
        // SAFETY: as above.
        unsafe { env::set_var("UI_STREAM_TEST_GOOD_NUMBER", " 42 ") };
        assert_eq!(env_or("UI_STREAM_TEST_GOOD_NUMBER", 7u32), 42);
    }

    #[test]
    fn parse_bool_accepts_common_spellings() {
        assert_eq!(parse_bool("ON"), Some(true));
        assert_eq!(parse_bool(" disabled "), Some(false));
        assert_eq!(parse_bool("maybe"), None);
    }
}
