//! Environment variable parsing helpers shared by pool and service config.

use std::str::FromStr;

/// Parse an environment variable, falling back to `default` when it is
/// missing or does not parse.
pub fn parse_env_with_default<T: FromStr>(key: &str, default: T) -> T {
    parse_env_optional(key).unwrap_or(default)
}

/// Parse an environment variable, `None` if missing or invalid.
pub fn parse_env_optional<T: FromStr>(key: &str) -> Option<T> {
    std::env::var(key).ok().and_then(|v| v.trim().parse().ok())
}

/// Parse a required environment variable.
pub fn parse_env_required<T: FromStr>(key: &str) -> Result<T, String> {
    std::env::var(key)
        .map_err(|_| format!("Environment variable {} not found", key))?
        .trim()
        .parse()
        .map_err(|_| format!("Failed to parse environment variable {}", key))
}

/// Boolean flag accepting `1/0`, `true/false`, `yes/no` (case-insensitive).
pub fn parse_env_flag(key: &str, default: bool) -> bool {
    match std::env::var(key) {
        Ok(raw) => match raw.trim().to_ascii_lowercase().as_str() {
            "1" | "true" | "yes" | "on" => true,
            "0" | "false" | "no" | "off" => false,
            _ => default,
        },
        Err(_) => default,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    #[serial_test::serial]
    fn test_parse_env_with_default() {
        let result: u32 = parse_env_with_default("NONEXISTENT_VAR_XYZ", 42);
        assert_eq!(result, 42);

        std::env::set_var("TEST_PAGE_SIZE", " 25 ");
        let result: usize = parse_env_with_default("TEST_PAGE_SIZE", 10);
        assert_eq!(result, 25);
        std::env::remove_var("TEST_PAGE_SIZE");
    }

    #[test]
    #[serial_test::serial]
    fn test_parse_env_optional_invalid() {
        std::env::set_var("TEST_OPT_BAD", "abc");
        assert_eq!(parse_env_optional::<u64>("TEST_OPT_BAD"), None);
        std::env::remove_var("TEST_OPT_BAD");
    }

    #[test]
    #[serial_test::serial]
    fn test_parse_env_required() {
        assert!(parse_env_required::<u32>("NONEXISTENT_VAR_XYZ").is_err());

        std::env::set_var("TEST_REQ", "456");
        assert_eq!(parse_env_required::<u32>("TEST_REQ"), Ok(456));
        std::env::remove_var("TEST_REQ");
    }

    #[test]
    #[serial_test::serial]
    fn test_parse_env_flag() {
        assert!(!parse_env_flag("NONEXISTENT_FLAG_XYZ", false));

        std::env::set_var("TEST_FLAG", "Yes");
        assert!(parse_env_flag("TEST_FLAG", false));
        std::env::set_var("TEST_FLAG", "off");
        assert!(!parse_env_flag("TEST_FLAG", true));
        std::env::set_var("TEST_FLAG", "maybe");
        assert!(parse_env_flag("TEST_FLAG", true));
        std::env::remove_var("TEST_FLAG");
    }
}
