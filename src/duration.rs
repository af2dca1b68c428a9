//! Parsing for tick and timeout intervals written as "1s", "500ms", "2m".

use std::time::Duration;

use anyhow::{Context, Result};
use serde::{de, Deserialize, Deserializer};

/// Parse a duration string like "500ms", "1s", "2m", "1h" or "1d".
///
/// The input is case-insensitive and whitespace is trimmed. `ms` is matched
/// before `m` and `s`.
///
/// # Examples
///
/// ```
/// use transitbook::duration::parse_duration;
/// use std::time::Duration;
///
/// assert_eq!(parse_duration("500ms").unwrap(), Duration::from_millis(500));
/// assert_eq!(parse_duration("1s").unwrap(), Duration::from_secs(1));
/// assert_eq!(parse_duration("2m").unwrap(), Duration::from_secs(120));
/// ```
pub fn parse_duration(s: &str) -> Result<Duration> {
    let s = s.trim().to_lowercase();

    let (num, millis_per_unit): (&str, u64) = if let Some(n) = s.strip_suffix("ms") {
        (n, 1)
    } else if let Some(n) = s.strip_suffix('d') {
        (n, 24 * 60 * 60 * 1000)
    } else if let Some(n) = s.strip_suffix('h') {
        (n, 60 * 60 * 1000)
    } else if let Some(n) = s.strip_suffix('m') {
        (n, 60 * 1000)
    } else if let Some(n) = s.strip_suffix('s') {
        (n, 1000)
    } else {
        anyhow::bail!("Duration must end with ms, s, m, h, or d");
    };

    let num: u64 = num
        .trim()
        .parse()
        .with_context(|| format!("Invalid number in duration: {s:?}"))?;

    let millis = num
        .checked_mul(millis_per_unit)
        .context("Duration is too large")?;

    Ok(Duration::from_millis(millis))
}

/// Serde deserializer for human-readable duration strings.
pub fn deserialize_duration<'de, D>(deserializer: D) -> Result<Duration, D::Error>
where
    D: Deserializer<'de>,
{
    let s = String::deserialize(deserializer)?;
    parse_duration(&s).map_err(de::Error::custom)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_each_unit() {
        assert_eq!(parse_duration("250ms").unwrap(), Duration::from_millis(250));
        assert_eq!(parse_duration("1s").unwrap(), Duration::from_secs(1));
        assert_eq!(parse_duration("3m").unwrap(), Duration::from_secs(180));
        assert_eq!(parse_duration("2h").unwrap(), Duration::from_secs(7200));
        assert_eq!(parse_duration("1d").unwrap(), Duration::from_secs(86_400));
    }

    #[test]
    fn case_and_whitespace_are_ignored() {
        assert_eq!(parse_duration("  10MS ").unwrap(), Duration::from_millis(10));
        assert_eq!(parse_duration("5S").unwrap(), Duration::from_secs(5));
    }

    #[test]
    fn rejects_bad_input() {
        assert!(parse_duration("").is_err());
        assert!(parse_duration("10").is_err());
        assert!(parse_duration("abcs").is_err());
        assert!(parse_duration("10w").is_err());
    }

    #[test]
    fn rejects_overflow() {
        assert!(parse_duration(&format!("{}d", u64::MAX)).is_err());
    }

    #[test]
    fn deserializes_from_toml() {
        #[derive(Deserialize)]
        struct Wrapper {
            #[serde(deserialize_with = "deserialize_duration")]
            tick: Duration,
        }

        let parsed: Wrapper = toml::from_str("tick = \"750ms\"").unwrap();
        assert_eq!(parsed.tick, Duration::from_millis(750));
    }
}
