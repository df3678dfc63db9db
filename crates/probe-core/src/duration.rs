use std::sync::LazyLock;
use std::time::Duration;

use regex::Regex;

use crate::error::ConfigError;

// Unit tokens must appear in d, h, m, s order; each is optional.
static DURATION_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?:(\d+)d)?(?:(\d+)h)?(?:(\d+)m)?(?:(\d+)s)?$")
        .expect("duration grammar regex is valid")
});

/// Parse a compound duration string like `1d2h3m4s`.
///
/// Each unit is optional but at least one is required, and units must
/// appear in descending order.
///
/// # Errors
///
/// Returns `ConfigError::InvalidDuration` for empty input, unknown unit
/// suffixes, or out-of-order units.
pub fn parse_duration(input: &str) -> Result<Duration, ConfigError> {
    if input.is_empty() {
        return Err(ConfigError::InvalidDuration {
            input: input.to_owned(),
            reason: "empty duration".to_owned(),
        });
    }

    let caps = DURATION_REGEX
        .captures(input)
        .ok_or_else(|| ConfigError::InvalidDuration {
            input: input.to_owned(),
            reason: "expected tokens in NdNhNmNs order".to_owned(),
        })?;

    let unit = |i: usize| -> Result<u64, ConfigError> {
        caps.get(i).map_or(Ok(0), |m| {
            m.as_str()
                .parse()
                .map_err(|_| ConfigError::InvalidDuration {
                    input: input.to_owned(),
                    reason: format!("component {} overflows", m.as_str()),
                })
        })
    };

    if (1..=4).all(|i| caps.get(i).is_none()) {
        return Err(ConfigError::InvalidDuration {
            input: input.to_owned(),
            reason: "no recognized unit tokens".to_owned(),
        });
    }

    let secs = unit(1)? * 86_400 + unit(2)? * 3_600 + unit(3)? * 60 + unit(4)?;
    Ok(Duration::from_secs(secs))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_full_compound() {
        let d = parse_duration("1d2h3m4s").unwrap();
        assert_eq!(d, Duration::from_secs(86_400 + 2 * 3_600 + 3 * 60 + 4));
    }

    #[test]
    fn parses_single_units() {
        assert_eq!(parse_duration("90s").unwrap(), Duration::from_secs(90));
        assert_eq!(parse_duration("15m").unwrap(), Duration::from_secs(900));
        assert_eq!(parse_duration("2h").unwrap(), Duration::from_secs(7_200));
        assert_eq!(parse_duration("3d").unwrap(), Duration::from_secs(259_200));
    }

    #[test]
    fn parses_partial_compound() {
        assert_eq!(
            parse_duration("1h30m").unwrap(),
            Duration::from_secs(5_400)
        );
    }

    #[test]
    fn empty_is_error() {
        assert!(matches!(
            parse_duration(""),
            Err(ConfigError::InvalidDuration { .. })
        ));
    }

    #[test]
    fn unknown_suffix_is_error() {
        assert!(matches!(
            parse_duration("5x"),
            Err(ConfigError::InvalidDuration { .. })
        ));
    }

    #[test]
    fn out_of_order_units_are_error() {
        assert!(matches!(
            parse_duration("2h1d"),
            Err(ConfigError::InvalidDuration { .. })
        ));
        assert!(matches!(
            parse_duration("30s5m"),
            Err(ConfigError::InvalidDuration { .. })
        ));
    }

    #[test]
    fn bare_number_is_error() {
        assert!(matches!(
            parse_duration("300"),
            Err(ConfigError::InvalidDuration { .. })
        ));
    }

    #[test]
    fn trailing_junk_is_error() {
        assert!(matches!(
            parse_duration("1h extra"),
            Err(ConfigError::InvalidDuration { .. })
        ));
    }

    #[test]
    fn zero_components_accepted() {
        assert_eq!(parse_duration("0s").unwrap(), Duration::ZERO);
    }
}
