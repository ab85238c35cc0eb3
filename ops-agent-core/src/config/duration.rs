use super::error::ConfigError;
use std::time::Duration;

/// Parse strings such as `30s`, `5m`, `2h` or `1d`.
pub fn parse_duration(value: &str) -> Result<Duration, ConfigError> {
    let invalid = || ConfigError::InvalidDuration {
        value: value.to_string(),
    };
    let trimmed = value.trim();
    let unit = trimmed.chars().last().ok_or_else(invalid)?;
    let digits = &trimmed[..trimmed.len() - unit.len_utf8()];
    if digits.is_empty() || !digits.chars().all(|c| c.is_ascii_digit()) {
        return Err(invalid());
    }
    let amount: u64 = digits.parse().map_err(|_| invalid())?;
    let factor: u64 = match unit {
        's' => 1,
        'm' => 60,
        'h' => 3_600,
        'd' => 86_400,
        _ => return Err(invalid()),
    };
    let seconds = amount.checked_mul(factor).ok_or_else(invalid)?;
    Ok(Duration::from_secs(seconds))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_all_units() {
        assert_eq!(parse_duration("30s").ok(), Some(Duration::from_secs(30)));
        assert_eq!(parse_duration("5m").ok(), Some(Duration::from_secs(300)));
        assert_eq!(parse_duration("2h").ok(), Some(Duration::from_secs(7_200)));
        assert_eq!(parse_duration("1d").ok(), Some(Duration::from_secs(86_400)));
    }

    #[test]
    fn rejects_malformed_values() {
        for value in ["", "s", "10", "1.5h", "-1m", "10w", "h1"] {
            assert!(
                matches!(parse_duration(value), Err(ConfigError::InvalidDuration { .. })),
                "{value} should be rejected"
            );
        }
    }

    #[test]
    fn rejects_values_that_overflow_seconds() {
        assert!(matches!(
            parse_duration("300000000000000d"),
            Err(ConfigError::InvalidDuration { .. })
        ));
        assert!(matches!(
            parse_duration("99999999999999999999s"),
            Err(ConfigError::InvalidDuration { .. })
        ));
        assert!(parse_duration("18446744073709551615s").is_ok());
    }
}
