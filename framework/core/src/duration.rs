use std::fmt;
use std::str::FromStr;

#[derive(derive_more::Error, derive_more::Display, Debug, Clone, PartialEq, Eq)]
#[display("Duration must be a number followed by 's', 'm', or 'h', got '{input}'")]
pub struct DurationParseError {
    input: String,
}

/// Parse a scenario duration of the form `<int>(s|m|h)` into seconds.
///
/// Anything else, including surrounding whitespace, is rejected.
pub fn parse_duration_to_seconds(input: &str) -> Result<u64, DurationParseError> {
    let invalid = || DurationParseError {
        input: input.to_string(),
    };

    let (value, multiplier) = if let Some(value) = input.strip_suffix('s') {
        (value, 1)
    } else if let Some(value) = input.strip_suffix('m') {
        (value, 60)
    } else if let Some(value) = input.strip_suffix('h') {
        (value, 60 * 60)
    } else {
        return Err(invalid());
    };

    if value.is_empty() || !value.bytes().all(|b| b.is_ascii_digit()) {
        return Err(invalid());
    }

    value
        .parse::<u64>()
        .ok()
        .and_then(|value| value.checked_mul(multiplier))
        .ok_or_else(invalid)
}

/// A validated scenario duration, keeping the literal it was configured with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScenarioDuration {
    literal: String,
    seconds: u64,
}

impl ScenarioDuration {
    pub fn as_secs(&self) -> u64 {
        self.seconds
    }

    pub fn literal(&self) -> &str {
        &self.literal
    }
}

impl FromStr for ScenarioDuration {
    type Err = DurationParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self {
            literal: s.to_string(),
            seconds: parse_duration_to_seconds(s)?,
        })
    }
}

impl fmt::Display for ScenarioDuration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.literal)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_each_unit() {
        assert_eq!(parse_duration_to_seconds("90s"), Ok(90));
        assert_eq!(parse_duration_to_seconds("2m"), Ok(120));
        assert_eq!(parse_duration_to_seconds("1h"), Ok(3600));
        assert_eq!(parse_duration_to_seconds("0s"), Ok(0));
    }

    #[test]
    fn rejects_malformed_input() {
        for input in ["10x", "", "s", "10", "1.5m", "-1s", " 10s", "10s ", "10ss", "m10"] {
            assert!(
                parse_duration_to_seconds(input).is_err(),
                "expected '{input}' to be rejected"
            );
        }
    }

    #[test]
    fn rejects_overflowing_values() {
        assert!(parse_duration_to_seconds("99999999999999999999h").is_err());
        assert!(parse_duration_to_seconds(&format!("{}h", u64::MAX)).is_err());
    }

    #[test]
    fn error_message_names_the_input() {
        let err = parse_duration_to_seconds("10x").unwrap_err();
        assert_eq!(
            err.to_string(),
            "Duration must be a number followed by 's', 'm', or 'h', got '10x'"
        );
    }

    #[test]
    fn scenario_duration_keeps_its_literal() {
        let duration: ScenarioDuration = "2m".parse().unwrap();

        assert_eq!(duration.as_secs(), 120);
        assert_eq!(duration.to_string(), "2m");
    }
}
