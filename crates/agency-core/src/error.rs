use std::fmt;

/// Machine-readable error codes for agent-friendly decision making.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    ConfigParseError,
    InputUnreadable,
    InputParseError,
    EntityNotFound,
    InvalidEnumValue,
    RateLimited,
    RetryExhausted,
    InternalUnexpected,
}

impl ErrorCode {
    /// Stable code identifier (`E####`) for machine parsing.
    #[must_use]
    pub const fn code(self) -> &'static str {
        match self {
            Self::ConfigParseError => "E1002",
            Self::InputUnreadable => "E1101",
            Self::InputParseError => "E1102",
            Self::EntityNotFound => "E2001",
            Self::InvalidEnumValue => "E2005",
            Self::RateLimited => "E4001",
            Self::RetryExhausted => "E4002",
            Self::InternalUnexpected => "E9001",
        }
    }

    /// Short human-facing summary for logs and terminal output.
    #[must_use]
    pub const fn message(self) -> &'static str {
        match self {
            Self::ConfigParseError => "Config file parse error",
            Self::InputUnreadable => "Input file could not be read",
            Self::InputParseError => "Input file is not a valid dataset",
            Self::EntityNotFound => "Entity not found",
            Self::InvalidEnumValue => "Invalid urgency/importance value",
            Self::RateLimited => "Rate limit exceeded",
            Self::RetryExhausted => "Retries exhausted",
            Self::InternalUnexpected => "Internal unexpected error",
        }
    }

    /// Optional remediation hint that can be surfaced to operators and agents.
    #[must_use]
    pub const fn hint(self) -> Option<&'static str> {
        match self {
            Self::ConfigParseError => Some("Fix syntax in .agency/config.toml and retry."),
            Self::InputUnreadable => Some("Check the --input path, or pass `-` to read stdin."),
            Self::InputParseError => {
                Some("Provide a JSON object with clients/projects/sets/pitches/phases/requirements arrays.")
            }
            Self::EntityNotFound => None,
            Self::InvalidEnumValue => Some("Use one of: low, medium, high, critical."),
            Self::RateLimited => Some("Wait for the current window to pass and retry."),
            Self::RetryExhausted => Some("Raise retry.max_attempts or check the upstream service."),
            Self::InternalUnexpected => Some("Retry once. If persistent, report a bug with logs."),
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

#[cfg(test)]
mod tests {
    use super::ErrorCode;
    use std::collections::HashSet;

    const ALL: [ErrorCode; 8] = [
        ErrorCode::ConfigParseError,
        ErrorCode::InputUnreadable,
        ErrorCode::InputParseError,
        ErrorCode::EntityNotFound,
        ErrorCode::InvalidEnumValue,
        ErrorCode::RateLimited,
        ErrorCode::RetryExhausted,
        ErrorCode::InternalUnexpected,
    ];

    #[test]
    fn all_codes_are_unique() {
        let mut seen = HashSet::new();
        for code in ALL {
            assert!(seen.insert(code.code()), "duplicate code {}", code.code());
        }
    }

    #[test]
    fn code_format_is_machine_friendly() {
        for code in ALL {
            let raw = code.code();
            assert_eq!(raw.len(), 5);
            assert!(raw.starts_with('E'));
            assert!(raw.chars().skip(1).all(|c| c.is_ascii_digit()));
        }
    }

    #[test]
    fn display_matches_code() {
        assert_eq!(ErrorCode::RateLimited.to_string(), "E4001");
    }
}
