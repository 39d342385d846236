//! Literal-or-expression values used by profile stages.
//!
//! Stage values are either known numbers or engine expressions (e.g.
//! `${__P(THREADS, 1)}`) that are only resolved when the load test runs.

use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{RampError, RampResult};

/// A stage value: either a resolved literal or a deferred engine expression.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Param<T> {
    /// Numeric value known at compile time.
    Literal(T),
    /// Engine expression evaluated at runtime.
    Expression(String),
}

impl<T> Param<T> {
    /// Returns `true` when the value is a resolved literal.
    #[must_use]
    pub const fn is_literal(&self) -> bool {
        matches!(self, Self::Literal(_))
    }

    /// Returns the literal value, if any.
    #[must_use]
    pub const fn as_literal(&self) -> Option<&T> {
        match self {
            Self::Literal(value) => Some(value),
            Self::Expression(_) => None,
        }
    }

    /// Returns the expression text, if any.
    #[must_use]
    pub fn as_expression(&self) -> Option<&str> {
        match self {
            Self::Literal(_) => None,
            Self::Expression(expr) => Some(expr),
        }
    }
}

impl Param<u32> {
    /// Builds a count from a signed number, rejecting negatives.
    ///
    /// # Errors
    ///
    /// Returns `RampError::InvalidStage` for negative values or values above `u32::MAX`.
    pub fn count(value: i64, what: &str) -> RampResult<Self> {
        if value < 0 {
            return Err(RampError::invalid_stage(format!(
                "{what} must be >= 0, got {value}"
            )));
        }
        u32::try_from(value).map(Self::Literal).map_err(|_| {
            RampError::invalid_stage(format!("{what} {value} exceeds the supported maximum"))
        })
    }

    /// Parses text into a count. Pure digit strings become literals, anything
    /// else is kept as an expression.
    ///
    /// # Errors
    ///
    /// Returns `RampError::InvalidStage` when a digit string overflows.
    pub fn parse_count(text: &str) -> RampResult<Self> {
        if !is_digits(text) {
            return Ok(Self::Expression(text.to_string()));
        }
        text.parse::<u32>()
            .map(Self::Literal)
            .map_err(|_| RampError::invalid_stage(format!("count `{text}` is out of range")))
    }

    /// Returns `true` only for a literal zero.
    #[must_use]
    pub fn is_zero(&self) -> bool {
        matches!(self, Self::Literal(0))
    }
}

impl Param<Duration> {
    /// Parses text into a duration. Pure digit strings are whole seconds,
    /// anything else is kept as an expression.
    ///
    /// # Errors
    ///
    /// Returns `RampError::InvalidStage` when a digit string overflows.
    pub fn parse_duration(text: &str) -> RampResult<Self> {
        if !is_digits(text) {
            return Ok(Self::Expression(text.to_string()));
        }
        text.parse::<u64>()
            .map(|secs| Self::Literal(Duration::from_secs(secs)))
            .map_err(|_| RampError::invalid_stage(format!("duration `{text}` is out of range")))
    }

    /// Returns `true` only for a literal zero duration.
    #[must_use]
    pub fn is_zero(&self) -> bool {
        matches!(self, Self::Literal(d) if d.is_zero())
    }
}

impl From<u32> for Param<u32> {
    fn from(value: u32) -> Self {
        Self::Literal(value)
    }
}

impl From<Duration> for Param<Duration> {
    fn from(value: Duration) -> Self {
        Self::Literal(value)
    }
}

impl fmt::Display for Param<u32> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Literal(value) => write!(f, "{value}"),
            Self::Expression(expr) => f.write_str(expr),
        }
    }
}

impl fmt::Display for Param<Duration> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Literal(value) => write!(f, "{}", duration_to_seconds(*value)),
            Self::Expression(expr) => f.write_str(expr),
        }
    }
}

/// Whole seconds of a duration, rounded up. The engine only accepts seconds.
#[must_use]
pub fn duration_to_seconds(duration: Duration) -> u64 {
    duration.as_secs() + u64::from(duration.subsec_nanos() > 0)
}

fn is_digits(text: &str) -> bool {
    !text.is_empty() && text.bytes().all(|b| b.is_ascii_digit())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_count() {
        assert_eq!(Param::<u32>::parse_count("15").unwrap(), Param::Literal(15));
        assert_eq!(
            Param::<u32>::parse_count("${THREADS}").unwrap(),
            Param::Expression("${THREADS}".to_string())
        );
        // a leading sign is not a plain number, so it stays an expression
        assert!(!Param::<u32>::parse_count("-3").unwrap().is_literal());
        assert!(Param::<u32>::parse_count("99999999999").is_err());
    }

    #[test]
    fn test_parse_duration_seconds() {
        assert_eq!(
            Param::<Duration>::parse_duration("30").unwrap(),
            Param::Literal(Duration::from_secs(30))
        );
        assert_eq!(
            Param::<Duration>::parse_duration("${RAMP}").unwrap().as_expression(),
            Some("${RAMP}")
        );
    }

    #[test]
    fn test_negative_count_rejected() {
        assert!(matches!(
            Param::<u32>::count(-1, "thread count"),
            Err(RampError::InvalidStage { .. })
        ));
        assert_eq!(Param::<u32>::count(7, "thread count").unwrap(), Param::Literal(7));
    }

    #[test]
    fn test_zero_checks() {
        assert!(Param::<u32>::Literal(0).is_zero());
        assert!(!Param::<u32>::Expression("0".to_string()).is_zero());
        assert!(Param::Literal(Duration::ZERO).is_zero());
        assert!(!Param::Literal(Duration::from_millis(1)).is_zero());
    }

    #[test]
    fn test_seconds_round_up() {
        assert_eq!(duration_to_seconds(Duration::from_millis(3334)), 4);
        assert_eq!(duration_to_seconds(Duration::from_secs(10)), 10);
        assert_eq!(duration_to_seconds(Duration::ZERO), 0);
        assert_eq!(Param::Literal(Duration::from_millis(2500)).to_string(), "3");
    }
}
