//! Explicit parsers for operator-supplied values.
//!
//! Each parser returns a typed [`ParseError`] describing why the value was
//! rejected. The same functions back the `clap` value parsers so flags and
//! environment variables are validated identically.

use std::net::IpAddr;
use std::str::FromStr;

use thiserror::Error;

use crate::logging::LogFormat;

/// Largest worker pool the server accepts.
pub const MAX_THREAD_COUNT: u64 = 0xFFFF;

/// Reasons an operator-supplied value was rejected.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ParseError {
    /// The value is not an IPv4 or IPv6 address.
    #[error("'{value}' is not a valid IP address")]
    InvalidAddress {
        /// Rejected input, trimmed.
        value: String,
    },
    /// The value is not an unsigned integer.
    #[error("'{value}' is not a number")]
    NotANumber {
        /// Rejected input, trimmed.
        value: String,
    },
    /// The value is a number outside the accepted range.
    #[error("{value} is outside the accepted range {min}..={max}")]
    OutOfRange {
        /// Parsed number.
        value: u64,
        /// Smallest accepted value.
        min: u64,
        /// Largest accepted value.
        max: u64,
    },
    /// The value does not name a known log format.
    #[error("unknown log format '{value}'")]
    UnknownLogFormat {
        /// Rejected input, trimmed.
        value: String,
    },
}

/// Parses a listen or connect address.
///
/// # Errors
///
/// Returns [`ParseError::InvalidAddress`] for anything but an IP literal.
pub fn parse_listen_address(value: &str) -> Result<IpAddr, ParseError> {
    let trimmed = value.trim();
    IpAddr::from_str(trimmed).map_err(|_| ParseError::InvalidAddress {
        value: trimmed.to_owned(),
    })
}

/// Parses a TCP port. Port `0` asks the OS for an ephemeral port.
///
/// # Errors
///
/// Returns [`ParseError::NotANumber`] or [`ParseError::OutOfRange`].
pub fn parse_port(value: &str) -> Result<u16, ParseError> {
    let number = parse_bounded(value, 0, u64::from(u16::MAX))?;
    u16::try_from(number).map_err(|_| ParseError::OutOfRange {
        value: number,
        min: 0,
        max: u64::from(u16::MAX),
    })
}

/// Parses the worker thread count, between 1 and [`MAX_THREAD_COUNT`].
///
/// # Errors
///
/// Returns [`ParseError::NotANumber`] or [`ParseError::OutOfRange`].
pub fn parse_thread_count(value: &str) -> Result<usize, ParseError> {
    let number = parse_bounded(value, 1, MAX_THREAD_COUNT)?;
    usize::try_from(number).map_err(|_| ParseError::OutOfRange {
        value: number,
        min: 1,
        max: MAX_THREAD_COUNT,
    })
}

/// Parses a keep-alive tuning value (seconds or packet count).
///
/// # Errors
///
/// Returns [`ParseError::NotANumber`] or [`ParseError::OutOfRange`] for zero.
pub fn parse_keepalive_value(value: &str) -> Result<u32, ParseError> {
    let number = parse_bounded(value, 1, u64::from(u32::MAX))?;
    u32::try_from(number).map_err(|_| ParseError::OutOfRange {
        value: number,
        min: 1,
        max: u64::from(u32::MAX),
    })
}

/// Parses a log output format name.
///
/// # Errors
///
/// Returns [`ParseError::UnknownLogFormat`].
pub fn parse_log_format(value: &str) -> Result<LogFormat, ParseError> {
    let trimmed = value.trim();
    LogFormat::from_str(trimmed).map_err(|_| ParseError::UnknownLogFormat {
        value: trimmed.to_owned(),
    })
}

fn parse_bounded(value: &str, min: u64, max: u64) -> Result<u64, ParseError> {
    let trimmed = value.trim();
    let number = trimmed
        .parse::<u64>()
        .map_err(|_| ParseError::NotANumber {
            value: trimmed.to_owned(),
        })?;
    if !(min..=max).contains(&number) {
        return Err(ParseError::OutOfRange {
            value: number,
            min,
            max,
        });
    }
    Ok(number)
}

#[cfg(test)]
mod tests {
    use std::net::Ipv4Addr;

    use rstest::rstest;

    use super::*;

    #[rstest]
    #[case("127.0.0.1", IpAddr::V4(Ipv4Addr::LOCALHOST))]
    #[case(" 0.0.0.0 ", IpAddr::V4(Ipv4Addr::UNSPECIFIED))]
    #[case("::1", "::1".parse().expect("ipv6"))]
    fn accepts_addresses(#[case] input: &str, #[case] expected: IpAddr) {
        assert_eq!(parse_listen_address(input), Ok(expected));
    }

    #[test]
    fn rejects_malformed_address() {
        assert_eq!(
            parse_listen_address("300.1.1.1"),
            Err(ParseError::InvalidAddress {
                value: "300.1.1.1".to_owned()
            })
        );
    }

    #[rstest]
    #[case("0", 0)]
    #[case("1111", 1111)]
    #[case("65535", 65535)]
    fn accepts_ports(#[case] input: &str, #[case] expected: u16) {
        assert_eq!(parse_port(input), Ok(expected));
    }

    #[test]
    fn rejects_port_above_range() {
        assert_eq!(
            parse_port("70000"),
            Err(ParseError::OutOfRange {
                value: 70000,
                min: 0,
                max: 65535
            })
        );
    }

    #[test]
    fn rejects_non_numeric_port() {
        assert!(matches!(
            parse_port("http"),
            Err(ParseError::NotANumber { .. })
        ));
    }

    #[rstest]
    #[case("0")]
    #[case("65536")]
    #[case("-1")]
    fn rejects_thread_counts(#[case] input: &str) {
        assert!(parse_thread_count(input).is_err());
    }

    #[test]
    fn accepts_thread_count() {
        assert_eq!(parse_thread_count("8"), Ok(8));
    }

    #[test]
    fn keepalive_values_must_be_positive() {
        assert!(parse_keepalive_value("0").is_err());
        assert_eq!(parse_keepalive_value("30"), Ok(30));
    }

    #[test]
    fn log_format_errors_name_the_value() {
        assert_eq!(
            parse_log_format("xml"),
            Err(ParseError::UnknownLogFormat {
                value: "xml".to_owned()
            })
        );
    }
}
