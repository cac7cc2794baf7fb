use std::fmt;

/// Error kinds used throughout the crate. None of these conflate with a
/// panic: every fallible boundary (network, parsing, user input) converts
/// into one of these instead of unwinding.
#[derive(Debug)]
pub enum Error {
    /// Surfaced to the console with error style. Command pipeline failures:
    /// unknown variable, no aircraft selected, bad syntax, ambiguous
    /// callsign, bad squawk, etc.
    UserError(String),
    /// A mutation was called on a backend that doesn't support it.
    BackendUnsupported,
    /// RPC timeout, HTTP failure. Surfaced as a status message; the
    /// operation is not retried automatically.
    TransientNetwork(String),
    /// A wire message failed to match any spec, or had the wrong field
    /// count. The line is dropped and the stream continues.
    ProtocolViolation(String),
    /// Unexpected invariant violation.
    InternalError(String),
    RequestFailed(attohttpc::Error),
    CsvParseError(csv::Error),
    JSONParseError(serde_json::Error),
    IOError(std::io::Error),
    NotFound,
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Error::UserError(msg) => write!(f, "{}", msg),
            Error::BackendUnsupported => write!(f, "not supported by the current backend"),
            Error::TransientNetwork(msg) => write!(f, "connection problem: {}", msg),
            Error::ProtocolViolation(msg) => write!(f, "protocol violation: {}", msg),
            Error::InternalError(msg) => write!(f, "internal error: {}", msg),
            Error::RequestFailed(e) => write!(f, "request failed: {}", e),
            Error::CsvParseError(e) => write!(f, "csv parse error: {}", e),
            Error::JSONParseError(e) => write!(f, "json parse error: {}", e),
            Error::IOError(e) => write!(f, "io error: {}", e),
            Error::NotFound => write!(f, "not found"),
        }
    }
}

impl std::error::Error for Error {}

impl From<attohttpc::Error> for Error {
    fn from(e: attohttpc::Error) -> Self {
        Self::RequestFailed(e)
    }
}

impl From<csv::Error> for Error {
    fn from(e: csv::Error) -> Self {
        Self::CsvParseError(e)
    }
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Self::JSONParseError(e)
    }
}

impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Self {
        Self::IOError(e)
    }
}

/// Counts recurrences of an internal error kind so that a flood of the same
/// invariant violation doesn't flood the console. Reported at the first
/// occurrence and again at each power-of-ten recurrence (1, 10, 100, ...).
#[derive(Default)]
pub struct InternalErrorCounter {
    counts: std::collections::HashMap<String, u64>,
}

impl InternalErrorCounter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records an occurrence of `key` and returns `Some(count)` if this
    /// occurrence should be reported (first time, or a power of ten).
    pub fn record(&mut self, key: &str) -> Option<u64> {
        let count = self.counts.entry(key.to_string()).or_insert(0);
        *count += 1;
        if is_power_of_ten(*count) {
            Some(*count)
        } else {
            None
        }
    }
}

fn is_power_of_ten(n: u64) -> bool {
    if n == 0 {
        return false;
    }
    let mut n = n;
    while n % 10 == 0 {
        n /= 10;
    }
    n == 1
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn power_of_ten_sequence() {
        let mut c = InternalErrorCounter::new();
        assert_eq!(c.record("x"), Some(1));
        assert_eq!(c.record("x"), None);
        for _ in 0..8 {
            c.record("x");
        }
        // 10th occurrence
        assert_eq!(c.record("x"), Some(10));
        assert_eq!(c.record("x"), None);
    }

    #[test]
    fn counters_are_independent_per_key() {
        let mut c = InternalErrorCounter::new();
        assert_eq!(c.record("a"), Some(1));
        assert_eq!(c.record("b"), Some(1));
    }
}
