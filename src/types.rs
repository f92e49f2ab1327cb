//! Core types: Symbol, Timestamp

use std::fmt;
use std::str::FromStr;

/// Maximum ticker length in bytes.
pub const SYMBOL_MAX_LEN: usize = 16;

/// Observation instant. Opaque to the optimizer; only ordering matters.
///
/// Callers typically use days (or seconds) since the Unix epoch.
pub type Timestamp = i64;

/// Ticker symbol stored inline, so it is `Copy` and cheap to hash.
///
/// Holds up to 16 printable ASCII bytes, which covers exchange-suffixed
/// tickers such as `0700.HK` or `000001.SZ`.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Symbol {
    bytes: [u8; SYMBOL_MAX_LEN],
    len: u8,
}

impl Symbol {
    /// Create a symbol, panicking on invalid input.
    ///
    /// # Panics
    ///
    /// Panics if `s` is empty, longer than [`SYMBOL_MAX_LEN`] bytes, or
    /// contains anything other than printable ASCII.
    #[track_caller]
    pub fn new(s: &str) -> Self {
        match Self::try_new(s) {
            Some(sym) => sym,
            None => panic!(
                "invalid symbol {s:?}: expected 1..={SYMBOL_MAX_LEN} printable ASCII bytes"
            ),
        }
    }

    /// Create a symbol, returning `None` on invalid input.
    pub fn try_new(s: &str) -> Option<Self> {
        let raw = s.as_bytes();
        if raw.is_empty() || raw.len() > SYMBOL_MAX_LEN {
            return None;
        }
        if !raw.iter().all(|b| b.is_ascii_graphic()) {
            return None;
        }

        let mut bytes = [0u8; SYMBOL_MAX_LEN];
        bytes[..raw.len()].copy_from_slice(raw);
        Some(Self {
            bytes,
            len: raw.len() as u8,
        })
    }

    /// The ticker as a string slice.
    pub fn as_str(&self) -> &str {
        // Only ASCII is ever stored, so this cannot fail.
        std::str::from_utf8(&self.bytes[..self.len as usize]).unwrap_or_default()
    }
}

impl fmt::Display for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

impl fmt::Debug for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Symbol({})", self.as_str())
    }
}

/// Error returned when parsing a [`Symbol`] from a string fails.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
#[error("invalid symbol {0:?}: expected 1..=16 printable ASCII bytes")]
pub struct ParseSymbolError(pub String);

impl FromStr for Symbol {
    type Err = ParseSymbolError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Symbol::try_new(s).ok_or_else(|| ParseSymbolError(s.to_string()))
    }
}

#[cfg(feature = "serde")]
impl serde::Serialize for Symbol {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

#[cfg(feature = "serde")]
impl<'de> serde::Deserialize<'de> for Symbol {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = <String as serde::Deserialize>::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}
