// ── Radio node addresses ──
//
// 64-bit hardware addresses, as printed on the radio modules. Accepts the
// spaced byte notation used on module labels ("00 13 A2 00 40 A1 B2 C3")
// as well as a plain or `0x`-prefixed hex string.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::AddressParseError;

/// A 64-bit radio node address.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct NodeAddress(u64);

impl NodeAddress {
    pub const fn new(raw: u64) -> Self {
        Self(raw)
    }

    pub const fn as_u64(self) -> u64 {
        self.0
    }
}

impl fmt::Display for NodeAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:016X}", self.0)
    }
}

impl FromStr for NodeAddress {
    type Err = AddressParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let err = |reason| AddressParseError {
            input: s.to_owned(),
            reason,
        };

        let trimmed = s.trim();
        let trimmed = trimmed
            .strip_prefix("0x")
            .or_else(|| trimmed.strip_prefix("0X"))
            .unwrap_or(trimmed);

        let digits: String = trimmed
            .chars()
            .filter(|c| !c.is_whitespace() && *c != ':' && *c != '-')
            .collect();

        if digits.is_empty() {
            return Err(err("no hex digits"));
        }
        if digits.len() > 16 {
            return Err(err("more than 16 hex digits"));
        }

        u64::from_str_radix(&digits, 16)
            .map(Self)
            .map_err(|_| err("not a hexadecimal number"))
    }
}

impl TryFrom<String> for NodeAddress {
    type Error = AddressParseError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<NodeAddress> for String {
    fn from(addr: NodeAddress) -> Self {
        addr.to_string()
    }
}

impl From<u64> for NodeAddress {
    fn from(raw: u64) -> Self {
        Self(raw)
    }
}
