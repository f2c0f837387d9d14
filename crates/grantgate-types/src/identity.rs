//! Identifier types for grantgate
//!
//! All identifiers are strongly typed wrappers around strings to prevent
//! accidentally passing a channel where an address was expected. Construction
//! and deserialization both validate, so a value of one of these types is
//! always well formed.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::{AuthzError, Result};

/// Minimum length of a port identifier
pub const PORT_ID_MIN_LEN: usize = 2;
/// Maximum length of a port identifier
pub const PORT_ID_MAX_LEN: usize = 128;
/// Minimum length of a channel identifier
pub const CHANNEL_ID_MIN_LEN: usize = 8;
/// Maximum length of a channel identifier
pub const CHANNEL_ID_MAX_LEN: usize = 64;
/// Maximum length of an address
pub const ADDRESS_MAX_LEN: usize = 255;

/// Macro to generate validated string identifier types with common implementations
macro_rules! define_identifier {
    ($name:ident, $kind:literal, $validate:path, $doc:literal) => {
        #[doc = $doc]
        #[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(try_from = "String", into = "String")]
        pub struct $name(String);

        impl $name {
            /// Parse and validate an identifier
            pub fn parse(s: impl Into<String>) -> Result<Self> {
                let s = s.into();
                $validate(&s).map_err(|reason| AuthzError::InvalidIdentifier {
                    kind: $kind.to_string(),
                    value: s.clone(),
                    reason,
                })?;
                Ok(Self(s))
            }

            /// Borrow the identifier as a string slice
            pub fn as_str(&self) -> &str {
                &self.0
            }

            /// Consume into the inner string
            pub fn into_inner(self) -> String {
                self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl TryFrom<String> for $name {
            type Error = AuthzError;

            fn try_from(s: String) -> Result<Self> {
                Self::parse(s)
            }
        }

        impl TryFrom<&str> for $name {
            type Error = AuthzError;

            fn try_from(s: &str) -> Result<Self> {
                Self::parse(s)
            }
        }

        impl From<$name> for String {
            fn from(id: $name) -> String {
                id.0
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }
    };
}

define_identifier!(
    Address,
    "address",
    validate_address,
    "Opaque account address of a principal or recipient"
);
define_identifier!(PortId, "port", validate_port_id, "Port identifier on the source ledger");
define_identifier!(
    ChannelId,
    "channel",
    validate_channel_id,
    "Channel identifier on the source ledger"
);
define_identifier!(Denom, "denom", validate_denom, "Denomination of a transferable asset");

fn validate_address(s: &str) -> std::result::Result<(), String> {
    if s.trim().is_empty() {
        return Err("address cannot be blank".to_string());
    }
    if s.len() > ADDRESS_MAX_LEN {
        return Err(format!("address exceeds {} bytes", ADDRESS_MAX_LEN));
    }
    if s.chars().any(|c| c.is_whitespace() || c.is_control()) {
        return Err("address cannot contain whitespace or control characters".to_string());
    }
    Ok(())
}

/// Characters allowed in port and channel identifiers besides ASCII alphanumerics
const IDENTIFIER_SYMBOLS: &[char] = &['.', '_', '+', '-', '#', '[', ']', '<', '>'];

fn validate_identifier(s: &str, min: usize, max: usize) -> std::result::Result<(), String> {
    if s.len() < min || s.len() > max {
        return Err(format!("length {} outside {}..={}", s.len(), min, max));
    }
    if let Some(c) = s
        .chars()
        .find(|c| !c.is_ascii_alphanumeric() && !IDENTIFIER_SYMBOLS.contains(c))
    {
        return Err(format!("invalid character {:?}", c));
    }
    Ok(())
}

fn validate_port_id(s: &str) -> std::result::Result<(), String> {
    validate_identifier(s, PORT_ID_MIN_LEN, PORT_ID_MAX_LEN)
}

fn validate_channel_id(s: &str) -> std::result::Result<(), String> {
    validate_identifier(s, CHANNEL_ID_MIN_LEN, CHANNEL_ID_MAX_LEN)
}

fn validate_denom(s: &str) -> std::result::Result<(), String> {
    let mut chars = s.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() => {}
        _ => return Err("denom must start with a letter".to_string()),
    }
    if s.len() < 3 || s.len() > 128 {
        return Err(format!("length {} outside 3..=128", s.len()));
    }
    if let Some(c) = chars.find(|c| !c.is_ascii_alphanumeric() && !"/:._-".contains(*c)) {
        return Err(format!("invalid character {:?}", c));
    }
    Ok(())
}

/// Port and channel pair identifying one communication channel scope
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ChannelScope {
    pub port: PortId,
    pub channel: ChannelId,
}

impl ChannelScope {
    pub fn new(port: PortId, channel: ChannelId) -> Self {
        Self { port, channel }
    }
}

impl fmt::Display for ChannelScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.port, self.channel)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_address_parsing() {
        assert!(Address::parse("cosmos1granter").is_ok());
        assert!(Address::parse("").is_err());
        assert!(Address::parse("   ").is_err());
        assert!(Address::parse("has space").is_err());
    }

    #[test]
    fn test_port_and_channel_rules() {
        assert!(PortId::parse("transfer").is_ok());
        assert!(PortId::parse("t").is_err());
        assert!(ChannelId::parse("channel-0").is_ok());
        assert!(ChannelId::parse("chan-0").is_err());
        assert!(ChannelId::parse("channel/0").is_err());
    }

    #[test]
    fn test_denom_rules() {
        assert!(Denom::parse("uatom").is_ok());
        assert!(Denom::parse("ibc/27394FB092D2ECCD56123C74F36E4C1F926001CEADA9CA97EA622B25F41E5EB2").is_ok());
        assert!(Denom::parse("1atom").is_err());
        assert!(Denom::parse("at").is_err());
        assert!(Denom::parse("u atom").is_err());
    }

    #[test]
    fn test_deserialize_validates() {
        let ok: std::result::Result<Denom, _> = serde_json::from_str("\"stake\"");
        assert!(ok.is_ok());

        let bad: std::result::Result<ChannelId, _> = serde_json::from_str("\"x\"");
        assert!(bad.is_err());
    }

    #[test]
    fn test_channel_scope_display() {
        let scope = ChannelScope::new(
            PortId::parse("transfer").unwrap(),
            ChannelId::parse("channel-7").unwrap(),
        );
        assert_eq!(scope.to_string(), "transfer/channel-7");
    }
}
