/*!
   Identifiers for chains, ports and channels, validated with the
   ICS 024 host identifier rules.
*/

use core::fmt::{self, Display};
use core::str::FromStr;

use flex_error::define_error;
use serde::{Deserialize, Serialize};

const PATH_SEPARATOR: char = '/';
const VALID_SPECIAL_CHARS: &str = "._+-#[]<>";
const CHANNEL_ID_PREFIX: &str = "channel";

define_error! {
    #[derive(Debug, Clone)]
    ValidationError {
        ContainSeparator
            { id: String }
            | e | { format_args!("identifier {0} cannot contain separator '/'", e.id) },

        InvalidLength
            {
                id: String,
                length: usize,
                min: usize,
                max: usize,
            }
            | e | { format_args!("identifier {0} has invalid length {1} must be between {2}-{3} characters", e.id, e.length, e.min, e.max) },

        InvalidCharacter
            { id: String }
            | e | { format_args!("identifier {0} must only contain alphanumeric characters or `.`, `_`, `+`, `-`, `#`, - `[`, `]`, `<`, `>`", e.id) },

        Empty
            | _ | { "identifier cannot be empty" },

        InvalidChannelPrefix
            { id: String }
            | e | { format_args!("channel identifier {0} must be of the form `channel-<sequence>`", e.id) },
    }
}

/// Checks that `id` is non-empty, has no path separator, is within the
/// given length bounds and only contains the allowed characters.
pub fn validate_identifier(id: &str, min: usize, max: usize) -> Result<(), ValidationError> {
    if id.is_empty() {
        return Err(ValidationError::empty());
    }

    if id.contains(PATH_SEPARATOR) {
        return Err(ValidationError::contain_separator(id.to_string()));
    }

    if id.len() < min || id.len() > max {
        return Err(ValidationError::invalid_length(
            id.to_string(),
            id.len(),
            min,
            max,
        ));
    }

    if !id
        .chars()
        .all(|c| c.is_alphanumeric() || VALID_SPECIAL_CHARS.contains(c))
    {
        return Err(ValidationError::invalid_character(id.to_string()));
    }

    Ok(())
}

pub fn validate_chain_identifier(id: &str) -> Result<(), ValidationError> {
    validate_identifier(id, 1, 64)
}

pub fn validate_port_identifier(id: &str) -> Result<(), ValidationError> {
    validate_identifier(id, 2, 128)
}

pub fn validate_channel_identifier(id: &str) -> Result<(), ValidationError> {
    validate_identifier(id, 8, 64)
}

macro_rules! identifier {
    ($name:ident, $validate:path) => {
        #[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(try_from = "String", into = "String")]
        pub struct $name(String);

        impl $name {
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl FromStr for $name {
            type Err = ValidationError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                $validate(s)?;
                Ok(Self(s.to_string()))
            }
        }

        impl TryFrom<String> for $name {
            type Error = ValidationError;

            fn try_from(s: String) -> Result<Self, Self::Error> {
                $validate(&s)?;
                Ok(Self(s))
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

        impl Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

identifier!(ChainId, validate_chain_identifier);
identifier!(PortId, validate_port_identifier);
identifier!(ChannelId, validate_channel_identifier_with_prefix);

fn validate_channel_identifier_with_prefix(id: &str) -> Result<(), ValidationError> {
    validate_channel_identifier(id)?;
    parse_channel_sequence(id)
        .map(|_| ())
        .ok_or_else(|| ValidationError::invalid_channel_prefix(id.to_string()))
}

fn parse_channel_sequence(id: &str) -> Option<u64> {
    let sequence = id.strip_prefix(CHANNEL_ID_PREFIX)?.strip_prefix('-')?;

    // Reject leading zeros and signs that `u64::from_str` would otherwise tolerate.
    if sequence.is_empty() || (sequence.len() > 1 && sequence.starts_with('0')) {
        return None;
    }

    if !sequence.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }

    sequence.parse().ok()
}

impl PortId {
    /// The port bound to the ICS 020 fungible token transfer module.
    pub fn transfer() -> Self {
        Self("transfer".to_string())
    }
}

impl ChannelId {
    pub fn new(sequence: u64) -> Self {
        Self(format!("{CHANNEL_ID_PREFIX}-{sequence}"))
    }

    pub fn sequence(&self) -> u64 {
        // The prefix was checked on construction.
        parse_channel_sequence(&self.0).unwrap_or_default()
    }

    /// Returns true if `id` has the `channel-<sequence>` shape expected of
    /// a channel identifier.
    pub fn is_valid(id: &str) -> bool {
        validate_channel_identifier_with_prefix(id).is_ok()
    }
}
