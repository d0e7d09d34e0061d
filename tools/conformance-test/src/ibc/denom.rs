/*!
   Helper functions for deriving IBC denom.
*/

use core::fmt::{self, Display};

use sha2::{Digest, Sha256};
use subtle_encoding::hex;

use crate::error::{handle_generic_error, Error};
use crate::types::id::{validate_port_identifier, ChannelId, PortId};

/**
   The trace of a token through IBC: the `port/channel` hops it went
   through, most recent first, and the denomination on its origin chain.
*/
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DenomTrace {
    pub path: String,
    pub base_denom: String,
}

impl DenomTrace {
    /// Whether the token is native to the chain holding it.
    pub fn is_native(&self) -> bool {
        self.path.is_empty()
    }

    pub fn full_path(&self) -> String {
        if self.is_native() {
            self.base_denom.clone()
        } else {
            format!("{}/{}", self.path, self.base_denom)
        }
    }

    /**
       The denomination under which the token is held in bank balances:
       the base denom for native tokens, and `ibc/<hash>` for tokens
       received over IBC.
    */
    pub fn ibc_denom(&self) -> Result<String, Error> {
        if self.is_native() {
            Ok(self.base_denom.clone())
        } else {
            derive_denom_with_path(&self.full_path())
        }
    }
}

impl Display for DenomTrace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.full_path())
    }
}

/// Prefix a denomination with the port and channel it was received on.
pub fn get_prefixed_denom(port_id: &PortId, channel_id: &ChannelId, denom: &str) -> String {
    format!("{port_id}/{channel_id}/{denom}")
}

/**
   Split a raw denomination into its trace path and base denom.

   Leading `port/channel` pairs are consumed as long as the channel part
   is a well-formed channel identifier. Whatever remains is the base
   denom, which may itself contain `/`.
*/
pub fn parse_denom_trace(raw_denom: &str) -> DenomTrace {
    let segments: Vec<&str> = raw_denom.split('/').collect();

    let mut hops = 0;
    while hops * 2 + 2 <= segments.len() {
        let port = segments[hops * 2];
        let channel = segments[hops * 2 + 1];

        if validate_port_identifier(port).is_err() || !ChannelId::is_valid(channel) {
            break;
        }

        hops += 1;
    }

    // The base denom must keep at least one segment.
    if hops * 2 == segments.len() {
        hops -= 1;
    }

    DenomTrace {
        path: segments[..hops * 2].join("/"),
        base_denom: segments[hops * 2..].join("/"),
    }
}

/**
   Derives the denom on a chain of a token received on it via IBC, over
   the given port and channel of that chain.
*/
pub fn derive_ibc_denom(
    port_id: &PortId,
    channel_id: &ChannelId,
    denom: &str,
) -> Result<String, Error> {
    parse_denom_trace(&get_prefixed_denom(port_id, channel_id, denom)).ibc_denom()
}

/// Derive the transferred token denomination using
/// <https://github.com/cosmos/ibc-go/blob/main/docs/architecture/adr-001-coin-source-tracing.md>
fn derive_denom_with_path(transfer_path: &str) -> Result<String, Error> {
    let mut hasher = Sha256::new();
    hasher.update(transfer_path.as_bytes());

    let denom_bytes = hasher.finalize();
    let denom_hex = String::from_utf8(hex::encode_upper(denom_bytes)).map_err(handle_generic_error)?;

    Ok(format!("ibc/{denom_hex}"))
}
