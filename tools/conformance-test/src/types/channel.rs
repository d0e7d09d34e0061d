/*!
   Channels between a pair of chains, as reported by the relayer.
*/

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::types::id::{ChannelId, PortId};
use crate::types::transfer::TransferDirection;

/// The counterparty end of a channel.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChannelCounterparty {
    pub port_id: PortId,
    pub channel_id: ChannelId,
}

/**
   A channel end on one chain, together with that chain's view of the
   counterparty end.
*/
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChannelOutput {
    pub state: String,
    pub ordering: String,
    pub version: String,
    pub port_id: PortId,
    pub channel_id: ChannelId,
    pub connection_hops: Vec<String>,
    pub counterparty: ChannelCounterparty,
}

impl ChannelOutput {
    /// Whether `other` is the counterparty end of this channel.
    pub fn is_counterparty_of(&self, other: &ChannelOutput) -> bool {
        self.channel_id == other.counterparty.channel_id
            && self.port_id == other.counterparty.port_id
            && other.channel_id == self.counterparty.channel_id
            && other.port_id == self.counterparty.port_id
    }

    /// The port and channel a transfer in `direction` is sent from.
    pub fn sender_end(&self, direction: TransferDirection) -> (&PortId, &ChannelId) {
        match direction {
            TransferDirection::SourceToDestination => (&self.port_id, &self.channel_id),
            TransferDirection::DestinationToSource => {
                (&self.counterparty.port_id, &self.counterparty.channel_id)
            }
        }
    }

    /**
       The port and channel a transfer in `direction` is received on. The
       receiving chain prefixes the denom of incoming tokens with these.
    */
    pub fn receiver_end(&self, direction: TransferDirection) -> (&PortId, &ChannelId) {
        match direction {
            TransferDirection::SourceToDestination => {
                (&self.counterparty.port_id, &self.counterparty.channel_id)
            }
            TransferDirection::DestinationToSource => (&self.port_id, &self.channel_id),
        }
    }
}

/**
   The channels discovered for one conformance run, seen from chain A.
   Shared read-only by every scenario of the run.
*/
pub type ChannelBinding = Arc<Vec<ChannelOutput>>;
