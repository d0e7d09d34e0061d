use core::fmt::{self, Display};

use serde::{Deserialize, Serialize};

use crate::error::Error;
use crate::types::packet::Packet;

/**
   The direction of a transfer within a chain pair. Chain A is the
   "source" and chain B the "destination" of the pair.
*/
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TransferDirection {
    SourceToDestination,
    DestinationToSource,
}

impl TransferDirection {
    pub const ALL: [TransferDirection; 2] = [
        TransferDirection::SourceToDestination,
        TransferDirection::DestinationToSource,
    ];
}

impl Display for TransferDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransferDirection::SourceToDestination => write!(f, "source->destination"),
            TransferDirection::DestinationToSource => write!(f, "destination->source"),
        }
    }
}

/**
   The result of broadcasting an IBC transfer: the block it was committed
   in, the gas it consumed, and the packet it sent.
*/
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransferRecord {
    /// Height of the block the transfer was committed in. Packet polling
    /// is anchored at this height.
    pub height: u64,
    pub tx_hash: String,
    pub gas_spent: u64,
    pub packet: Packet,
}

impl TransferRecord {
    pub fn validate(&self) -> Result<(), Error> {
        if self.height == 0 {
            return Err(Error::invalid_transfer_tx(
                "tx height cannot be 0".to_string(),
            ));
        }

        if self.tx_hash.is_empty() {
            return Err(Error::invalid_transfer_tx(
                "tx hash cannot be empty".to_string(),
            ));
        }

        if self.gas_spent == 0 {
            return Err(Error::invalid_transfer_tx(
                "tx cannot have 0 gas spent".to_string(),
            ));
        }

        self.packet
            .validate()
            .map_err(|e| Error::invalid_transfer_tx(format!("tx packet: {e}")))
    }
}

/**
   Transfers sent by a scenario during setup, one per bound channel and
   direction, kept until the scenario assertions run.
*/
#[derive(Clone, Debug, Default)]
pub struct TxCache {
    pub src: Vec<TransferRecord>,
    pub dst: Vec<TransferRecord>,
}

impl TxCache {
    pub fn records(&self, direction: TransferDirection) -> &[TransferRecord] {
        match direction {
            TransferDirection::SourceToDestination => &self.src,
            TransferDirection::DestinationToSource => &self.dst,
        }
    }
}
