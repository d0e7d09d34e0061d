/*!
   IBC packets and the proofs of their lifecycle end: an acknowledgement
   when the packet was delivered, or a timeout when it expired first.
*/

use core::fmt::{self, Display};

use serde::{Deserialize, Serialize};

use crate::error::Error;
use crate::types::id::{validate_channel_identifier, validate_port_identifier};
use crate::types::id::{ChannelId, PortId};

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Packet {
    pub sequence: u64,
    pub source_port: PortId,
    pub source_channel: ChannelId,
    pub destination_port: PortId,
    pub destination_channel: ChannelId,
    pub data: Vec<u8>,

    /// Absolute counterparty height after which the packet times out,
    /// zero when the height bound is disabled.
    pub timeout_height: u64,

    /// Absolute counterparty time in nanoseconds after which the packet
    /// times out, zero when the timestamp bound is disabled.
    pub timeout_timestamp: u64,
}

impl Packet {
    pub fn validate(&self) -> Result<(), Error> {
        if self.sequence == 0 {
            return Err(Error::invalid_packet(
                "packet sequence cannot be 0".to_string(),
            ));
        }

        for (name, id) in [
            ("source port", self.source_port.as_str()),
            ("destination port", self.destination_port.as_str()),
        ] {
            validate_port_identifier(id)
                .map_err(|e| Error::invalid_packet(format!("invalid {name}: {e}")))?;
        }

        for (name, id) in [
            ("source channel", self.source_channel.as_str()),
            ("destination channel", self.destination_channel.as_str()),
        ] {
            validate_channel_identifier(id)
                .map_err(|e| Error::invalid_packet(format!("invalid {name}: {e}")))?;
        }

        if self.data.is_empty() {
            return Err(Error::invalid_packet(
                "packet data bytes cannot be empty".to_string(),
            ));
        }

        Ok(())
    }
}

impl Display for Packet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}/{}->{}/{}#{}",
            self.source_port,
            self.source_channel,
            self.destination_port,
            self.destination_channel,
            self.sequence
        )
    }
}

/// Proof that a packet was received by its destination and acknowledged
/// back to its source.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PacketAcknowledgement {
    pub packet: Packet,
    pub acknowledgement: Vec<u8>,
}

impl PacketAcknowledgement {
    pub fn validate(&self) -> Result<(), Error> {
        self.packet
            .validate()
            .map_err(|e| Error::invalid_acknowledgement(format!("invalid packet: {e}")))?;

        if self.acknowledgement.is_empty() {
            return Err(Error::invalid_acknowledgement(
                "acknowledgement cannot be empty".to_string(),
            ));
        }

        Ok(())
    }
}

/// Proof that a packet expired on its destination and was timed out on
/// its source.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PacketTimeout {
    pub packet: Packet,
}

impl PacketTimeout {
    pub fn validate(&self) -> Result<(), Error> {
        self.packet.validate()
    }
}

/// The end of a packet's lifecycle as observed on the source chain.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum PacketLifecycle {
    Acknowledged,
    TimedOut,
}

impl Display for PacketLifecycle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PacketLifecycle::Acknowledged => write!(f, "acknowledged"),
            PacketLifecycle::TimedOut => write!(f, "timed out"),
        }
    }
}

/// An acknowledgement or timeout found for a polled packet.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PacketOutcome {
    Acknowledged(PacketAcknowledgement),
    TimedOut(PacketTimeout),
}

impl PacketOutcome {
    pub fn lifecycle(&self) -> PacketLifecycle {
        match self {
            PacketOutcome::Acknowledged(_) => PacketLifecycle::Acknowledged,
            PacketOutcome::TimedOut(_) => PacketLifecycle::TimedOut,
        }
    }

    pub fn packet(&self) -> &Packet {
        match self {
            PacketOutcome::Acknowledged(ack) => &ack.packet,
            PacketOutcome::TimedOut(timeout) => &timeout.packet,
        }
    }

    pub fn validate(&self) -> Result<(), Error> {
        match self {
            PacketOutcome::Acknowledged(ack) => ack.validate(),
            PacketOutcome::TimedOut(timeout) => timeout.validate(),
        }
    }
}

/// The ICS 020 fungible token packet payload.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FungibleTokenPacketData {
    pub denom: String,
    pub amount: String,
    pub sender: String,
    pub receiver: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub memo: String,
}

impl FungibleTokenPacketData {
    pub fn to_bytes(&self) -> Result<Vec<u8>, Error> {
        serde_json::to_vec(self).map_err(|e| Error::generic(e.into()))
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, Error> {
        serde_json::from_slice(bytes).map_err(|e| Error::invalid_packet(e.to_string()))
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    use test_log::test;

    pub(crate) fn dummy_packet(sequence: u64) -> Packet {
        Packet {
            sequence,
            source_port: PortId::transfer(),
            source_channel: ChannelId::new(0),
            destination_port: PortId::transfer(),
            destination_channel: ChannelId::new(1),
            data: br#"{"denom":"uxion","amount":"1"}"#.to_vec(),
            timeout_height: 0,
            timeout_timestamp: 0,
        }
    }

    #[test]
    fn valid_packet() {
        assert!(dummy_packet(1).validate().is_ok());
    }

    #[test]
    fn reject_zero_sequence() {
        assert!(dummy_packet(0).validate().is_err());
    }

    #[test]
    fn reject_empty_data() {
        let packet = Packet {
            data: vec![],
            ..dummy_packet(1)
        };
        assert!(packet.validate().is_err());
    }

    #[test]
    fn reject_empty_acknowledgement() {
        let ack = PacketAcknowledgement {
            packet: dummy_packet(1),
            acknowledgement: vec![],
        };
        assert!(ack.validate().is_err());

        let ack = PacketAcknowledgement {
            acknowledgement: br#"{"result":"AQ=="}"#.to_vec(),
            ..ack
        };
        assert!(ack.validate().is_ok());
    }

    #[test]
    fn token_packet_data_json() {
        let data = FungibleTokenPacketData {
            denom: "uxion".to_string(),
            amount: "1000000".to_string(),
            sender: "xion1sender".to_string(),
            receiver: "osmo1receiver".to_string(),
            memo: String::new(),
        };

        let bytes = data.to_bytes().unwrap();
        assert_eq!(
            String::from_utf8(bytes.clone()).unwrap(),
            r#"{"denom":"uxion","amount":"1000000","sender":"xion1sender","receiver":"osmo1receiver"}"#
        );
        assert_eq!(FungibleTokenPacketData::from_bytes(&bytes).unwrap(), data);
    }
}
