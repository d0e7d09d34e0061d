/*!
   Bounded polling for the end of a packet's lifecycle.

   The poll window is counted in blocks from the height the packet was
   sent at, never in wall-clock time.
*/

use core::time::Duration;

use tracing::{debug, trace};

use crate::chain::blocks::wait_for_height;
use crate::chain::handle::Chain;
use crate::error::Error;
use crate::types::packet::{
    Packet, PacketAcknowledgement, PacketLifecycle, PacketOutcome, PacketTimeout,
};

/**
   Look for an acknowledgement or a timeout of `packet` on its sending
   chain, in every block from `start_height` to `max_height` included.
   The first proof found is validated and returned.
*/
pub async fn poll_for_packet_outcome(
    chain: &dyn Chain,
    packet: &Packet,
    start_height: u64,
    max_height: u64,
    poll_interval: Duration,
) -> Result<PacketOutcome, Error> {
    if max_height < start_height {
        return Err(Error::invalid_poll_window(start_height, max_height));
    }

    for height in start_height..=max_height {
        wait_for_height(chain, height, poll_interval).await?;

        trace!(chain_id = %chain.chain_id(), height, %packet, "polling for packet outcome");

        let acks = chain.acknowledgements(height).await?;

        let found = match acks.into_iter().find(|ack| &ack.packet == packet) {
            Some(ack) => Some(PacketOutcome::Acknowledged(ack)),
            None => chain
                .timeouts(height)
                .await?
                .into_iter()
                .find(|timeout| &timeout.packet == packet)
                .map(PacketOutcome::TimedOut),
        };

        if let Some(outcome) = found {
            outcome.validate()?;

            debug!(
                chain_id = %chain.chain_id(),
                height,
                %packet,
                outcome = %outcome.lifecycle(),
                "found packet outcome"
            );

            return Ok(outcome);
        }
    }

    Err(Error::poll_exhausted(
        chain.chain_id().clone(),
        packet.sequence,
        start_height,
        max_height,
    ))
}

/// Poll for the acknowledgement of `packet`. Finding a timeout instead is
/// an error.
pub async fn poll_for_ack(
    chain: &dyn Chain,
    packet: &Packet,
    start_height: u64,
    max_height: u64,
    poll_interval: Duration,
) -> Result<PacketAcknowledgement, Error> {
    match poll_for_packet_outcome(chain, packet, start_height, max_height, poll_interval).await? {
        PacketOutcome::Acknowledged(ack) => Ok(ack),
        PacketOutcome::TimedOut(_) => Err(Error::unexpected_packet_outcome(
            chain.chain_id().clone(),
            packet.sequence,
            PacketLifecycle::Acknowledged,
            PacketLifecycle::TimedOut,
        )),
    }
}

/// Poll for the timeout of `packet`. Finding an acknowledgement instead is
/// an error.
pub async fn poll_for_timeout(
    chain: &dyn Chain,
    packet: &Packet,
    start_height: u64,
    max_height: u64,
    poll_interval: Duration,
) -> Result<PacketTimeout, Error> {
    match poll_for_packet_outcome(chain, packet, start_height, max_height, poll_interval).await? {
        PacketOutcome::TimedOut(timeout) => Ok(timeout),
        PacketOutcome::Acknowledged(_) => Err(Error::unexpected_packet_outcome(
            chain.chain_id().clone(),
            packet.sequence,
            PacketLifecycle::TimedOut,
            PacketLifecycle::Acknowledged,
        )),
    }
}
