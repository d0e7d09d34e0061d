use tracing::debug;

use crate::error::Error;
use crate::relayer::handle::Relayer;
use crate::types::channel::ChannelOutput;
use crate::types::id::{ChainId, PortId};

/**
   Find the transfer channel connecting `src_chain_id` to `dst_chain_id`,
   as seen from the source chain.

   A channel qualifies when it is bound to the transfer port on both ends
   and each end names the other as its counterparty.
*/
pub async fn get_transfer_channel(
    relayer: &dyn Relayer,
    src_chain_id: &ChainId,
    dst_chain_id: &ChainId,
) -> Result<ChannelOutput, Error> {
    let discovery_error = |reason: String| {
        Error::channel_discovery(src_chain_id.clone(), dst_chain_id.clone(), reason)
    };

    let src_channels = relayer
        .get_channels(src_chain_id)
        .await
        .map_err(|e| discovery_error(format!("failed to get channels of {src_chain_id}: {e}")))?;

    if src_channels.is_empty() {
        return Err(discovery_error(format!("no channels found on {src_chain_id}")));
    }

    let dst_channels = relayer
        .get_channels(dst_chain_id)
        .await
        .map_err(|e| discovery_error(format!("failed to get channels of {dst_chain_id}: {e}")))?;

    if dst_channels.is_empty() {
        return Err(discovery_error(format!("no channels found on {dst_chain_id}")));
    }

    let transfer_port = PortId::transfer();

    let channel = src_channels
        .into_iter()
        .filter(|channel| channel.port_id == transfer_port)
        .find(|src_channel| {
            dst_channels
                .iter()
                .filter(|channel| channel.port_id == transfer_port)
                .any(|dst_channel| src_channel.is_counterparty_of(dst_channel))
        })
        .ok_or_else(|| discovery_error("no matching transfer channel found".to_string()))?;

    debug!(
        src_chain_id = %src_chain_id,
        dst_chain_id = %dst_chain_id,
        channel_id = %channel.channel_id,
        counterparty_channel_id = %channel.counterparty.channel_id,
        "discovered transfer channel"
    );

    Ok(channel)
}
