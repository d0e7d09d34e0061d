use core::time::Duration;

use futures::future::try_join_all;
use tokio::time::sleep;
use tracing::trace;

use crate::chain::handle::{Chain, ChainRef};
use crate::error::Error;

/// Wait until `chain` committed a block at `height` or above.
pub async fn wait_for_height(
    chain: &dyn Chain,
    height: u64,
    poll_interval: Duration,
) -> Result<u64, Error> {
    loop {
        let current = chain.height().await?;

        if current >= height {
            return Ok(current);
        }

        trace!(
            chain_id = %chain.chain_id(),
            current,
            target = height,
            "waiting for block"
        );

        sleep(poll_interval).await;
    }
}

/// Wait until every chain advanced by `blocks` blocks. The chains are waited
/// on concurrently.
pub async fn wait_for_blocks(
    blocks: u64,
    chains: &[ChainRef],
    poll_interval: Duration,
) -> Result<(), Error> {
    try_join_all(chains.iter().map(|chain| async move {
        let start = chain.height().await?;
        wait_for_height(chain.as_ref(), start + blocks, poll_interval).await
    }))
    .await?;

    Ok(())
}
