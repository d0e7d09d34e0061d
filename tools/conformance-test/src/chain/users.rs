use std::sync::Arc;

use futures::future::try_join_all;
use tracing::info;

use crate::chain::blocks::wait_for_blocks;
use crate::chain::handle::ChainRef;
use crate::error::Error;
use crate::types::amount::Amount;
use crate::types::config::ConformanceConfig;
use crate::types::wallet::Wallet;
use crate::util::random::random_lowercase_string;

/**
   Create and fund one wallet on each of the given chains in a single
   call, then wait for the funding to be committed.

   The wallets are returned in the order of `chains`. Key names have the
   form `<key_prefix>-<chain id>-<3 random letters>`, so that the same
   prefix can be reused without key collisions.
*/
pub async fn get_and_fund_test_users(
    key_prefix: &str,
    amount: Amount,
    chains: &[ChainRef],
    config: &ConformanceConfig,
) -> Result<Vec<Arc<dyn Wallet>>, Error> {
    let wallets = try_join_all(chains.iter().map(|chain| async move {
        let key_name = format!(
            "{key_prefix}-{}-{}",
            chain.chain_id(),
            random_lowercase_string(3)
        );

        info!(
            chain_id = %chain.chain_id(),
            key_name = %key_name,
            %amount,
            "funding test user"
        );

        chain.create_funded_wallet(&key_name, amount).await
    }))
    .await?;

    wait_for_blocks(config.user_funding_blocks, chains, config.poll_interval).await?;

    Ok(wallets)
}
