/*!
   Funding of scenario wallets and dispatch of the transfers a scenario
   sends before the relayer starts.
*/

use tracing::{debug, info};

use crate::chain::blocks::wait_for_blocks;
use crate::chain::users::get_and_fund_test_users;
use crate::error::Error;
use crate::framework::balance::snapshot_balances;
use crate::framework::scenario::{ScenarioContext, TestCaseRun, TestUsers};
use crate::types::amount::WalletAmount;
use crate::types::timeout::TransferOptions;
use crate::types::transfer::{TransferDirection, TransferRecord, TxCache};
use crate::types::wallet::Wallet;
use crate::util::random::random_lowercase_string;
use crate::util::task_group::TaskGroup;

/**
   Fund the two wallets of a scenario with a single funding call, and
   record their balances before any transfer is sent.
*/
pub async fn prepare_test_case(
    ctx: &ScenarioContext,
    scenario: &str,
    key_prefix: &str,
) -> Result<TestCaseRun, Error> {
    // Each run of a scenario gets fresh wallets.
    let key_prefix = format!("{key_prefix}-{}", random_lowercase_string(4));

    let wallets = get_and_fund_test_users(
        &key_prefix,
        ctx.config.user_faucet_fund,
        &ctx.both_chains(),
        &ctx.config,
    )
    .await?;

    let [chain_a, chain_b]: [_; 2] = wallets
        .try_into()
        .map_err(|_| Error::missing_test_users(scenario.to_string()))?;

    let users = TestUsers { chain_a, chain_b };

    let balances_before = snapshot_balances(ctx, &users).await?;

    Ok(TestCaseRun {
        scenario: scenario.to_string(),
        users,
        balances_before,
        tx_cache: TxCache::default(),
    })
}

/**
   Send one transfer per bound channel in each direction.

   Both directions are sent concurrently. Within a direction, transfers
   are sent one at a time, each followed by a one-block wait so that the
   recorded send height belongs to a committed block. The first failing
   direction fails the whole dispatch, once both directions finished.
*/
pub async fn send_transfers(
    ctx: &ScenarioContext,
    run: &TestCaseRun,
    options: &TransferOptions,
) -> Result<TxCache, Error> {
    let mut group = TaskGroup::new(format!("{} transfers", run.scenario));

    for direction in TransferDirection::ALL {
        let ctx = ctx.clone();
        let scenario = run.scenario.clone();
        let sender_wallet = run.users.sender(direction).clone();
        let options = options.clone();

        group.spawn(direction.to_string(), async move {
            let (sender, receiver) = ctx.chains(direction);

            send_direction(&ctx, &scenario, direction, sender_wallet.as_ref(), &options)
                .await
                .map_err(|e| {
                    Error::transfer(
                        scenario.clone(),
                        direction,
                        sender.chain_id().clone(),
                        receiver.chain_id().clone(),
                        e.into(),
                    )
                })
        });
    }

    let mut records = group.join().await?.into_iter();

    Ok(TxCache {
        src: records.next().unwrap_or_default(),
        dst: records.next().unwrap_or_default(),
    })
}

async fn send_direction(
    ctx: &ScenarioContext,
    scenario: &str,
    direction: TransferDirection,
    sender_wallet: &dyn Wallet,
    options: &TransferOptions,
) -> Result<Vec<TransferRecord>, Error> {
    let (sender, receiver) = ctx.chains(direction);

    let amount = WalletAmount {
        address: sender_wallet.formatted_address_with_prefix(&receiver.config().account_prefix),
        denom: sender.config().denom.clone(),
        amount: ctx.config.transfer_amount,
    };

    let mut records = Vec::with_capacity(ctx.channels.len());

    for channel in ctx.channels.iter() {
        let (_, channel_id) = channel.sender_end(direction);

        info!(
            scenario,
            %direction,
            chain_id = %sender.chain_id(),
            %channel_id,
            amount = %amount.amount,
            timeout = %options.timeout,
            "sending ibc transfer"
        );

        let record = sender
            .send_ibc_transfer(channel_id, sender_wallet.key_name(), &amount, options)
            .await?;

        record.validate()?;

        debug!(
            scenario,
            %direction,
            height = record.height,
            tx_hash = %record.tx_hash,
            sequence = record.packet.sequence,
            "ibc transfer committed"
        );

        records.push(record);

        wait_for_blocks(1, &[sender.clone()], ctx.config.poll_interval).await?;
    }

    Ok(records)
}
