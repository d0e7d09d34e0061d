/*!
   Balance accounting of scenario wallets.

   Expected balances are computed from the balances observed before any
   transfer was sent, so that they do not depend on what other scenarios
   do concurrently on the same chains.
*/

use futures::future::try_join_all;
use tracing::{debug, info};

use crate::chain::handle::Chain;
use crate::error::Error;
use crate::framework::scenario::{ScenarioContext, TestCaseRun, TestUsers};
use crate::ibc::denom::derive_ibc_denom;
use crate::types::amount::Amount;
use crate::types::channel::ChannelOutput;
use crate::types::packet::PacketLifecycle;
use crate::types::transfer::{TransferDirection, TransferRecord};

/**
   Balances relevant to the transfers of one direction: the native
   balance of the sender, and the balance of the receiver in the derived
   denom of each bound channel.
*/
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct DirectionBalances {
    pub sender: Amount,
    pub receivers: Vec<Amount>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct BalanceSnapshot {
    pub src: DirectionBalances,
    pub dst: DirectionBalances,
}

impl BalanceSnapshot {
    pub fn direction(&self, direction: TransferDirection) -> &DirectionBalances {
        match direction {
            TransferDirection::SourceToDestination => &self.src,
            TransferDirection::DestinationToSource => &self.dst,
        }
    }
}

/// The denom transferred tokens are held under on the receiving chain of
/// `direction`, for one bound channel.
fn receiver_denom(
    sender: &dyn Chain,
    channel: &ChannelOutput,
    direction: TransferDirection,
) -> Result<String, Error> {
    let (port_id, channel_id) = channel.receiver_end(direction);
    derive_ibc_denom(port_id, channel_id, &sender.config().denom)
}

async fn direction_balances(
    ctx: &ScenarioContext,
    users: &TestUsers,
    direction: TransferDirection,
) -> Result<DirectionBalances, Error> {
    let (sender, receiver) = ctx.chains(direction);
    let wallet = users.sender(direction);

    let sender_address = wallet.formatted_address_with_prefix(&sender.config().account_prefix);
    let receiver_address = wallet.formatted_address_with_prefix(&receiver.config().account_prefix);

    let sender_balance = sender
        .get_balance(&sender_address, &sender.config().denom)
        .await?;

    let receivers = try_join_all(ctx.channels.iter().map(|channel| {
        let receiver_address = &receiver_address;
        async move {
            let denom = receiver_denom(sender.as_ref(), channel, direction)?;
            receiver.get_balance(receiver_address, &denom).await
        }
    }))
    .await?;

    Ok(DirectionBalances {
        sender: sender_balance,
        receivers,
    })
}

/// Record the balances of a scenario's wallets before it sends anything.
pub async fn snapshot_balances(
    ctx: &ScenarioContext,
    users: &TestUsers,
) -> Result<BalanceSnapshot, Error> {
    let (src, dst) = futures::try_join!(
        direction_balances(ctx, users, TransferDirection::SourceToDestination),
        direction_balances(ctx, users, TransferDirection::DestinationToSource),
    )?;

    Ok(BalanceSnapshot { src, dst })
}

/**
   Compute the balances expected once every transfer of one direction
   ended its lifecycle as `outcome`.

   The sender always pays the fees of each of its transactions, converted
   from the gas each one spent. When the packets were acknowledged the
   sender also loses the transferred amounts and each receiver gains
   one amount. When they timed out the amounts are refunded and the
   receivers are unchanged.
*/
pub fn expected_balances(
    outcome: PacketLifecycle,
    before: &DirectionBalances,
    records: &[TransferRecord],
    amount: Amount,
    fees_of: impl Fn(u64) -> Amount,
) -> Result<DirectionBalances, Error> {
    let mut sender = before.sender;

    for record in records {
        sender = sender.checked_sub(fees_of(record.gas_spent))?;

        if outcome == PacketLifecycle::Acknowledged {
            sender = sender.checked_sub(amount)?;
        }
    }

    let receivers = before
        .receivers
        .iter()
        .map(|balance| match outcome {
            PacketLifecycle::Acknowledged => balance.checked_add(amount),
            PacketLifecycle::TimedOut => Ok(*balance),
        })
        .collect::<Result<Vec<_>, _>>()?;

    Ok(DirectionBalances { sender, receivers })
}

/**
   Compare the balances of the wallets involved in the transfers of one
   direction with those expected for `outcome`.
*/
pub async fn check_balances(
    ctx: &ScenarioContext,
    run: &TestCaseRun,
    direction: TransferDirection,
    outcome: PacketLifecycle,
) -> Result<(), Error> {
    let (sender, receiver) = ctx.chains(direction);
    let wallet = run.users.sender(direction);

    let expected = expected_balances(
        outcome,
        run.balances_before.direction(direction),
        run.tx_cache.records(direction),
        ctx.config.transfer_amount,
        |gas| sender.gas_fees_in_native_denom(gas),
    )?;

    let sender_address = wallet.formatted_address_with_prefix(&sender.config().account_prefix);
    let sender_denom = &sender.config().denom;

    let observed = sender.get_balance(&sender_address, sender_denom).await?;

    debug!(
        scenario = %run.scenario,
        %direction,
        address = %sender_address,
        expected = %expected.sender,
        %observed,
        "checking sender balance"
    );

    if observed != expected.sender {
        return Err(Error::balance_mismatch(
            run.scenario.clone(),
            direction,
            sender.chain_id().clone(),
            receiver.chain_id().clone(),
            sender_address,
            sender_denom.clone(),
            expected.sender,
            observed,
        ));
    }

    let receiver_address = wallet.formatted_address_with_prefix(&receiver.config().account_prefix);

    for (channel, expected_balance) in ctx.channels.iter().zip(expected.receivers) {
        let denom = receiver_denom(sender.as_ref(), channel, direction)?;

        let observed = receiver.get_balance(&receiver_address, &denom).await?;

        debug!(
            scenario = %run.scenario,
            %direction,
            address = %receiver_address,
            %denom,
            expected = %expected_balance,
            %observed,
            "checking receiver balance"
        );

        if observed != expected_balance {
            return Err(Error::balance_mismatch(
                run.scenario.clone(),
                direction,
                receiver.chain_id().clone(),
                sender.chain_id().clone(),
                receiver_address.clone(),
                denom,
                expected_balance,
                observed,
            ));
        }
    }

    info!(scenario = %run.scenario, %direction, %outcome, "balances match packet outcome");

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    use test_log::test;

    use crate::types::packet::tests::dummy_packet;

    fn record(gas_spent: u64) -> TransferRecord {
        TransferRecord {
            height: 10,
            tx_hash: "AB".to_string(),
            gas_spent,
            packet: dummy_packet(1),
        }
    }

    fn fees(gas: u64) -> Amount {
        // 0.025 per unit of gas, rounded up.
        Amount::from((gas * 25 + 999) / 1000)
    }

    fn fresh_wallets() -> DirectionBalances {
        DirectionBalances {
            sender: Amount(10_000_000_000),
            receivers: vec![Amount::zero()],
        }
    }

    #[test]
    fn acknowledged_transfer() {
        let expected = expected_balances(
            PacketLifecycle::Acknowledged,
            &fresh_wallets(),
            &[record(100_000)],
            Amount(1_000_000),
            fees,
        )
        .unwrap();

        assert_eq!(expected.sender, Amount(10_000_000_000 - 1_000_000 - 2500));
        assert_eq!(expected.receivers, vec![Amount(1_000_000)]);
    }

    #[test]
    fn timed_out_transfer_refunds_amount() {
        let expected = expected_balances(
            PacketLifecycle::TimedOut,
            &fresh_wallets(),
            &[record(100_001)],
            Amount(1_000_000),
            fees,
        )
        .unwrap();

        assert_eq!(expected.sender, Amount(10_000_000_000 - 2501));
        assert_eq!(expected.receivers, vec![Amount::zero()]);
    }

    #[test]
    fn fees_are_charged_per_transaction() {
        let before = DirectionBalances {
            sender: Amount(10_000_000_000),
            receivers: vec![Amount(5), Amount::zero()],
        };

        let expected = expected_balances(
            PacketLifecycle::Acknowledged,
            &before,
            &[record(40_000), record(80_000)],
            Amount(1_000_000),
            fees,
        )
        .unwrap();

        assert_eq!(expected.sender, Amount(10_000_000_000 - 2_000_000 - 1000 - 2000));
        assert_eq!(expected.receivers, vec![Amount(1_000_005), Amount(1_000_000)]);
    }

    #[test]
    fn underflow_is_an_error() {
        let before = DirectionBalances {
            sender: Amount(10),
            receivers: vec![],
        };

        assert!(expected_balances(
            PacketLifecycle::Acknowledged,
            &before,
            &[record(1)],
            Amount(1_000_000),
            fees,
        )
        .is_err());
    }
}
