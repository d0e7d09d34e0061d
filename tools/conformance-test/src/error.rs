//! Error type used for the conformance harness.

use eyre::Report;
use flex_error::{define_error, TraceError};

use crate::types::amount::Amount;
use crate::types::id::{ChainId, ChannelId, ValidationError};
use crate::types::packet::PacketLifecycle;
use crate::types::transfer::TransferDirection;

define_error! {
    Error {
        Generic
            [ TraceError<Report> ]
            | _ | { "generic error" },

        Io
            [ TraceError<std::io::Error> ]
            | _ | { "io error"},

        ConfigDecode
            { path: String }
            [ TraceError<toml::de::Error> ]
            | e | { format_args!("invalid conformance configuration at {}", e.path) },

        Identifier
            [ ValidationError ]
            | _ | { "invalid identifier" },

        Configuration
            { reason: String }
            | e | { format_args!("configuration error: {}", e.reason) },

        ChannelDiscovery
            {
                src_chain_id: ChainId,
                dst_chain_id: ChainId,
                reason: String,
            }
            | e | {
                format_args!("channel discovery failed between {} and {}: {}",
                    e.src_chain_id, e.dst_chain_id, e.reason)
            },

        RelayerStart
            { relayer: String }
            [ TraceError<Report> ]
            | e | { format_args!("failed to start relayer {}", e.relayer) },

        Transfer
            {
                scenario: String,
                direction: TransferDirection,
                sender_chain_id: ChainId,
                receiver_chain_id: ChainId,
            }
            [ TraceError<Report> ]
            | e | {
                format_args!("scenario `{}`: {} transfer from {} to {} failed",
                    e.scenario, e.direction, e.sender_chain_id, e.receiver_chain_id)
            },

        InvalidTransferTx
            { reason: String }
            | e | { format_args!("invalid ibc transfer tx: {}", e.reason) },

        InvalidPacket
            { reason: String }
            | e | { format_args!("invalid packet: {}", e.reason) },

        InvalidAcknowledgement
            { reason: String }
            | e | { format_args!("invalid acknowledgement: {}", e.reason) },

        PollExhausted
            {
                chain_id: ChainId,
                sequence: u64,
                start_height: u64,
                max_height: u64,
            }
            | e | {
                format_args!("no acknowledgement or timeout observed on chain {} for packet with sequence {} between heights {} and {}",
                    e.chain_id, e.sequence, e.start_height, e.max_height)
            },

        InvalidPollWindow
            { start_height: u64, max_height: u64 }
            | e | {
                format_args!("max poll height {} must be greater than or equal to start height {}",
                    e.max_height, e.start_height)
            },

        UnexpectedPacketOutcome
            {
                chain_id: ChainId,
                sequence: u64,
                expected: PacketLifecycle,
                actual: PacketLifecycle,
            }
            | e | {
                format_args!("expected packet with sequence {} on chain {} to be {}, but it was {}",
                    e.sequence, e.chain_id, e.expected, e.actual)
            },

        BalanceMismatch
            {
                scenario: String,
                direction: TransferDirection,
                chain_id: ChainId,
                counterparty_chain_id: ChainId,
                address: String,
                denom: String,
                expected: Amount,
                observed: Amount,
            }
            | e | {
                format_args!("scenario `{}` ({}): balance of {} on chain {} (counterparty {}) in denom {} expected to be {}, observed {}",
                    e.scenario, e.direction, e.address, e.chain_id, e.counterparty_chain_id, e.denom, e.expected, e.observed)
            },

        ScenarioAssertion
            {
                scenario: String,
                direction: TransferDirection,
                sender_chain_id: ChainId,
                receiver_chain_id: ChainId,
            }
            [ TraceError<Report> ]
            | e | {
                format_args!("scenario `{}`: assertion on {} transfer from {} to {} failed",
                    e.scenario, e.direction, e.sender_chain_id, e.receiver_chain_id)
            },

        DuplicateScenario
            { name: String }
            | e | { format_args!("scenario `{}` is registered more than once", e.name) },

        MissingTestUsers
            { scenario: String }
            | e | { format_args!("scenario `{}` has no funded test users", e.scenario) },

        TaskJoin
            { task: String, reason: String }
            | e | { format_args!("task `{}` did not run to completion: {}", e.task, e.reason) },

        AmountOverflow
            { left: Amount, right: Amount }
            | e | { format_args!("arithmetic overflow when combining amounts {} and {}", e.left, e.right) },

        Assertion
            { message: String }
            | e | { format_args!("assertion failure: {}", e.message) },

        UnknownKey
            { chain_id: ChainId, key_name: String }
            | e | { format_args!("key `{}` does not exist on chain {}", e.key_name, e.chain_id) },

        InsufficientFunds
            {
                chain_id: ChainId,
                address: String,
                denom: String,
                balance: Amount,
                required: Amount,
            }
            | e | {
                format_args!("account {} on chain {} holds {}{} but {}{} is required",
                    e.address, e.chain_id, e.balance, e.denom, e.required, e.denom)
            },

        FaucetNotFunded
            { chain_id: ChainId }
            | e | { format_args!("faucet account on chain {} has not been funded", e.chain_id) },

        UnknownChannel
            { chain_id: ChainId, channel_id: ChannelId }
            | e | { format_args!("channel {} does not exist on chain {}", e.channel_id, e.chain_id) },

        UnknownPath
            { relayer: String, path: String }
            | e | { format_args!("relayer {} has no path named `{}`", e.relayer, e.path) },

        RelayerNotRunning
            { relayer: String }
            | e | { format_args!("relayer {} is not running", e.relayer) },

        RelayerAlreadyRunning
            { relayer: String }
            | e | { format_args!("relayer {} is already running", e.relayer) },

        PoisonedMutex
            | _ | { "poisoned mutex" },
    }
}

pub fn handle_generic_error(e: impl Into<Report>) -> Error {
    Error::generic(e.into())
}

impl From<Report> for Error {
    fn from(e: Report) -> Self {
        Error::generic(e)
    }
}

impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Self {
        Error::io(e)
    }
}

impl From<ValidationError> for Error {
    fn from(e: ValidationError) -> Self {
        Error::identifier(e)
    }
}
