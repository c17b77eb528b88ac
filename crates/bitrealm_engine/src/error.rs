use bitrealm_protocol::{AccountId, BattleId};
use std::time::Duration;
use thiserror::Error;

/// Battle session misuse. Every variant is reported back to the client; none
/// of them closes the connection.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum BattleError {
    #[error("battle {0} not found")]
    UnknownBattle(BattleId),

    #[error("battle {0} has already been resolved")]
    AlreadyResolved(BattleId),

    #[error("battle {0} is already being settled")]
    SettlementInProgress(BattleId),

    #[error("reward matrix has {matrix_len} entries but battle has {participants} participants")]
    RewardIndexOutOfRange {
        matrix_len: usize,
        participants: usize,
    },

    #[error("level {0} not found")]
    UnknownLevel(String),

    #[error("level {0} has no monsters to draw from")]
    EmptyMonsterPool(String),
}

/// Failures of the external document store.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StoreError {
    #[error("document store timed out during {operation} after {timeout:?}")]
    Timeout {
        operation: &'static str,
        timeout: Duration,
    },

    #[error("no profile for account {0}")]
    NotFound(AccountId),

    #[error("document store failure: {0}")]
    Backend(String),
}
