use solana_client::client_error::ClientError;
use solana_sdk::pubkey::Pubkey;
use thiserror::Error;

/// Errors raised while preparing or submitting a launch.
#[derive(Debug, Error)]
pub enum LaunchError {
    #[error("account {0} not found")]
    MissingAccount(Pubkey),

    #[error("quote input {requested} is greater than current balance {available}")]
    InsufficientBalance { requested: u64, available: u64 },

    /// Blockhash could not be fetched after the retry.
    #[error("Failed to prepare transaction")]
    PrepareTransaction,

    #[error("rpc request failed: {0}")]
    Rpc(String),

    #[error("block engine request failed: {0}")]
    Relay(String),

    #[error("bundle holds {count} transactions, block engine accepts at most {max}")]
    BundleTooLarge { count: usize, max: usize },

    #[error("bundle not confirmed after {attempts} attempts")]
    BundleNotConfirmed { attempts: u32 },

    #[error("invalid market account: {0}")]
    InvalidMarket(String),

    #[error("instruction {index} does not fit in a single transaction ({size} bytes)")]
    TransactionTooLarge { index: usize, size: usize },

    #[error("failed to build instruction: {0}")]
    Instruction(String),

    #[error("failed to compile message: {0}")]
    Compile(String),

    #[error("failed to sign transaction: {0}")]
    Signing(String),

    #[error("invalid amount: {0}")]
    Amount(String),

    #[error("state file error: {0}")]
    State(String),
}

pub type Result<T> = std::result::Result<T, LaunchError>;

impl From<ClientError> for LaunchError {
    fn from(err: ClientError) -> Self {
        LaunchError::Rpc(err.to_string())
    }
}

impl From<reqwest::Error> for LaunchError {
    fn from(err: reqwest::Error) -> Self {
        LaunchError::Relay(err.to_string())
    }
}

impl From<serde_json::Error> for LaunchError {
    fn from(err: serde_json::Error) -> Self {
        LaunchError::State(err.to_string())
    }
}

impl From<std::io::Error> for LaunchError {
    fn from(err: std::io::Error) -> Self {
        LaunchError::State(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prepare_error_message_is_literal() {
        assert_eq!(
            LaunchError::PrepareTransaction.to_string(),
            "Failed to prepare transaction"
        );
    }

    #[test]
    fn test_insufficient_balance_message() {
        let err = LaunchError::InsufficientBalance {
            requested: 10,
            available: 5,
        };
        assert!(err.to_string().contains("greater than current balance"));
    }
}
