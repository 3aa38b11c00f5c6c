pub mod amount;
pub mod retry;
pub mod serde_helpers;

pub use amount::TokenAmount;
pub use retry::RetryPolicy;
