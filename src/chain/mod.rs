pub mod balance;
pub mod bundle;
pub mod constants;
pub mod rpc;
pub mod transaction_builder;
pub mod transaction_sender;

pub use bundle::{BundleRelay, BundleResult, JitoRelay};
pub use constants::{ProgramIds, WSOL_MINT};
pub use rpc::{ChainRpc, SignatureState, SimulationReport};
pub use transaction_builder::{AddressLookupTableCache, TransactionAssembler};
pub use transaction_sender::{explorer_url, SendResult, TransactionSender};
