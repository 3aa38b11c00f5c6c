// Raydium Launch Bundler Library
//
// Creates a Raydium AMM v4 pool on an existing OpenBook market, funds it
// from the LP wallet and buys from a set of swap wallets:
// - Deterministic pool key derivation and raw AMM v4 instructions
// - Versioned transaction assembly with address lookup tables
// - Direct submission with confirmation polling (devnet)
// - Atomic Jito bundle submission, retried until confirmed (mainnet)
// - JSON state file shared between runs

pub mod chain;
pub mod config;
pub mod data;
pub mod dex;
pub mod error;
pub mod launch;
pub mod utils;

pub use error::{LaunchError, Result};
