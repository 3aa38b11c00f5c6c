//! Raydium AMM v4 on top of an OpenBook market.

pub mod instructions;
pub mod market;
pub mod pool_keys;

pub use instructions::{
    build_create_pool_instructions, build_swap_buy_instructions, build_swap_sell_instructions,
    ComputeBudgetConfig, CreatePoolParams, FixedSide, InnerTransaction,
};
pub use market::MarketStateV3;
pub use pool_keys::{derive_pool_keys, PoolKeyInputs, PoolKeys};
