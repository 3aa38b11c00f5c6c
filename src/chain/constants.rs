// Well-known program ids and accounts used by the launch flow.
//
// Raydium AMM v4 and OpenBook live at different addresses on devnet and
// mainnet, so they are grouped per cluster in `ProgramIds`.

use solana_program::pubkey::Pubkey;

/// Wrapped SOL token mint address (9 decimals)
pub const WSOL_MINT: Pubkey = solana_program::pubkey!("So11111111111111111111111111111111111111112");

/// Raydium liquidity pool v4 program (mainnet)
pub const MAINNET_AMM_V4: Pubkey = solana_program::pubkey!("675kPX9MHTjS2zt1qfr1NYHuzeLXfQM9H24wFSUt1Mp8");

/// OpenBook market program (mainnet)
pub const MAINNET_OPENBOOK_MARKET: Pubkey = solana_program::pubkey!("srmqPvymJeFKQ4zGQed1GFppgkRHL9kaELCbyksJtPX");

/// Receives the pool creation fee on mainnet
pub const MAINNET_CREATE_POOL_FEE: Pubkey = solana_program::pubkey!("7YttLkHDoNj9wyDur5pM1ejNaAvT9X4eqaYcHQqtj2G5");

/// Raydium liquidity pool v4 program (devnet)
pub const DEVNET_AMM_V4: Pubkey = solana_program::pubkey!("HWy1jotHpo6UqeQxx49dpYYdQB8wj9Qk9MdxwjLvDHB8");

/// OpenBook market program (devnet)
pub const DEVNET_OPENBOOK_MARKET: Pubkey = solana_program::pubkey!("EoTcMgcDRTJVZDMZWBoU6rhYHZfkNTVEAfz3uUJRcYGj");

/// Receives the pool creation fee on devnet
pub const DEVNET_CREATE_POOL_FEE: Pubkey = solana_program::pubkey!("3XMrhbv989VxAMi3DErLV9eJht1pHppW5LbKxe9fkEFR");

/// Jito tip accounts (from official docs)
pub const JITO_TIP_ACCOUNTS: [Pubkey; 8] = [
    solana_program::pubkey!("96gYZGLnJYVFmbjzopPSU6QiEV5fGqZNyN9nmNhvrZU5"),
    solana_program::pubkey!("HFqU5x63VTqvQss8hp11i4wVV8bD44PvwucfZ2bU7gRe"),
    solana_program::pubkey!("Cw8CFyM9FkoMi7K7Crf6HNQqf4uEMzpKw6QNghXLvLkY"),
    solana_program::pubkey!("ADaUMid9yfUytqMBgopwjb2DTLSokTSzL1zt6iGPaS49"),
    solana_program::pubkey!("DfXygSm4jCyNCybVYYK6DwvWqjKee8pbDmJGcLWNDXjh"),
    solana_program::pubkey!("ADuUkR4vqLUMWXxW9gh6D6L8pMSawimctcNZ5pGwDcEt"),
    solana_program::pubkey!("DttWaMuVvTiduZRnguLF7jNxTgiMBZ1hyAumKUiL2KRL"),
    solana_program::pubkey!("3AVi9Tg9Uo68tJfuvoKvqKNWKkC5wPdSSdeBnizKZ6jT"),
];

/// Default block engine bundle endpoints
pub const DEFAULT_BLOCK_ENGINE_URLS: [&str; 5] = [
    "https://mainnet.block-engine.jito.wtf/api/v1/bundles",
    "https://amsterdam.mainnet.block-engine.jito.wtf/api/v1/bundles",
    "https://frankfurt.mainnet.block-engine.jito.wtf/api/v1/bundles",
    "https://ny.mainnet.block-engine.jito.wtf/api/v1/bundles",
    "https://tokyo.mainnet.block-engine.jito.wtf/api/v1/bundles",
];

/// Block engine limit on transactions per bundle
pub const MAX_BUNDLE_TRANSACTIONS: usize = 5;

/// Program ids the launch flow depends on for one cluster
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProgramIds {
    pub amm_v4: Pubkey,
    pub openbook_market: Pubkey,
    pub create_pool_fee: Pubkey,
}

impl ProgramIds {
    pub const MAINNET: ProgramIds = ProgramIds {
        amm_v4: MAINNET_AMM_V4,
        openbook_market: MAINNET_OPENBOOK_MARKET,
        create_pool_fee: MAINNET_CREATE_POOL_FEE,
    };

    pub const DEVNET: ProgramIds = ProgramIds {
        amm_v4: DEVNET_AMM_V4,
        openbook_market: DEVNET_OPENBOOK_MARKET,
        create_pool_fee: DEVNET_CREATE_POOL_FEE,
    };
}
