pub mod burn_lp;
pub mod executor;

pub use burn_lp::burn_lp;
pub use executor::{submit_bundle_until_confirmed, LaunchExecutor, LaunchSettings, LaunchStage, RunOutcome};
