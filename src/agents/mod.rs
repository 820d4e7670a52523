//! Concrete strategy agents. Demonstration only — built purely atop
//! `sim_core::Agent` and the message topics the exchange agent exposes,
//! the same contract any other strategy would use.

pub mod liquidity_provider;
pub mod momentum;

pub use liquidity_provider::LiquidityProviderAgent;
pub use momentum::MomentumTraderAgent;
