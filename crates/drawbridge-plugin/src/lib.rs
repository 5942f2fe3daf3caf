//! Command interpreter and dispatch loop.
//!
//! The plugin half of the bridge: polls the gateway for command payloads and
//! replays them against a scene host.

pub mod factory;
pub mod mutate;
pub mod normalize;
pub mod runtime;
