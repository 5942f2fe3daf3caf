//! HTTP gateway: turns text prompts into design commands and queues them
//! for the plugin runtime to collect.
//!
//! The gateway is the hub between people and the canvas: it accepts prompts,
//! runs them through a planner (rule-based or LLM), and hands the resulting
//! commands out one at a time over `/commands/next`.

pub mod planner;
pub mod queue;
pub mod server;
pub mod state;
pub mod ui;

pub use server::start_gateway;
pub use state::GatewayState;
