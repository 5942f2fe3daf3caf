//! Core types, config, errors, and command vocabulary for Drawbridge.

pub mod command;
pub mod config;
pub mod error;
