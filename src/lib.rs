#![allow(clippy::doc_markdown)]
#![doc = include_str!("../README.md")]

mod aggregation;
mod cache;
pub mod capability;
mod commands;
pub mod config;
mod context;
pub mod discovery;
pub mod endpoint;
mod error;
mod gateway;
pub mod info;
pub mod models;
pub mod prelude;
pub mod quantity;
pub mod registry;
pub mod retry;
pub mod session;
pub mod snapshot;
#[cfg(test)]
mod testing;
pub mod transport;
pub mod updater;

pub use crate::{
    capability::{Capabilities, Capability},
    config::{GatewayConfig, UnknownMeterRoles},
    context::SharedContext,
    discovery::DiscoveryState,
    error::{Error, FetchError},
    gateway::Gateway,
    info::{Firmware, GatewayInfo},
    snapshot::Snapshot,
};
