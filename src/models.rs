//! Endpoint payloads and the snapshot sub-objects built from them.

pub mod ensemble;
pub mod generator;
pub mod inverter;
pub mod meter;
pub mod production;
pub mod tariff;
