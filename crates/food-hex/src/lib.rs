//! food-hex: application core of the food-ordering backend (services, cache
//! layer, event delivery) plus its inbound HTTP adapter.

pub mod config;
pub mod errors;

pub mod application;
pub mod outbound; // event publishers

pub use food_types::{domain, ports};

pub mod inbound; // HTTP adapter (server + handlers)
