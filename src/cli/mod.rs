//! CLI command implementations
//!
//! This module contains all CLI command handlers, organized by category:
//! - `zones`: Locality distance and zone computation
//! - `tranches`: Shipment distributions
//! - `tariffs`: Tariff tables and weighted allocations
//! - `strategy`: Clustering and reassignment
//! - `config`: Configuration and schema commands
//! - `util`: Shared utility functions

pub mod config;
pub mod strategy;
pub mod tariffs;
pub mod tranches;
pub mod util;
pub mod zones;

// Re-export all command functions for convenient access
pub use config::cmd_config;
pub use strategy::{cmd_cluster, cmd_reassign};
pub use tariffs::{cmd_global, cmd_tariffs};
pub use tranches::cmd_tranches;
pub use zones::cmd_zones;
