// Production-quality lints
#![warn(
    clippy::todo,
    clippy::unimplemented,
    clippy::dbg_macro,
    clippy::print_stdout,
    clippy::print_stderr
)]
// Deny truly dangerous patterns
#![deny(clippy::mem_forget)]
// Allow common patterns in library code
#![allow(clippy::missing_errors_doc, clippy::missing_panics_doc)]

//! # zonetarif: delivery zones and per-zone tariffs
//!
//! Classifies localities into distance zones around their agency, bins
//! shipments into weight (or pallet) tranches, and turns per-tranche base
//! tariffs into per-zone prices.
//!
//! ## Quick Start
//!
//! ```rust
//! use zonetarif::{classify, fixed_gap, FixedGapParams, SolveOptions, TariffConfig, Zone};
//!
//! assert_eq!(classify(20.0)?, Zone::Zone1);
//!
//! let config = TariffConfig::default();
//! let weight = config.scale(zonetarif::ScaleKind::Weight);
//! let table = fixed_gap(
//!     &weight.scale()?,
//!     &weight.base_tariffs,
//!     &weight.distribution,
//!     &FixedGapParams::default(),
//!     &SolveOptions::default(),
//! )?;
//! let row = table.row("40-50kg")?;
//! assert!(row.z1 < row.z2 && row.z2 < row.z3);
//! # Ok::<(), zonetarif::Error>(())
//! ```
//!
//! ## Pricing policies
//!
//! | Policy | Input | Output |
//! |--------|-------|--------|
//! | **Fixed gap** (default) | base tariff + zone shares per tranche | per-zone prices whose blend is the base |
//! | **Direct** | base tariff per tranche + zone coefficients | `base * coef` |
//! | **Global weighted** | network zone shares + target | one set of zone prices averaging to the target |
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                                                              │
//! │  CSV / LocalitySource                                        │
//! │       │                                                      │
//! │       ├──► ZoneThresholds::assign_zones ──► Locality + Zone  │
//! │       │         ├──► analysis::zone_summary                  │
//! │       │         └──► strategy (kmeans, anomalies, reassign)  │
//! │       │                                                      │
//! │  CSV / ShipmentSource                                        │
//! │       │                                                      │
//! │       └──► CrossTab::build ──► Distribution                  │
//! │                                     │                        │
//! │  TariffConfig (YAML)                ▼                        │
//! │       └──► fixed_gap / direct / global_weighted ──► tables   │
//! │                                                   │          │
//! │                                  export (CSV, JSON, text) ◄──┘
//! │                                                              │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! Every computation is a pure function of its inputs. Mutations of the
//! locality registry take an explicit [`AccessContext`].

// Domain
pub mod error;
pub mod geo;
pub mod model;
pub mod tranche;
pub mod util;
pub mod zone;

// Computations
pub mod analysis;
pub mod distribution;
pub mod strategy;
pub mod tariff;

// Boundaries
pub mod access;
pub mod config;
pub mod config_validate;
pub mod export;
pub mod source;

// Re-exports
pub use access::{AccessContext, Credentials, LocalityId, LocalityRegistry, LocalityUpdate, Role};
pub use analysis::{network_summary, zone_summary, ZoneSummary};
pub use config::{ScaleConfig, ScaleKind, TariffConfig};
pub use distribution::{agency_stats, commune_counts, zone_stats, Axis, CrossTab, GroupStats};
pub use error::{Error, Result};
pub use export::{to_json, CsvExport, TextTable};
pub use geo::haversine_km;
pub use model::{Agency, Batch, Coordinates, Locality, PerZone, RowIssue, Shipment, Zone};
pub use source::{CsvOptions, CsvSource, LocalitySource, ShipmentSource};
pub use strategy::{
    commune_profiles, far_localities, kmeans, suggest_new_agencies, suggest_reassignments,
    Anomaly, Clustering, CommuneProfile, NewAgencySuggestion, Reassignment, StrategyThresholds,
};
pub use tariff::{
    aggregate_network_shares, direct, fixed_gap, global_weighted, per_agency_weighted,
    AgencyShares, AgencyTariff, FixedGapParams, FlagKind, FlaggedTranche, GlobalTariff,
    PricingPolicy, SolveOptions, TariffRow, TariffTable,
};
pub use tranche::{weight_tranche, Tranche, TrancheScale};
pub use zone::{classify, ZoneThresholds};

/// Version of zonetarif
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
