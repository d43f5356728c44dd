//! Pricing Engine - Dealer-rebate-adjusted retail pricing for mobile carrier subsidy sheets
//!
//! This library provides:
//! - Typed ingestion of crawled carrier support tables, dealer price sheets,
//!   and the device -> product-group mapping
//! - A per-dealer rebate rule engine driven by a JSON configuration
//! - Exact-match price resolution with a mandatory-period amortization model
//!   and a floor-guaranteed margin policy
//! - Batch assembly into the final summary table plus diagnostics for every
//!   combination that could not be resolved

pub mod assembler;
pub mod output;
pub mod pricing;
pub mod rebate;
pub mod tables;

// Re-export commonly used types
pub use assembler::{Diagnostics, SummaryAssembler, SummaryReport};
pub use pricing::{PriceResolver, SummaryRow};
pub use rebate::{RebateConfig, RebateEngine, RebateStats};
pub use tables::{Carrier, PriceSheet, RateTableStore};
