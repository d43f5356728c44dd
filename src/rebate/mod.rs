//! Per-dealer rebate rules: JSON configuration and the matching engine

pub mod config;
pub mod engine;

pub use config::{DealerRuleSet, KeywordSet, RebateConfig, RebateRule};
pub use engine::{
    HighRebateItem, RebateEngine, RebateOutcome, RebateRequest, RebateStats, RebateTally,
    HIGH_REBATE_THRESHOLD,
};
