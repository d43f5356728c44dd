//! Rule evaluation for per-dealer additional rebates
//!
//! The engine is a rule interpreter, not an expression evaluator: each rule
//! contributes a fixed additive amount in 10,000-won units. All matching
//! rules apply in declaration order; an empty description in the outcome is
//! the documented "no rebate applied" signal, not an error.

use super::config::{DealerRuleSet, RebateConfig, RebateRule};
use crate::tables::data::{JoinType, SupportType};
use chrono::NaiveDate;
use log::debug;
use std::collections::BTreeMap;

/// Rebate amounts at or above this are flagged for manual review
pub const HIGH_REBATE_THRESHOLD: i64 = 200_000;

/// One rebate evaluation request
#[derive(Debug, Clone, Copy)]
pub struct RebateRequest<'a> {
    /// Full dealer name as it appears on the sheet, e.g. `SK_케이`
    pub dealer: &'a str,
    pub device_nm: &'a str,
    pub product_group: Option<&'a str>,
    /// Plan tier in thousands of won (109000원 -> 109)
    pub tier_k: i64,
    pub support_type: SupportType,
    pub join_type: JoinType,
    /// Dealer-sheet subsidy before any rebate
    pub base_subsidy: i64,
}

/// Result of one rebate evaluation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RebateOutcome {
    pub adjusted_subsidy: i64,
    /// Total accumulated rebate in won; zero when nothing matched
    pub applied_rebate: i64,
    /// Joined rule descriptions; empty when nothing matched
    pub description: String,
}

impl RebateOutcome {
    fn unchanged(base_subsidy: i64) -> Self {
        Self {
            adjusted_subsidy: base_subsidy,
            applied_rebate: 0,
            description: String::new(),
        }
    }
}

/// Evaluates the loaded rule configuration against price rows
#[derive(Debug, Clone)]
pub struct RebateEngine {
    config: RebateConfig,
    /// Evaluation date for rule validity windows; passed in explicitly so
    /// runs are reproducible
    as_of: NaiveDate,
}

impl RebateEngine {
    pub fn new(config: RebateConfig, as_of: NaiveDate) -> Self {
        Self { config, as_of }
    }

    pub fn config(&self) -> &RebateConfig {
        &self.config
    }

    /// Apply every matching rule for the dealer. Unknown or disabled dealers
    /// and failed dealer-level gates return the base subsidy unchanged.
    pub fn apply(&self, req: &RebateRequest<'_>) -> RebateOutcome {
        // The sheet prefixes dealers with their carrier; rule sets are keyed
        // by the bare dealer name.
        let normalized = req
            .dealer
            .replace("SK_", "")
            .replace("KT_", "")
            .replace("LG_", "");

        let dealer_config = match self.config.dealer(&normalized) {
            Some(config) => config,
            None => return RebateOutcome::unchanged(req.base_subsidy),
        };

        if !dealer_config.enabled {
            return RebateOutcome::unchanged(req.base_subsidy);
        }

        if let Some(required) = dealer_config.require_support_type {
            if req.support_type != required {
                return RebateOutcome::unchanged(req.base_subsidy);
            }
        }

        if let Some(min) = dealer_config.min_rate_plan {
            if req.tier_k < min {
                return RebateOutcome::unchanged(req.base_subsidy);
            }
        }

        let mut total_rebate = 0i64;
        let mut applied = Vec::new();

        for rule in &dealer_config.rules {
            if !self.rule_matches(rule, req) {
                continue;
            }
            total_rebate += rule.rebate * 10_000;
            applied.push(format!("{} +{}만원", rule.description, rule.rebate));
        }

        if total_rebate == 0 {
            return RebateOutcome::unchanged(req.base_subsidy);
        }

        let description = applied.join(", ");
        debug!(
            "rebate applied: {} {} {} {}k -> +{}원 ({})",
            req.dealer, req.device_nm, req.join_type, req.tier_k, total_rebate, description
        );

        RebateOutcome {
            adjusted_subsidy: req.base_subsidy + total_rebate,
            applied_rebate: total_rebate,
            description,
        }
    }

    fn rule_matches(&self, rule: &RebateRule, req: &RebateRequest<'_>) -> bool {
        // Product match: literal product-group list or device-name keywords,
        // either passing counts
        let mut product_matched = false;
        if let (Some(groups), Some(group)) = (&rule.product_group_names, req.product_group) {
            if groups.iter().any(|g| g == group) {
                product_matched = true;
            }
        }
        if let Some(models) = &rule.models {
            if models.matches(req.device_nm) {
                product_matched = true;
            }
        }
        if !product_matched {
            return false;
        }

        // Exclusion veto, checked against both namings
        if let Some(excluded) = &rule.exclude_models {
            let hits = |text: &str| {
                let lower = text.to_lowercase();
                excluded.iter().any(|exc| lower.contains(&exc.to_lowercase()))
            };
            if !req.device_nm.is_empty() && hits(req.device_nm) {
                return false;
            }
            if req.product_group.is_some_and(hits) {
                return false;
            }
        }

        if let Some(required) = rule.require_support_type {
            if req.support_type != required {
                return false;
            }
        }
        if let Some(required) = rule.require_join_type {
            if req.join_type != required {
                return false;
            }
        }
        if let Some(required) = &rule.require_join_types {
            if !required.contains(&req.join_type) {
                return false;
            }
        }
        if let Some(required) = &rule.require_rate_plan {
            if *required != format!("{}k", req.tier_k) {
                return false;
            }
        }
        if let Some(min) = rule.min_rate_plan {
            if req.tier_k < min {
                return false;
            }
        }

        if let Some(from) = rule.valid_from {
            if self.as_of < from {
                return false;
            }
        }
        if let Some(to) = rule.valid_to {
            if self.as_of > to {
                return false;
            }
        }

        true
    }
}

/// Per-dealer / per-policy tally
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RebateTally {
    pub count: u64,
    pub total_rebate: i64,
}

/// A resolved row whose rebate exceeded [`HIGH_REBATE_THRESHOLD`]
#[derive(Debug, Clone)]
pub struct HighRebateItem {
    pub dealer: String,
    pub device_nm: String,
    pub join_type: JoinType,
    pub support_type: SupportType,
    pub tier_k: i64,
    pub rebate_amount: i64,
    pub description: String,
}

/// Accumulated rebate statistics for one run. An explicit value the
/// assembler threads through and returns, not process-global state.
#[derive(Debug, Clone, Default)]
pub struct RebateStats {
    pub total_applied: u64,
    pub total_rebate_amount: i64,
    pub by_dealer: BTreeMap<String, RebateTally>,
    pub by_description: BTreeMap<String, RebateTally>,
    pub high_rebate_items: Vec<HighRebateItem>,
}

impl RebateStats {
    /// Record one evaluation. No-op when nothing was applied.
    pub fn record(&mut self, req: &RebateRequest<'_>, outcome: &RebateOutcome) {
        if outcome.applied_rebate == 0 {
            return;
        }

        self.total_applied += 1;
        self.total_rebate_amount += outcome.applied_rebate;

        let dealer_tally = self.by_dealer.entry(req.dealer.to_string()).or_default();
        dealer_tally.count += 1;
        dealer_tally.total_rebate += outcome.applied_rebate;

        let desc_tally = self
            .by_description
            .entry(outcome.description.clone())
            .or_default();
        desc_tally.count += 1;
        desc_tally.total_rebate += outcome.applied_rebate;

        if outcome.applied_rebate >= HIGH_REBATE_THRESHOLD {
            self.high_rebate_items.push(HighRebateItem {
                dealer: req.dealer.to_string(),
                device_nm: req.device_nm.to_string(),
                join_type: req.join_type,
                support_type: req.support_type,
                tier_k: req.tier_k,
                rebate_amount: outcome.applied_rebate,
                description: outcome.description.clone(),
            });
        }
    }

    /// Merge stats from another run segment (used by the parallel driver)
    pub fn merge(&mut self, other: RebateStats) {
        self.total_applied += other.total_applied;
        self.total_rebate_amount += other.total_rebate_amount;
        for (dealer, tally) in other.by_dealer {
            let entry = self.by_dealer.entry(dealer).or_default();
            entry.count += tally.count;
            entry.total_rebate += tally.total_rebate;
        }
        for (desc, tally) in other.by_description {
            let entry = self.by_description.entry(desc).or_default();
            entry.count += tally.count;
            entry.total_rebate += tally.total_rebate;
        }
        self.high_rebate_items.extend(other.high_rebate_items);
    }
}
