//! JSON rebate-rule configuration
//!
//! Rules are data, curated by hand per dealer. The config is loaded once and
//! immutable for the duration of a run; rule order within a dealer is
//! declaration order and every matching rule applies (additive, never
//! exclusive).

use crate::tables::data::{JoinType, SupportType};
use crate::tables::loader::LoadError;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::io;
use std::path::Path;

/// A keyword set matching device names: either the literal `"ALL"` or a
/// list of case-insensitive substrings (a list containing `"ALL"` also
/// matches everything)
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum KeywordSet {
    One(String),
    Many(Vec<String>),
}

impl KeywordSet {
    /// Does this set match the given device name?
    pub fn matches(&self, text: &str) -> bool {
        let keywords: &[String] = match self {
            KeywordSet::One(kw) => std::slice::from_ref(kw),
            KeywordSet::Many(kws) => kws,
        };
        if keywords.iter().any(|kw| kw == "ALL") {
            return true;
        }
        if text.is_empty() {
            return false;
        }
        let text_lower = text.to_lowercase();
        keywords
            .iter()
            .any(|kw| text_lower.contains(&kw.to_lowercase()))
    }
}

/// One additive rebate rule. `rebate` is in 10,000-won units; all `require_*`
/// fields and the validity window are optional gates.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RebateRule {
    /// Device-name keyword match
    #[serde(skip_serializing_if = "Option::is_none")]
    pub models: Option<KeywordSet>,

    /// Literal product-group match (either this or `models` passing counts)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub product_group_names: Option<Vec<String>>,

    /// Veto list checked against both device name and product group
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exclude_models: Option<Vec<String>>,

    /// Additional rebate in 10,000-won units
    pub rebate: i64,

    /// Human-readable justification carried into the output
    pub description: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub require_support_type: Option<SupportType>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub require_join_type: Option<JoinType>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub require_join_types: Option<Vec<JoinType>>,

    /// Exact tier literal in `{n}k` form, e.g. `"109k"`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub require_rate_plan: Option<String>,

    /// Tier floor in thousands of won
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min_rate_plan: Option<i64>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub valid_from: Option<NaiveDate>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub valid_to: Option<NaiveDate>,
}

fn default_true() -> bool {
    true
}

/// Rule set for one dealer
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DealerRuleSet {
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Dealer-wide tier floor in thousands of won
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min_rate_plan: Option<i64>,

    /// Dealer-wide support-type gate
    #[serde(skip_serializing_if = "Option::is_none")]
    pub require_support_type: Option<SupportType>,

    #[serde(default)]
    pub rules: Vec<RebateRule>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_updated: Option<String>,
}

/// One entry of the config's manual change history
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdateEntry {
    #[serde(default)]
    pub date: String,
    #[serde(default)]
    pub dealer: String,
    #[serde(default)]
    pub description: String,
}

/// Config file metadata block; informational only, never consulted by matching
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ConfigMetadata {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_updated: Option<String>,
    #[serde(default)]
    pub update_history: Vec<UpdateEntry>,
}

/// The full rebate configuration: dealer name -> rule set, plus metadata
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RebateConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<ConfigMetadata>,

    #[serde(flatten)]
    pub dealers: BTreeMap<String, DealerRuleSet>,
}

impl RebateConfig {
    /// Parse from any reader
    pub fn from_reader<R: io::Read>(reader: R) -> Result<Self, LoadError> {
        Ok(serde_json::from_reader(reader)?)
    }

    /// Parse from a JSON file
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self, LoadError> {
        Self::from_reader(std::fs::File::open(path)?)
    }

    /// Rule set for a dealer, if configured
    pub fn dealer(&self, name: &str) -> Option<&DealerRuleSet> {
        self.dealers.get(name)
    }

    /// Formatted summary of the active configuration for operator review
    pub fn summary(&self) -> String {
        let mut out = Vec::new();

        match &self.metadata {
            Some(meta) => {
                out.push("=== 리베이트 설정 현황 ===".to_string());
                out.push(format!(
                    "버전: {}",
                    meta.version.as_deref().unwrap_or("1.0.0")
                ));
                out.push(format!(
                    "최종 업데이트: {}",
                    meta.last_updated.as_deref().unwrap_or("N/A")
                ));
            }
            None => out.push("=== 리베이트 설정 현황 ===".to_string()),
        }
        out.push(String::new());

        for (dealer, config) in &self.dealers {
            let status = if config.enabled { "활성" } else { "비활성" };
            out.push(format!(
                "[{}] - {} (업데이트: {})",
                dealer,
                status,
                config.last_updated.as_deref().unwrap_or("N/A")
            ));
            if let Some(min) = config.min_rate_plan {
                out.push(format!("  최소 요금제: {}K 이상", min));
            }
            for rule in &config.rules {
                out.push(format!("  • {}: +{}만원", rule.description, rule.rebate));
            }
            out.push(String::new());
        }

        if let Some(meta) = &self.metadata {
            if !meta.update_history.is_empty() {
                out.push("최근 업데이트 기록:".to_string());
                for entry in meta.update_history.iter().rev().take(5) {
                    out.push(format!(
                        "  • {} - {}: {}",
                        entry.date, entry.dealer, entry.description
                    ));
                }
            }
        }

        out.join("\n")
    }
}
