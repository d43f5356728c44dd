//! Core data types for the three source tables and the price-sheet schema

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Mobile carrier
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Carrier {
    #[serde(rename = "SK")]
    Sk,
    #[serde(rename = "KT")]
    Kt,
    #[serde(rename = "LG")]
    Lg,
}

impl Carrier {
    pub const ALL: [Carrier; 3] = [Carrier::Sk, Carrier::Kt, Carrier::Lg];

    pub fn as_str(&self) -> &'static str {
        match self {
            Carrier::Sk => "SK",
            Carrier::Kt => "KT",
            Carrier::Lg => "LG",
        }
    }
}

impl FromStr for Carrier {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "SK" => Ok(Carrier::Sk),
            "KT" => Ok(Carrier::Kt),
            "LG" => Ok(Carrier::Lg),
            other => Err(format!("Unknown carrier: {}", other)),
        }
    }
}

impl fmt::Display for Carrier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

/// Subscription join type (sheet token in Korean)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum JoinType {
    #[serde(rename = "신규가입")]
    NewSignup,
    #[serde(rename = "번호이동")]
    NumberPort,
    #[serde(rename = "기기변경")]
    DeviceChange,
}

impl JoinType {
    pub fn as_str(&self) -> &'static str {
        match self {
            JoinType::NewSignup => "신규가입",
            JoinType::NumberPort => "번호이동",
            JoinType::DeviceChange => "기기변경",
        }
    }
}

impl FromStr for JoinType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "신규가입" => Ok(JoinType::NewSignup),
            "번호이동" => Ok(JoinType::NumberPort),
            "기기변경" => Ok(JoinType::DeviceChange),
            other => Err(format!("Unknown join type: {}", other)),
        }
    }
}

impl fmt::Display for JoinType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

/// Discount scheme: 공시 (published device subsidy) or 선약 (fixed-term plan discount)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum SupportType {
    #[serde(rename = "공시")]
    Announce,
    #[serde(rename = "선약")]
    Choice,
}

impl SupportType {
    pub fn as_str(&self) -> &'static str {
        match self {
            SupportType::Announce => "공시",
            SupportType::Choice => "선약",
        }
    }
}

impl FromStr for SupportType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "공시" => Ok(SupportType::Announce),
            "선약" => Ok(SupportType::Choice),
            other => Err(format!("Unknown support type: {}", other)),
        }
    }
}

impl fmt::Display for SupportType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

/// Monthly plan fee tier in won, parsed from the `{n}k` sheet token.
///
/// Two legacy remaps from the source sheets are preserved: `79k` bills at
/// 89,000원 and `50k` at 59,000원.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct PlanTier(pub i64);

impl PlanTier {
    /// Parse a tier token like `109k` into a monthly fee in won
    pub fn parse_token(token: &str) -> Option<PlanTier> {
        let digits = token.strip_suffix('k')?;
        let n: i64 = digits.parse().ok()?;
        let fee = match n {
            79 => 89_000,
            50 => 59_000,
            _ => n * 1_000,
        };
        Some(PlanTier(fee))
    }

    /// Monthly fee in won
    pub fn fee(&self) -> i64 {
        self.0
    }

    /// Fee in thousands, the unit rebate rules are written in (109000 -> 109)
    pub fn as_k(&self) -> i64 {
        self.0 / 1_000
    }
}

impl fmt::Display for PlanTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}k", self.as_k())
    }
}

/// A parsed dynamic price-sheet column header: `{join}_{support}_{tier}`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PlanColumn {
    pub join_type: JoinType,
    pub support_type: SupportType,
    pub tier: PlanTier,
}

impl PlanColumn {
    /// Parse a header like `번호이동_공시_109k`. Returns `None` for fixed
    /// columns and anything that doesn't fit the grammar.
    pub fn parse(header: &str) -> Option<PlanColumn> {
        let mut parts = header.split('_');
        let join_type = parts.next()?.parse().ok()?;
        let support_type = parts.next()?.parse().ok()?;
        let tier = PlanTier::parse_token(parts.next()?)?;
        if parts.next().is_some() {
            return None;
        }
        Some(PlanColumn {
            join_type,
            support_type,
            tier,
        })
    }
}

impl fmt::Display for PlanColumn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}_{}_{}", self.join_type, self.support_type, self.tier)
    }
}

/// One row of crawled official carrier support data
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SupportRecord {
    pub carrier: Carrier,
    pub manufacturer: String,
    pub device_nm: String,
    pub storage: String,
    /// Join type the support amount is published for
    pub scrb_type: JoinType,
    /// Rate plan display name
    pub rate_plan: String,
    pub rate_plan_month_fee: Option<i64>,
    pub release_price: Option<i64>,
    pub total_support_fee: i64,
}

/// One device->product-family mapping row
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProductGroupRow {
    pub device_nm: String,
    pub product_group_nm: String,
    #[serde(default)]
    pub storage: String,
}

/// A dealer price sheet for one carrier: fixed columns plus one column per
/// (join type, support type, plan tier) combination
#[derive(Debug, Clone)]
pub struct PriceSheet {
    pub carrier: Carrier,
    pub columns: Vec<PlanColumn>,
    pub rows: Vec<PriceSheetRow>,
}

/// One sheet row: a dealer's per-device subsidy cells, aligned with
/// `PriceSheet::columns`
#[derive(Debug, Clone)]
pub struct PriceSheetRow {
    pub date: String,
    pub dealer: String,
    pub device_nm: String,
    pub cells: Vec<Option<i64>>,
}
