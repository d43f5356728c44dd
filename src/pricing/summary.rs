//! The resolved output row
//!
//! Column names and order match the original summary sheet so downstream
//! consumers (archive files, the uploaded worksheet) see an identical
//! schema.

use crate::tables::data::{Carrier, JoinType, SupportType};
use serde::{Deserialize, Serialize};

/// Korean display headers, paired 1:1 with the serialized field names below
pub const KOREAN_HEADERS: [&str; 23] = [
    "날짜",
    "통신사",
    "제조사",
    "기기명",
    "상품 그룹명",
    "저장 용량",
    "대리점명",
    "개통방식",
    "할인방식",
    "요금제명",
    "월 요금 납부액",
    "출고가",
    "총 공시지원금",
    "대리점 리베이트",
    "원가 할부원금",
    "원가 할부원금 할부금",
    "원가 월 납부액",
    "월 요금제 납부금",
    "할부원금",
    "할부원금 할부금",
    "월 납부액",
    "마진",
    "마진액",
];

/// One fully resolved (price row × plan column) combination.
/// Immutable once created; the full set is the run's deliverable.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SummaryRow {
    pub date: String,
    pub carrier: Carrier,
    pub manufacturer: String,
    pub device_nm: String,
    pub product_group_nm: String,
    pub storage: String,
    pub dealer: String,
    pub join_type: JoinType,
    pub support_type: SupportType,
    /// Rate plan display name from the support record
    pub rate_plan: String,
    pub rate_plan_month_fee: i64,
    pub retail_price: i64,
    /// Official carrier subsidy actually applied (zeroed for 선약)
    pub total_support_fee: i64,
    /// Dealer subsidy after rebate adjustment
    pub dealer_subsidy: i64,
    /// Cost-side principal; negative means the subsidies exceeded retail
    pub origin_installment_principal: i64,
    pub origin_month_device_price: i64,
    pub origin_month_price: i64,
    pub month_rate_plan_price: i64,
    /// Final principal: clamped cost principal plus margin
    pub installment_principal: i64,
    pub month_device_price: i64,
    pub month_price: i64,
    /// Effective margin rate
    pub margin: f64,
    pub margin_amount: i64,
}

/// Normalize a sheet date cell to `yyyy. m. dd` (month unpadded, day kept
/// two digits). Anything that isn't an 8-digit `yyyymmdd` passes through.
pub fn format_sheet_date(raw: &str) -> String {
    let trimmed = raw.trim();
    if trimmed.len() == 8 && trimmed.chars().all(|c| c.is_ascii_digit()) {
        let month: u32 = trimmed[4..6].parse().unwrap_or(0);
        format!("{}. {}. {}", &trimmed[..4], month, &trimmed[6..8])
    } else {
        trimmed.to_string()
    }
}
