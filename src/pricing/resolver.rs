//! Support-record matching and derived price computation
//!
//! `resolve` is a pure function of its inputs: the same price row against
//! the same store and rule configuration always yields an identical
//! `SummaryRow`. Failure is data incompleteness, reported as a category for
//! the assembler's diagnostics, never an error.

use super::amortization;
use super::margin::margin_for;
use super::summary::{format_sheet_date, SummaryRow};
use crate::rebate::{RebateEngine, RebateOutcome, RebateRequest};
use crate::tables::data::{Carrier, PlanColumn, SupportRecord, SupportType};
use crate::tables::RateTableStore;

/// One resolvable cell of a dealer price sheet: the cross-product unit the
/// assembler feeds to the resolver, with the product-group mapping already
/// applied
#[derive(Debug, Clone, Copy)]
pub struct PriceRow<'a> {
    pub carrier: Carrier,
    pub date: &'a str,
    pub dealer: &'a str,
    pub device_nm: &'a str,
    pub product_group_nm: &'a str,
    pub storage: &'a str,
    pub column: PlanColumn,
    /// Dealer-sheet subsidy in won, before rebates
    pub dealer_subsidy: i64,
}

/// Why a price row could not be resolved
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Unresolved {
    /// No support record survived the exact-match filter
    NoSupportMatch,
    /// The matched record is missing a numeric field the math needs
    MissingFields,
}

/// A successful resolution: the output row plus the rebate evaluation that
/// produced its dealer subsidy, for the assembler's statistics
#[derive(Debug, Clone)]
pub struct Resolved {
    pub summary: SummaryRow,
    pub rebate: RebateOutcome,
}

/// Resolves price rows against the support index and rebate rules
#[derive(Debug, Clone, Copy)]
pub struct PriceResolver<'a> {
    store: &'a RateTableStore,
    rebate: &'a RebateEngine,
}

impl<'a> PriceResolver<'a> {
    pub fn new(store: &'a RateTableStore, rebate: &'a RebateEngine) -> Self {
        Self { store, rebate }
    }

    /// Resolve one price row.
    ///
    /// The filter requires exact equality on plan fee, storage, and join
    /// type. Among survivors the highest `total_support_fee` wins; ties keep
    /// the first record in input order so the choice is deterministic.
    pub fn resolve(&self, row: &PriceRow<'_>) -> Result<Resolved, Unresolved> {
        let record = self
            .find_exact_match(row)
            .ok_or(Unresolved::NoSupportMatch)?;

        let release_price = record.release_price.ok_or(Unresolved::MissingFields)?;
        let rate_plan_month_fee = record
            .rate_plan_month_fee
            .ok_or(Unresolved::MissingFields)?;

        let support_type = row.column.support_type;

        // 선약 trades the device subsidy for the plan discount; the official
        // subsidy never applies under it regardless of the crawled amount
        let total_support_fee = match support_type {
            SupportType::Choice => 0,
            SupportType::Announce => record.total_support_fee,
        };

        let full_dealer = format!("{}_{}", row.carrier, row.dealer);
        let request = RebateRequest {
            dealer: &full_dealer,
            device_nm: row.device_nm,
            product_group: Some(row.product_group_nm),
            tier_k: rate_plan_month_fee / 1_000,
            support_type,
            join_type: row.column.join_type,
            base_subsidy: row.dealer_subsidy,
        };
        let rebate = self.rebate.apply(&request);
        let dealer_subsidy = rebate.adjusted_subsidy;

        // Cost side; a negative principal means the subsidies exceeded the
        // retail price and is corrected below, not rejected
        let origin_installment_principal = release_price - (total_support_fee + dealer_subsidy);
        let origin_month_device_price = month_share(origin_installment_principal);

        let month_rate_plan_price =
            amortization::month_rate_plan_price(row.carrier, support_type, rate_plan_month_fee);
        let origin_month_price = origin_month_device_price + month_rate_plan_price;

        let margin = margin_for(origin_installment_principal);

        // Negative principal is zeroed before the margin is layered on, so
        // the floor of the final price is exactly the margin amount
        let installment_principal = origin_installment_principal.max(0) + margin.amount;
        let month_device_price = month_share(installment_principal);
        let month_price = month_device_price + month_rate_plan_price;

        let summary = SummaryRow {
            date: format_sheet_date(row.date),
            carrier: row.carrier,
            manufacturer: record.manufacturer.clone(),
            device_nm: row.device_nm.to_string(),
            product_group_nm: row.product_group_nm.to_string(),
            storage: row.storage.to_string(),
            dealer: row.dealer.to_string(),
            join_type: row.column.join_type,
            support_type,
            rate_plan: record.rate_plan.clone(),
            rate_plan_month_fee,
            retail_price: release_price,
            total_support_fee,
            dealer_subsidy,
            origin_installment_principal,
            origin_month_device_price,
            origin_month_price,
            month_rate_plan_price,
            installment_principal,
            month_device_price,
            month_price,
            margin: margin.rate,
            margin_amount: margin.amount,
        };

        Ok(Resolved { summary, rebate })
    }

    fn find_exact_match(&self, row: &PriceRow<'_>) -> Option<&'a SupportRecord> {
        let records = self.store.support_index(row.carrier, row.product_group_nm);
        let tier_fee = row.column.tier.fee();

        let mut best: Option<&SupportRecord> = None;
        for record in records {
            if record.rate_plan_month_fee != Some(tier_fee)
                || record.storage != row.storage
                || record.scrb_type != row.column.join_type
            {
                continue;
            }
            // Strictly-greater replacement: first record wins ties
            if best.map_or(true, |b| record.total_support_fee > b.total_support_fee) {
                best = Some(record);
            }
        }
        best
    }
}

/// Monthly share of a principal over the 24-month term, rounded to the won
fn month_share(principal: i64) -> i64 {
    (principal as f64 / amortization::CONTRACT_MONTHS as f64).round() as i64
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rebate::RebateConfig;
    use crate::tables::data::{JoinType, PlanTier, ProductGroupRow};
    use approx::assert_relative_eq;
    use chrono::NaiveDate;

    fn support(
        device: &str,
        storage: &str,
        scrb: JoinType,
        fee: i64,
        release: i64,
        total: i64,
    ) -> SupportRecord {
        SupportRecord {
            carrier: Carrier::Sk,
            manufacturer: "Apple".to_string(),
            device_nm: device.to_string(),
            storage: storage.to_string(),
            scrb_type: scrb,
            rate_plan: "5GX 프라임".to_string(),
            rate_plan_month_fee: Some(fee),
            release_price: Some(release),
            total_support_fee: total,
        }
    }

    fn mapping(device: &str, group: &str, storage: &str) -> ProductGroupRow {
        ProductGroupRow {
            device_nm: device.to_string(),
            product_group_nm: group.to_string(),
            storage: storage.to_string(),
        }
    }

    fn engine_with(config_json: &str) -> RebateEngine {
        RebateEngine::new(
            RebateConfig::from_reader(config_json.as_bytes()).unwrap(),
            NaiveDate::from_ymd_opt(2025, 8, 15).unwrap(),
        )
    }

    fn price_row<'a>(column: PlanColumn) -> PriceRow<'a> {
        PriceRow {
            carrier: Carrier::Sk,
            date: "20250801",
            dealer: "케이",
            device_nm: "아이폰16 프로",
            product_group_nm: "아이폰16 프로",
            storage: "256GB",
            column,
            dealer_subsidy: 500_000,
        }
    }

    fn announce_100k() -> PlanColumn {
        PlanColumn {
            join_type: JoinType::NumberPort,
            support_type: SupportType::Announce,
            tier: PlanTier(100_000),
        }
    }

    #[test]
    fn test_worked_example() {
        // 출고가 1,550,000 / 공시 450,000 / 판매가 500,000 + 7만원 리베이트
        let store = RateTableStore::build(
            vec![support(
                "아이폰16 프로",
                "256GB",
                JoinType::NumberPort,
                100_000,
                1_550_000,
                450_000,
            )],
            vec![mapping("아이폰16 프로", "아이폰16 프로", "256GB")],
        );
        let engine = engine_with(
            r#"{"케이": {"rules": [
                {"models": ["아이폰16"], "rebate": 7, "description": "IP16계열"}
            ]}}"#,
        );
        let resolver = PriceResolver::new(&store, &engine);

        let resolved = resolver.resolve(&price_row(announce_100k())).unwrap();
        let row = &resolved.summary;

        assert_eq!(row.dealer_subsidy, 570_000);
        assert_eq!(row.total_support_fee, 450_000);
        assert_eq!(row.origin_installment_principal, 530_000);
        assert_eq!(row.margin_amount, 400_000);
        assert_relative_eq!(row.margin, 400_000.0 / 530_000.0);
        assert_eq!(row.installment_principal, 930_000);
        assert_eq!(row.month_device_price, 38_750);
        // SK 공시 100k amortized plan price
        assert_eq!(row.month_rate_plan_price, 57_679);
        assert_eq!(row.month_price, 38_750 + 57_679);
        assert_eq!(row.date, "2025. 8. 01");
        assert_eq!(resolved.rebate.applied_rebate, 70_000);
    }

    #[test]
    fn test_resolution_is_idempotent() {
        let store = RateTableStore::build(
            vec![support(
                "아이폰16 프로",
                "256GB",
                JoinType::NumberPort,
                100_000,
                1_550_000,
                450_000,
            )],
            vec![mapping("아이폰16 프로", "아이폰16 프로", "256GB")],
        );
        let engine = engine_with(r#"{}"#);
        let resolver = PriceResolver::new(&store, &engine);
        let row = price_row(announce_100k());

        let first = resolver.resolve(&row).unwrap();
        let second = resolver.resolve(&row).unwrap();
        assert_eq!(first.summary.month_price, second.summary.month_price);
        assert_eq!(
            first.summary.origin_installment_principal,
            second.summary.origin_installment_principal
        );
    }

    #[test]
    fn test_exact_filter_rejects_near_misses() {
        let store = RateTableStore::build(
            vec![
                // Wrong fee
                support("아이폰16 프로", "256GB", JoinType::NumberPort, 109_000, 1_550_000, 450_000),
                // Wrong storage
                support("아이폰16 프로", "512GB", JoinType::NumberPort, 100_000, 1_550_000, 450_000),
                // Wrong join type
                support("아이폰16 프로", "256GB", JoinType::DeviceChange, 100_000, 1_550_000, 450_000),
            ],
            vec![
                mapping("아이폰16 프로", "아이폰16 프로", "256GB"),
                // Second storage variant of the same device, so the 512GB
                // record is indexed and rejected by the storage filter
                mapping("아이폰16 프로", "아이폰16 프로", "512GB"),
            ],
        );
        let engine = engine_with(r#"{}"#);
        let resolver = PriceResolver::new(&store, &engine);

        assert_eq!(
            resolver.resolve(&price_row(announce_100k())).unwrap_err(),
            Unresolved::NoSupportMatch
        );
    }

    #[test]
    fn test_highest_support_fee_wins_first_on_tie() {
        let mut older = support(
            "아이폰16 프로",
            "256GB",
            JoinType::NumberPort,
            100_000,
            1_550_000,
            450_000,
        );
        older.rate_plan = "첫번째".to_string();
        let mut tied = older.clone();
        tied.rate_plan = "두번째".to_string();
        let mut lower = older.clone();
        lower.total_support_fee = 300_000;
        lower.rate_plan = "낮은것".to_string();

        let store = RateTableStore::build(
            vec![lower, older, tied],
            vec![mapping("아이폰16 프로", "아이폰16 프로", "256GB")],
        );
        let engine = engine_with(r#"{}"#);
        let resolver = PriceResolver::new(&store, &engine);

        let resolved = resolver.resolve(&price_row(announce_100k())).unwrap();
        assert_eq!(resolved.summary.total_support_fee, 450_000);
        // First of the tied pair in input order
        assert_eq!(resolved.summary.rate_plan, "첫번째");
    }

    #[test]
    fn test_choice_zeroes_official_subsidy() {
        let store = RateTableStore::build(
            vec![support(
                "아이폰16 프로",
                "256GB",
                JoinType::NumberPort,
                100_000,
                1_550_000,
                450_000,
            )],
            vec![mapping("아이폰16 프로", "아이폰16 프로", "256GB")],
        );
        let engine = engine_with(r#"{}"#);
        let resolver = PriceResolver::new(&store, &engine);

        let mut column = announce_100k();
        column.support_type = SupportType::Choice;
        let resolved = resolver.resolve(&price_row(column)).unwrap();

        assert_eq!(resolved.summary.total_support_fee, 0);
        // Principal reflects the zeroed subsidy: 1,550,000 - 500,000
        assert_eq!(resolved.summary.origin_installment_principal, 1_050_000);
        // SK 선약: 130 days at 75,000, 600 days at 43,000*0.75
        assert_eq!(
            resolved.summary.month_rate_plan_price,
            amortization::month_rate_plan_price(Carrier::Sk, SupportType::Choice, 100_000)
        );
    }

    #[test]
    fn test_negative_principal_clamped_before_margin() {
        // Subsidies exceed retail: 800,000 - (450,000 + 500,000) = -150,000
        let store = RateTableStore::build(
            vec![support(
                "아이폰16 프로",
                "256GB",
                JoinType::NumberPort,
                100_000,
                800_000,
                450_000,
            )],
            vec![mapping("아이폰16 프로", "아이폰16 프로", "256GB")],
        );
        let engine = engine_with(r#"{}"#);
        let resolver = PriceResolver::new(&store, &engine);

        let resolved = resolver.resolve(&price_row(announce_100k())).unwrap();
        let row = &resolved.summary;

        assert_eq!(row.origin_installment_principal, -150_000);
        assert!(row.origin_month_device_price < 0);
        // Final price floors at exactly the margin amount
        assert_eq!(row.margin_amount, 400_000);
        assert_eq!(row.installment_principal, 400_000);
        assert!(row.installment_principal >= 0);
        assert!(row.month_price >= 0);
    }

    #[test]
    fn test_missing_release_price_drops_row() {
        let mut record = support(
            "아이폰16 프로",
            "256GB",
            JoinType::NumberPort,
            100_000,
            0,
            450_000,
        );
        record.release_price = None;

        let store = RateTableStore::build(
            vec![record],
            vec![mapping("아이폰16 프로", "아이폰16 프로", "256GB")],
        );
        let engine = engine_with(r#"{}"#);
        let resolver = PriceResolver::new(&store, &engine);

        assert_eq!(
            resolver.resolve(&price_row(announce_100k())).unwrap_err(),
            Unresolved::MissingFields
        );
    }
}
