//! Batch assembly of the summary table
//!
//! Drives the full cross-product of price-sheet rows × plan columns through
//! the resolver, collecting successes into the output table and every
//! failure into per-category diagnostics. Diagnostics are advisory: a run
//! always completes and emits whatever resolved.

use crate::pricing::resolver::{PriceResolver, PriceRow, Unresolved};
use crate::pricing::summary::SummaryRow;
use crate::rebate::{RebateEngine, RebateRequest, RebateStats};
use crate::tables::data::{Carrier, JoinType, PlanTier, PriceSheet, SupportType};
use crate::tables::RateTableStore;
use log::info;
use std::collections::{BTreeMap, BTreeSet};

/// Identity of an unresolvable (carrier, device, support type, tier)
/// combination, reported with its occurrence count for manual follow-up
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct UnmatchedKey {
    pub carrier: Carrier,
    pub device_nm: String,
    pub product_group_nm: String,
    pub support_type: SupportType,
    pub tier: PlanTier,
}

/// Per-category failure accounting for one run. BTree-ordered so reports
/// are stable across runs.
#[derive(Debug, Clone, Default)]
pub struct Diagnostics {
    /// Devices with no product-group mapping at all
    pub unmapped_devices: BTreeSet<(Carrier, String)>,
    /// Devices whose mapping exists but carries no storage
    pub missing_storage_devices: BTreeSet<(Carrier, String)>,
    /// Support-match failures with occurrence counts
    pub no_support_match: BTreeMap<UnmatchedKey, u64>,

    /// Cells with a positive subsidy in a non-신규가입 plan column
    pub cells_considered: u64,
    pub cells_resolved: u64,
    pub cells_unmapped: u64,
    pub cells_missing_storage: u64,
    pub cells_unmatched: u64,
    pub cells_missing_fields: u64,
}

impl Diagnostics {
    /// Total cells dropped across all failure categories
    pub fn dropped_cells(&self) -> u64 {
        self.cells_unmapped
            + self.cells_missing_storage
            + self.cells_unmatched
            + self.cells_missing_fields
    }

    /// Conservation check: every considered cell either resolved or was
    /// counted in exactly one failure category
    pub fn conserves(&self) -> bool {
        self.cells_considered == self.cells_resolved + self.dropped_cells()
    }

    /// Merge diagnostics from another run segment
    pub fn merge(&mut self, other: Diagnostics) {
        self.unmapped_devices.extend(other.unmapped_devices);
        self.missing_storage_devices
            .extend(other.missing_storage_devices);
        for (key, count) in other.no_support_match {
            *self.no_support_match.entry(key).or_default() += count;
        }
        self.cells_considered += other.cells_considered;
        self.cells_resolved += other.cells_resolved;
        self.cells_unmapped += other.cells_unmapped;
        self.cells_missing_storage += other.cells_missing_storage;
        self.cells_unmatched += other.cells_unmatched;
        self.cells_missing_fields += other.cells_missing_fields;
    }
}

/// The run deliverable: resolved rows plus diagnostics and rebate statistics
#[derive(Debug, Clone, Default)]
pub struct SummaryReport {
    pub rows: Vec<SummaryRow>,
    pub diagnostics: Diagnostics,
    pub rebate_stats: RebateStats,
}

impl SummaryReport {
    /// Merge another segment's report (used by the parallel driver)
    pub fn merge(&mut self, other: SummaryReport) {
        self.rows.extend(other.rows);
        self.diagnostics.merge(other.diagnostics);
        self.rebate_stats.merge(other.rebate_stats);
    }
}

/// Single-pass batch transform from price sheets to the summary report
#[derive(Debug, Clone, Copy)]
pub struct SummaryAssembler<'a> {
    store: &'a RateTableStore,
    resolver: PriceResolver<'a>,
}

impl<'a> SummaryAssembler<'a> {
    pub fn new(store: &'a RateTableStore, rebate: &'a RebateEngine) -> Self {
        Self {
            store,
            resolver: PriceResolver::new(store, rebate),
        }
    }

    /// Assemble all sheets into one report
    pub fn assemble(&self, sheets: &[PriceSheet]) -> SummaryReport {
        let mut report = SummaryReport::default();
        for sheet in sheets {
            report.merge(self.assemble_sheet(sheet));
        }
        report
    }

    /// Assemble one carrier's price sheet
    pub fn assemble_sheet(&self, sheet: &PriceSheet) -> SummaryReport {
        let mut report = SummaryReport::default();
        let diag = &mut report.diagnostics;

        for row in &sheet.rows {
            let entry = self.store.product_group_of(&row.device_nm);

            for (column, cell) in sheet.columns.iter().zip(&row.cells) {
                // Explicit business exclusion: new-signup columns are never
                // priced
                if column.join_type == JoinType::NewSignup {
                    continue;
                }
                let dealer_subsidy = match cell {
                    Some(value) if *value > 0 => *value,
                    _ => continue,
                };
                diag.cells_considered += 1;

                let entry = match entry {
                    Some(entry) => entry,
                    None => {
                        diag.cells_unmapped += 1;
                        diag.unmapped_devices
                            .insert((sheet.carrier, row.device_nm.clone()));
                        continue;
                    }
                };
                if entry.storage.trim().is_empty() {
                    diag.cells_missing_storage += 1;
                    diag.missing_storage_devices
                        .insert((sheet.carrier, row.device_nm.clone()));
                    continue;
                }

                let price_row = PriceRow {
                    carrier: sheet.carrier,
                    date: &row.date,
                    dealer: &row.dealer,
                    device_nm: &row.device_nm,
                    product_group_nm: &entry.product_group_nm,
                    storage: &entry.storage,
                    column: *column,
                    dealer_subsidy,
                };

                match self.resolver.resolve(&price_row) {
                    Ok(resolved) => {
                        diag.cells_resolved += 1;
                        let full_dealer = format!("{}_{}", sheet.carrier, row.dealer);
                        let request = RebateRequest {
                            dealer: &full_dealer,
                            device_nm: &row.device_nm,
                            product_group: Some(&entry.product_group_nm),
                            tier_k: resolved.summary.rate_plan_month_fee / 1_000,
                            support_type: column.support_type,
                            join_type: column.join_type,
                            base_subsidy: dealer_subsidy,
                        };
                        report.rebate_stats.record(&request, &resolved.rebate);
                        report.rows.push(resolved.summary);
                    }
                    Err(Unresolved::NoSupportMatch) => {
                        diag.cells_unmatched += 1;
                        let key = UnmatchedKey {
                            carrier: sheet.carrier,
                            device_nm: row.device_nm.clone(),
                            product_group_nm: entry.product_group_nm.clone(),
                            support_type: column.support_type,
                            tier: column.tier,
                        };
                        *diag.no_support_match.entry(key).or_default() += 1;
                    }
                    Err(Unresolved::MissingFields) => {
                        diag.cells_missing_fields += 1;
                    }
                }
            }
        }

        info!(
            "{}: {} cells considered, {} resolved, {} dropped",
            sheet.carrier,
            report.diagnostics.cells_considered,
            report.diagnostics.cells_resolved,
            report.diagnostics.dropped_cells()
        );

        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rebate::RebateConfig;
    use crate::tables::data::{PriceSheetRow, ProductGroupRow, SupportRecord};
    use crate::tables::loader::load_price_sheet_from_reader;
    use chrono::NaiveDate;

    fn support(device: &str, scrb: JoinType, fee: i64) -> SupportRecord {
        SupportRecord {
            carrier: Carrier::Sk,
            manufacturer: "Apple".to_string(),
            device_nm: device.to_string(),
            storage: "256GB".to_string(),
            scrb_type: scrb,
            rate_plan: "5GX".to_string(),
            rate_plan_month_fee: Some(fee),
            release_price: Some(1_550_000),
            total_support_fee: 450_000,
        }
    }

    fn mapping(device: &str, storage: &str) -> ProductGroupRow {
        ProductGroupRow {
            device_nm: device.to_string(),
            product_group_nm: device.to_string(),
            storage: storage.to_string(),
        }
    }

    fn no_rebates() -> RebateEngine {
        RebateEngine::new(
            RebateConfig::from_reader("{}".as_bytes()).unwrap(),
            NaiveDate::from_ymd_opt(2025, 8, 15).unwrap(),
        )
    }

    fn sheet(csv: &str) -> PriceSheet {
        load_price_sheet_from_reader(Carrier::Sk, csv.as_bytes()).unwrap()
    }

    #[test]
    fn test_new_signup_columns_are_skipped() {
        let store = RateTableStore::build(
            vec![support("아이폰16", JoinType::NewSignup, 100_000)],
            vec![mapping("아이폰16", "256GB")],
        );
        let engine = no_rebates();
        let assembler = SummaryAssembler::new(&store, &engine);

        let report = assembler.assemble_sheet(&sheet(
            "date,dealer,device_nm,신규가입_공시_100k\n20250801,케이,아이폰16,500000\n",
        ));

        assert!(report.rows.is_empty());
        // Skipped outright: not considered, not a drop
        assert_eq!(report.diagnostics.cells_considered, 0);
        assert!(report.diagnostics.conserves());
    }

    #[test]
    fn test_blank_and_nonpositive_cells_are_skipped() {
        let store = RateTableStore::build(
            vec![support("아이폰16", JoinType::NumberPort, 100_000)],
            vec![mapping("아이폰16", "256GB")],
        );
        let engine = no_rebates();
        let assembler = SummaryAssembler::new(&store, &engine);

        let report = assembler.assemble_sheet(&sheet(
            "date,dealer,device_nm,번호이동_공시_100k\n\
             20250801,케이,아이폰16,500000\n\
             20250801,대교,아이폰16,\n\
             20250801,민트,아이폰16,0\n\
             20250801,정글,아이폰16,-10000\n",
        ));

        assert_eq!(report.diagnostics.cells_considered, 1);
        assert_eq!(report.rows.len(), 1);
        assert_eq!(report.rows[0].dealer, "케이");
    }

    #[test]
    fn test_failure_categories_and_conservation() {
        let store = RateTableStore::build(
            vec![support("아이폰16", JoinType::NumberPort, 100_000)],
            vec![
                mapping("아이폰16", "256GB"),
                mapping("갤럭시 S25", ""), // mapped but no storage
            ],
        );
        let engine = no_rebates();
        let assembler = SummaryAssembler::new(&store, &engine);

        let report = assembler.assemble_sheet(&sheet(
            "date,dealer,device_nm,번호이동_공시_100k,번호이동_공시_109k\n\
             20250801,케이,아이폰16,500000,450000\n\
             20250801,케이,갤럭시 S25,400000,\n\
             20250801,케이,미지기기,300000,\n",
        ));

        // 아이폰16 100k resolves; 109k has no support record; the other two
        // devices fail mapping-side
        assert_eq!(report.rows.len(), 1);
        assert_eq!(report.diagnostics.cells_considered, 4);
        assert_eq!(report.diagnostics.cells_resolved, 1);
        assert_eq!(report.diagnostics.cells_unmatched, 1);
        assert_eq!(report.diagnostics.cells_missing_storage, 1);
        assert_eq!(report.diagnostics.cells_unmapped, 1);
        assert!(report.diagnostics.conserves());

        assert!(report
            .diagnostics
            .unmapped_devices
            .contains(&(Carrier::Sk, "미지기기".to_string())));
        assert!(report
            .diagnostics
            .missing_storage_devices
            .contains(&(Carrier::Sk, "갤럭시 S25".to_string())));

        let (key, count) = report.diagnostics.no_support_match.iter().next().unwrap();
        assert_eq!(key.tier, PlanTier(109_000));
        assert_eq!(*count, 1);
    }

    #[test]
    fn test_unmatched_combinations_accumulate_across_dealers() {
        let store = RateTableStore::build(vec![], vec![mapping("아이폰16", "256GB")]);
        let engine = no_rebates();
        let assembler = SummaryAssembler::new(&store, &engine);

        let report = assembler.assemble_sheet(&sheet(
            "date,dealer,device_nm,번호이동_공시_100k\n\
             20250801,케이,아이폰16,500000\n\
             20250801,대교,아이폰16,520000\n",
        ));

        assert_eq!(report.diagnostics.no_support_match.len(), 1);
        let (_, count) = report.diagnostics.no_support_match.iter().next().unwrap();
        assert_eq!(*count, 2);
        assert!(report.diagnostics.conserves());
    }

    #[test]
    fn test_rebate_stats_collected_per_run() {
        let store = RateTableStore::build(
            vec![support("아이폰16", JoinType::NumberPort, 100_000)],
            vec![mapping("아이폰16", "256GB")],
        );
        let engine = RebateEngine::new(
            RebateConfig::from_reader(
                r#"{"케이": {"rules": [
                    {"models": ["아이폰16"], "rebate": 7, "description": "IP16"}
                ]}}"#
                    .as_bytes(),
            )
            .unwrap(),
            NaiveDate::from_ymd_opt(2025, 8, 15).unwrap(),
        );
        let assembler = SummaryAssembler::new(&store, &engine);

        let report = assembler.assemble_sheet(&sheet(
            "date,dealer,device_nm,번호이동_공시_100k\n\
             20250801,케이,아이폰16,500000\n\
             20250801,무관,아이폰16,500000\n",
        ));

        assert_eq!(report.rows.len(), 2);
        assert_eq!(report.rebate_stats.total_applied, 1);
        assert_eq!(report.rebate_stats.total_rebate_amount, 70_000);
        assert_eq!(
            report.rebate_stats.by_dealer.get("SK_케이").unwrap().count,
            1
        );
        // Rebate-adjusted row carries the new subsidy, the other is untouched
        let adjusted = report.rows.iter().find(|r| r.dealer == "케이").unwrap();
        assert_eq!(adjusted.dealer_subsidy, 570_000);
        let untouched = report.rows.iter().find(|r| r.dealer == "무관").unwrap();
        assert_eq!(untouched.dealer_subsidy, 500_000);
    }
}
