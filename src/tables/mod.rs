//! Source-table storage and indexing
//!
//! `RateTableStore` holds the crawled carrier support records and the
//! device -> product-group mapping (dealer price sheets are loaded
//! separately), and pre-builds the support index once so resolution never
//! scans the full table. Misses are `None`/empty, never errors.

pub mod data;
pub mod loader;

pub use data::{
    Carrier, JoinType, PlanColumn, PlanTier, PriceSheet, PriceSheetRow, ProductGroupRow,
    SupportRecord, SupportType,
};
pub use loader::LoadError;

use log::info;
use std::collections::HashMap;

/// Canonical product family and storage for a dealer-side device name
#[derive(Debug, Clone)]
pub struct GroupEntry {
    pub product_group_nm: String,
    pub storage: String,
}

/// Read-only index over the loaded support and mapping tables
#[derive(Debug, Clone)]
pub struct RateTableStore {
    /// Support records grouped by (carrier, canonical product group)
    support_index: HashMap<(Carrier, String), Vec<SupportRecord>>,
    /// device_nm -> first-seen product group entry
    product_groups: HashMap<String, GroupEntry>,
    /// Support rows whose (device, storage) had no product-group mapping
    unindexed_support_rows: usize,
}

impl RateTableStore {
    /// Build the store from loaded tables.
    ///
    /// Duplicate device names in the mapping keep the first-seen entry; this
    /// is the documented tie-break, not an accident of iteration order.
    pub fn build(support: Vec<SupportRecord>, mappings: Vec<ProductGroupRow>) -> Self {
        let mut product_groups: HashMap<String, GroupEntry> = HashMap::new();
        // Support-side records are carrier-named, so the index key is the
        // (device, storage) pair rather than the device name alone.
        let mut group_by_device_storage: HashMap<(String, String), String> = HashMap::new();

        for row in mappings {
            group_by_device_storage
                .entry((row.device_nm.clone(), row.storage.clone()))
                .or_insert_with(|| row.product_group_nm.clone());
            product_groups.entry(row.device_nm).or_insert(GroupEntry {
                product_group_nm: row.product_group_nm,
                storage: row.storage,
            });
        }

        let mut support_index: HashMap<(Carrier, String), Vec<SupportRecord>> = HashMap::new();
        let mut unindexed = 0usize;

        for record in support {
            let key = (record.device_nm.clone(), record.storage.clone());
            match group_by_device_storage.get(&key) {
                Some(group) => support_index
                    .entry((record.carrier, group.clone()))
                    .or_default()
                    .push(record),
                None => unindexed += 1,
            }
        }

        info!(
            "rate table store: {} support groups indexed, {} support rows unmapped, {} devices mapped",
            support_index.len(),
            unindexed,
            product_groups.len()
        );

        Self {
            support_index,
            product_groups,
            unindexed_support_rows: unindexed,
        }
    }

    /// Support records for a (carrier, product group) pair; empty on miss
    pub fn support_index(&self, carrier: Carrier, product_group: &str) -> &[SupportRecord] {
        self.support_index
            .get(&(carrier, product_group.to_string()))
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Canonical product group for a dealer-side device name.
    /// Returns `None` rather than guessing when unmapped.
    pub fn product_group_of(&self, device_nm: &str) -> Option<&GroupEntry> {
        self.product_groups.get(device_nm)
    }

    /// Support rows excluded from the index for lack of a mapping
    pub fn unindexed_support_rows(&self) -> usize {
        self.unindexed_support_rows
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(carrier: Carrier, device: &str, storage: &str, fee: i64) -> SupportRecord {
        SupportRecord {
            carrier,
            manufacturer: "Apple".to_string(),
            device_nm: device.to_string(),
            storage: storage.to_string(),
            scrb_type: JoinType::NumberPort,
            rate_plan: "5GX".to_string(),
            rate_plan_month_fee: Some(100_000),
            release_price: Some(1_550_000),
            total_support_fee: fee,
        }
    }

    fn mapping(device: &str, group: &str, storage: &str) -> ProductGroupRow {
        ProductGroupRow {
            device_nm: device.to_string(),
            product_group_nm: group.to_string(),
            storage: storage.to_string(),
        }
    }

    #[test]
    fn test_index_groups_by_carrier_and_product_group() {
        let store = RateTableStore::build(
            vec![
                record(Carrier::Sk, "아이폰16 프로", "256GB", 450_000),
                record(Carrier::Sk, "IP16P-256", "256GB", 400_000),
                record(Carrier::Kt, "아이폰16 프로", "256GB", 380_000),
            ],
            vec![
                mapping("아이폰16 프로", "아이폰16 프로", "256GB"),
                mapping("IP16P-256", "아이폰16 프로", "256GB"),
            ],
        );

        assert_eq!(store.support_index(Carrier::Sk, "아이폰16 프로").len(), 2);
        assert_eq!(store.support_index(Carrier::Kt, "아이폰16 프로").len(), 1);
        assert!(store.support_index(Carrier::Lg, "아이폰16 프로").is_empty());
        assert!(store.support_index(Carrier::Sk, "갤럭시 S25").is_empty());
    }

    #[test]
    fn test_unmapped_support_rows_are_counted_not_indexed() {
        let store = RateTableStore::build(
            vec![record(Carrier::Sk, "미지기기", "128GB", 100_000)],
            vec![],
        );
        assert_eq!(store.unindexed_support_rows(), 1);
        assert!(store.support_index(Carrier::Sk, "미지기기").is_empty());
    }

    #[test]
    fn test_product_group_first_seen_wins() {
        let store = RateTableStore::build(
            vec![],
            vec![
                mapping("SM-S931N", "갤럭시 S25", "256GB"),
                mapping("SM-S931N", "갤럭시 S25 울트라", "512GB"),
            ],
        );
        let entry = store.product_group_of("SM-S931N").unwrap();
        assert_eq!(entry.product_group_nm, "갤럭시 S25");
        assert_eq!(entry.storage, "256GB");
        assert!(store.product_group_of("없는기기").is_none());
    }
}
