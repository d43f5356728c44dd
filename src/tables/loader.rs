//! CSV loaders for the support, price, and product-group tables
//!
//! Numeric cells arrive in spreadsheet form: thousands separators, a `원`
//! suffix, blanks, or the literal string `Null`. `parse_won` normalizes all
//! of these to `Option<i64>` at the ingestion boundary.

use super::data::{Carrier, PlanColumn, PriceSheet, PriceSheetRow, ProductGroupRow, SupportRecord};
use log::warn;
use std::io;
use std::path::Path;
use thiserror::Error;

/// Ingestion failure taxonomy. The engine itself never errors; only loading
/// malformed files does.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("missing required column: {0}")]
    MissingColumn(&'static str),
}

/// Clean a spreadsheet money cell into won. Blank, `Null`, and unparseable
/// cells are `None`, never zero.
pub fn parse_won(raw: &str) -> Option<i64> {
    let cleaned: String = raw
        .trim()
        .trim_end_matches('원')
        .chars()
        .filter(|c| *c != ',')
        .collect();
    if cleaned.is_empty() || cleaned.eq_ignore_ascii_case("null") {
        return None;
    }
    cleaned.parse::<f64>().ok().map(|v| v.round() as i64)
}

/// Raw CSV row matching the crawled support sheet columns
#[derive(Debug, serde::Deserialize)]
struct SupportCsvRow {
    carrier: String,
    #[serde(default)]
    manufacturer: String,
    device_nm: String,
    #[serde(default)]
    storage: String,
    scrb_type_name: String,
    #[serde(default)]
    rate_plan: String,
    #[serde(default)]
    rate_plan_month_fee: String,
    #[serde(default)]
    release_price: String,
    #[serde(default)]
    total_support_fee: String,
}

impl SupportCsvRow {
    fn to_record(&self) -> Option<SupportRecord> {
        let carrier = self.carrier.parse().ok()?;
        let scrb_type = self.scrb_type_name.parse().ok()?;
        Some(SupportRecord {
            carrier,
            manufacturer: self.manufacturer.clone(),
            device_nm: self.device_nm.clone(),
            storage: self.storage.trim().to_string(),
            scrb_type,
            rate_plan: self.rate_plan.clone(),
            rate_plan_month_fee: parse_won(&self.rate_plan_month_fee),
            release_price: parse_won(&self.release_price),
            total_support_fee: parse_won(&self.total_support_fee).unwrap_or(0),
        })
    }
}

/// Load support records from any reader (e.g. string buffer in tests).
/// Rows with an unknown carrier or join type are skipped with a warning.
pub fn load_support_from_reader<R: io::Read>(reader: R) -> Result<Vec<SupportRecord>, LoadError> {
    let mut csv_reader = csv::Reader::from_reader(reader);
    let mut records = Vec::new();

    for result in csv_reader.deserialize() {
        let row: SupportCsvRow = result?;
        match row.to_record() {
            Some(record) => records.push(record),
            None => warn!(
                "skipping support row with unrecognized carrier/join type: {} / {}",
                row.carrier, row.scrb_type_name
            ),
        }
    }

    Ok(records)
}

/// Load support records from a CSV file
pub fn load_support_csv<P: AsRef<Path>>(path: P) -> Result<Vec<SupportRecord>, LoadError> {
    load_support_from_reader(std::fs::File::open(path)?)
}

/// Load product-group mapping rows from any reader
pub fn load_product_groups_from_reader<R: io::Read>(
    reader: R,
) -> Result<Vec<ProductGroupRow>, LoadError> {
    let mut csv_reader = csv::Reader::from_reader(reader);
    let mut rows = Vec::new();

    for result in csv_reader.deserialize() {
        let row: ProductGroupRow = result?;
        rows.push(row);
    }

    Ok(rows)
}

/// Load product-group mapping rows from a CSV file
pub fn load_product_groups_csv<P: AsRef<Path>>(path: P) -> Result<Vec<ProductGroupRow>, LoadError> {
    load_product_groups_from_reader(std::fs::File::open(path)?)
}

/// Load a per-carrier dealer price sheet.
///
/// The header row carries fixed columns (`date`, `dealer`, `device_nm`,
/// optionally `carrier`) plus one dynamic `{join}_{support}_{tier}` column
/// per plan combination. Headers that fit neither shape are ignored with a
/// warning so a new sheet column can't silently shift cell alignment.
pub fn load_price_sheet_from_reader<R: io::Read>(
    carrier: Carrier,
    reader: R,
) -> Result<PriceSheet, LoadError> {
    let mut csv_reader = csv::Reader::from_reader(reader);

    let headers = csv_reader.headers()?.clone();
    let mut date_idx = None;
    let mut dealer_idx = None;
    let mut device_idx = None;
    let mut columns = Vec::new();
    let mut column_idxs = Vec::new();

    for (idx, header) in headers.iter().enumerate() {
        match header {
            "date" => date_idx = Some(idx),
            "dealer" => dealer_idx = Some(idx),
            "device_nm" => device_idx = Some(idx),
            "carrier" => {}
            other => match PlanColumn::parse(other) {
                Some(col) => {
                    columns.push(col);
                    column_idxs.push(idx);
                }
                None => warn!("{}: ignoring unrecognized price column {:?}", carrier, other),
            },
        }
    }

    let dealer_idx = dealer_idx.ok_or(LoadError::MissingColumn("dealer"))?;
    let device_idx = device_idx.ok_or(LoadError::MissingColumn("device_nm"))?;

    let mut rows = Vec::new();
    for result in csv_reader.records() {
        let record = result?;
        let cells = column_idxs
            .iter()
            .map(|&idx| record.get(idx).and_then(parse_won))
            .collect();
        rows.push(PriceSheetRow {
            date: date_idx
                .and_then(|idx| record.get(idx))
                .unwrap_or("")
                .to_string(),
            dealer: record.get(dealer_idx).unwrap_or("").to_string(),
            device_nm: record.get(device_idx).unwrap_or("").to_string(),
            cells,
        });
    }

    Ok(PriceSheet {
        carrier,
        columns,
        rows,
    })
}

/// Load a per-carrier dealer price sheet from a CSV file
pub fn load_price_sheet_csv<P: AsRef<Path>>(
    carrier: Carrier,
    path: P,
) -> Result<PriceSheet, LoadError> {
    load_price_sheet_from_reader(carrier, std::fs::File::open(path)?)
}
