//! CSV writers for the summary table and the unmatched-combination report

use crate::assembler::Diagnostics;
use crate::pricing::summary::SummaryRow;
use crate::tables::loader::LoadError;
use std::io;
use std::path::Path;

/// Write the resolved summary rows with the 23-column header
pub fn write_summary<W: io::Write>(writer: W, rows: &[SummaryRow]) -> Result<(), LoadError> {
    let mut csv_writer = csv::Writer::from_writer(writer);
    for row in rows {
        csv_writer.serialize(row)?;
    }
    csv_writer.flush()?;
    Ok(())
}

/// Write the summary to a CSV file
pub fn write_summary_csv<P: AsRef<Path>>(path: P, rows: &[SummaryRow]) -> Result<(), LoadError> {
    write_summary(std::fs::File::create(path)?, rows)
}

/// Write the unmatched (carrier, device, support type, tier) combinations
/// with occurrence counts, highest count first, for manual follow-up
pub fn write_unmatched<W: io::Write>(
    writer: W,
    diagnostics: &Diagnostics,
) -> Result<(), LoadError> {
    let mut csv_writer = csv::Writer::from_writer(writer);
    csv_writer.write_record([
        "carrier",
        "device_nm",
        "product_group_nm",
        "support_type",
        "rate_plan",
        "count",
    ])?;

    let mut entries: Vec<_> = diagnostics.no_support_match.iter().collect();
    entries.sort_by(|a, b| b.1.cmp(a.1).then_with(|| a.0.cmp(b.0)));

    for (key, count) in entries {
        csv_writer.write_record([
            key.carrier.as_str(),
            &key.device_nm,
            &key.product_group_nm,
            key.support_type.as_str(),
            &key.tier.to_string(),
            &count.to_string(),
        ])?;
    }
    csv_writer.flush()?;
    Ok(())
}

/// Write the unmatched report to a CSV file
pub fn write_unmatched_csv<P: AsRef<Path>>(
    path: P,
    diagnostics: &Diagnostics,
) -> Result<(), LoadError> {
    write_unmatched(std::fs::File::create(path)?, diagnostics)
}
