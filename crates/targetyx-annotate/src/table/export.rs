//! CSV sheets for the summary, key and expression tables.

use std::fs;
use std::path::{Path, PathBuf};

use serde_json::Value;
use targetyx_common::{Result, TargetyxError};
use tracing::info;

use super::{SummaryTable, Table};

pub const SUMMARY_SHEET: &str = "summary_table";
pub const KEY_SHEET: &str = "summary_table_key";
pub const EXPRESSION_SHEET: &str = "expression_table";

const INDEX_HEADER: &str = "target";

fn export_err(e: csv::Error) -> TargetyxError {
    TargetyxError::Export(e.to_string())
}

pub fn sheet_path(output_dir: &Path, sheet: &str) -> PathBuf {
    output_dir.join(format!("{}.csv", sheet))
}

/// Strings are written bare, nested values as compact JSON, missing cells empty.
pub fn cell_text(cell: Option<&Value>) -> String {
    match cell {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
    }
}

pub fn write_sheets(output_dir: &Path, summary: &SummaryTable, expression: &Table) -> Result<()> {
    fs::create_dir_all(output_dir)?;

    write_table(&sheet_path(output_dir, SUMMARY_SHEET), &summary.table)?;
    write_table(&sheet_path(output_dir, EXPRESSION_SHEET), expression)?;

    let mut writer = csv::Writer::from_path(sheet_path(output_dir, KEY_SHEET)).map_err(export_err)?;
    writer.write_record(["column", "key"]).map_err(export_err)?;
    for row in &summary.key {
        writer
            .write_record([row.column.as_str(), row.key.as_str()])
            .map_err(export_err)?;
    }
    writer.flush()?;

    info!(dir = %output_dir.display(), rows = summary.table.index().len(), "Exported summary tables");
    Ok(())
}

fn write_table(path: &Path, table: &Table) -> Result<()> {
    let mut writer = csv::Writer::from_path(path).map_err(export_err)?;

    let mut header = vec![INDEX_HEADER.to_string()];
    header.extend(table.columns().iter().map(|c| c.name.clone()));
    writer.write_record(&header).map_err(export_err)?;

    for (row, target) in table.index().iter().enumerate() {
        let mut record = vec![target.clone()];
        record.extend(
            table
                .columns()
                .iter()
                .map(|c| cell_text(c.cells.get(row).and_then(Option::as_ref))),
        );
        writer.write_record(&record).map_err(export_err)?;
    }
    writer.flush()?;
    Ok(())
}
