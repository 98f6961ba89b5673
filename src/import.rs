//! Spreadsheet import: row records in, normalized contacts out.
//!
//! Materialization expands every row once per mapped phone column, and every
//! phone cell once per extracted candidate, so one row can yield zero, one,
//! or many contacts. Rows without a name are skipped whole; cells without a
//! valid 10-digit candidate contribute nothing. Large imports are walked in
//! fixed-size batches with a yield point between batches so the runtime
//! stays responsive.

use anyhow::{bail, Context, Result};
use std::path::Path;

use crate::cache;
use crate::config::Config;
use crate::contacts::ContactBook;
use crate::extract::extract_numbers;
use crate::models::{ColumnMapping, Contact, ElapsedDays};
use crate::report::{Event, EventReporter};
use crate::workbook::{Row, Workbook};

/// Rows traversed between cooperative yield points.
const BATCH_SIZE: usize = 500;

/// Turns header-keyed rows into the flat contact list.
///
/// Each emitted contact carries the row's name and elapsed-days value paired
/// with one extracted phone: independent contacts, not one contact with
/// multiple phones. Row order, then phone-column order, then extraction
/// order is preserved.
pub async fn materialize(
    rows: &[Row],
    mapping: &ColumnMapping,
    reporter: &dyn EventReporter,
) -> Vec<Contact> {
    let mut contacts = Vec::new();

    for (batch_start, batch) in rows.chunks(BATCH_SIZE).enumerate() {
        for row in batch {
            let name = row
                .get(&mapping.name_col)
                .map(|s| s.trim())
                .unwrap_or_default();
            if name.is_empty() {
                continue;
            }
            let days = row
                .get(&mapping.days_col)
                .map(|cell| ElapsedDays::parse(cell))
                .unwrap_or(ElapsedDays::Unknown);

            for phone_col in &mapping.phone_cols {
                let Some(cell) = row.get(phone_col) else {
                    continue;
                };
                for phone in extract_numbers(cell) {
                    contacts.push(Contact {
                        name: name.to_string(),
                        phone,
                        days,
                    });
                }
            }
        }

        let done = (batch_start * BATCH_SIZE + batch.len()).min(rows.len());
        if done < rows.len() {
            reporter.report(Event::ImportProgress {
                rows: done,
                total: rows.len(),
            });
            // Yield between batches so a huge export cannot starve the
            // scheduler or an armed timer.
            tokio::task::yield_now().await;
        }
    }

    contacts
}

/// `followup import`: decode the workbook, materialize contacts, replace the
/// cache, and print a summary. Validation failures abort before any side
/// effect.
pub async fn run_import(
    config: &Config,
    file: &Path,
    sheet: Option<&str>,
    header_row: usize,
    mapping: &ColumnMapping,
    reporter: &dyn EventReporter,
) -> Result<()> {
    let extension = file
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
        .unwrap_or_default();
    if extension != "xlsx" && extension != "xlsm" {
        bail!(
            "unsupported file type '{}' (expected .xlsx or .xlsm): {}",
            extension,
            file.display()
        );
    }
    if header_row == 0 {
        bail!("--header-row is 1-based; 0 is not a valid row");
    }
    if mapping.phone_cols.is_empty() {
        bail!("at least one --phone-col is required");
    }

    reporter.report(Event::ImportStarted {
        file: file.display().to_string(),
    });

    let workbook = Workbook::open(file)?;
    let sheet = match sheet {
        Some(name) => {
            if !workbook.sheet_names().contains(&name) {
                bail!(
                    "sheet '{}' not found (available: {})",
                    name,
                    workbook.sheet_names().join(", ")
                );
            }
            name.to_string()
        }
        None => workbook.first_sheet().to_string(),
    };

    let header_offset = header_row - 1;
    let headers = workbook.headers(&sheet, header_offset)?;
    for col in std::iter::once(&mapping.name_col)
        .chain(mapping.phone_cols.iter())
        .chain(std::iter::once(&mapping.days_col))
    {
        if !headers.contains(col) {
            bail!(
                "column '{}' not found in header row {} of sheet '{}' (headers: {})",
                col,
                header_row,
                sheet,
                headers.join(", ")
            );
        }
    }

    let rows = workbook.rows(&sheet, header_offset)?;
    let contacts = materialize(&rows, mapping, reporter).await;
    let book = ContactBook::new(contacts);

    cache::save_contacts(&config.cache.path, book.contacts())
        .context("import succeeded but the contact cache could not be written")?;

    let days: Vec<String> = book.distinct_days().iter().map(|d| d.to_string()).collect();
    println!("import {}", file.display());
    println!("  sheet: {}", sheet);
    println!("  rows scanned: {}", rows.len());
    println!("  phone columns: {}", mapping.phone_cols.len());
    println!("  contacts: {}", book.len());
    println!("  days present: {}", days.join(", "));
    println!("ok");

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::report::NullReporter;
    use std::collections::HashMap;

    fn mapping(phone_cols: &[&str]) -> ColumnMapping {
        ColumnMapping {
            name_col: "CLIENT".to_string(),
            phone_cols: phone_cols.iter().map(|s| s.to_string()).collect(),
            days_col: "DAYS".to_string(),
        }
    }

    fn row(cells: &[(&str, &str)]) -> Row {
        cells
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect::<HashMap<_, _>>()
    }

    #[tokio::test]
    async fn row_without_name_yields_nothing() {
        let rows = vec![row(&[
            ("CLIENT", ""),
            ("PHONE", "3001234567"),
            ("DAYS", "30"),
        ])];
        let contacts = materialize(&rows, &mapping(&["PHONE"]), &NullReporter).await;
        assert!(contacts.is_empty());
    }

    #[tokio::test]
    async fn two_phone_columns_yield_two_contacts() {
        let rows = vec![row(&[
            ("CLIENT", "Ana"),
            ("PHONE 1", "3001234567"),
            ("PHONE 2", "3007654321"),
            ("DAYS", "30"),
        ])];
        let contacts = materialize(&rows, &mapping(&["PHONE 1", "PHONE 2"]), &NullReporter).await;
        assert_eq!(contacts.len(), 2);
        assert_eq!(contacts[0].phone, "3001234567");
        assert_eq!(contacts[1].phone, "3007654321");
        for c in &contacts {
            assert_eq!(c.name, "Ana");
            assert_eq!(c.days, ElapsedDays::Known(30));
        }
    }

    #[tokio::test]
    async fn cell_with_two_numbers_yields_two_contacts() {
        let rows = vec![row(&[
            ("CLIENT", "Ana"),
            ("PHONE", "3001234567 y 3007654321"),
            ("DAYS", "7"),
        ])];
        let contacts = materialize(&rows, &mapping(&["PHONE"]), &NullReporter).await;
        assert_eq!(contacts.len(), 2);
    }

    #[tokio::test]
    async fn invalid_phone_cell_is_silently_skipped() {
        let rows = vec![
            row(&[("CLIENT", "Ana"), ("PHONE", "123"), ("DAYS", "30")]),
            row(&[("CLIENT", "Luis"), ("PHONE", "3007654321"), ("DAYS", "7")]),
        ];
        let contacts = materialize(&rows, &mapping(&["PHONE"]), &NullReporter).await;
        assert_eq!(contacts.len(), 1);
        assert_eq!(contacts[0].name, "Luis");
    }

    #[tokio::test]
    async fn non_numeric_days_kept_as_unknown() {
        let rows = vec![row(&[
            ("CLIENT", "Ana"),
            ("PHONE", "3001234567"),
            ("DAYS", "pending"),
        ])];
        let contacts = materialize(&rows, &mapping(&["PHONE"]), &NullReporter).await;
        assert_eq!(contacts[0].days, ElapsedDays::Unknown);
    }

    #[tokio::test]
    async fn order_is_row_then_column_then_extraction() {
        let rows = vec![
            row(&[
                ("CLIENT", "Ana"),
                ("PHONE 1", "30012345673007654321"),
                ("PHONE 2", "3110000000"),
                ("DAYS", "30"),
            ]),
            row(&[
                ("CLIENT", "Luis"),
                ("PHONE 1", "3220000000"),
                ("PHONE 2", ""),
                ("DAYS", "7"),
            ]),
        ];
        let contacts = materialize(&rows, &mapping(&["PHONE 1", "PHONE 2"]), &NullReporter).await;
        let phones: Vec<&str> = contacts.iter().map(|c| c.phone.as_str()).collect();
        assert_eq!(
            phones,
            vec!["3001234567", "3007654321", "3110000000", "3220000000"]
        );
    }
}
