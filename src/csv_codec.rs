//! CSV export and import of the whole entry collection.
//!
//! Exported documents start with the `id,name,amount,category` header. Imports
//! locate columns by header name and always create new entries, so any `id`
//! column in the input is ignored.
//!
//! A row that cannot be turned into a valid entry is reported in
//! [`ImportReport::rejected`] and the import carries on with the next row.
//! Storage failures stop the import.
use std::io;

use serde::Serialize;

use crate::{
    error::{EntryError, Result},
    models::{self, Entry, EntryPayload, NewEntry},
    store::EntryStore,
};

pub const HEADER: [&str; 4] = ["id", "name", "amount", "category"];

#[derive(Serialize)]
struct ExportRow<'a> {
    id: i64,
    name: &'a str,
    amount: String,
    category: Option<&'a str>,
}

#[derive(Serialize, Debug, Default, PartialEq)]
pub struct ImportReport {
    pub imported: Vec<i64>,
    pub rejected: Vec<RejectedRow>,
}

#[derive(Serialize, Debug, PartialEq)]
pub struct RejectedRow {
    /// 1-based, header excluded.
    pub row: usize,
    pub reason: String,
}

/// Renders `amount` so it always reads as a decimal number (`2.0`, not `2`).
pub fn format_amount(amount: f64) -> String {
    if amount.fract() == 0.0 {
        format!("{amount:.1}")
    } else {
        amount.to_string()
    }
}

pub fn export_entries(entries: &[Entry]) -> Result<String> {
    let mut wtr = csv::WriterBuilder::new()
        .has_headers(false)
        .from_writer(Vec::new());

    wtr.write_record(HEADER)?;
    for entry in entries {
        wtr.serialize(ExportRow {
            id: entry.id,
            name: &entry.name,
            amount: format_amount(entry.amount),
            category: entry.category.as_deref(),
        })?;
    }

    let bytes = wtr
        .into_inner()
        .map_err(|err| EntryError::Csv(err.into_error().into()))?;
    String::from_utf8(bytes)
        .map_err(|err| EntryError::Csv(io::Error::new(io::ErrorKind::InvalidData, err).into()))
}

pub async fn export(store: &EntryStore) -> Result<String> {
    let entries = store.get_all().await?;
    export_entries(&entries)
}

struct Columns {
    name: usize,
    amount: usize,
    category: Option<usize>,
}

impl Columns {
    fn from_headers(headers: &csv::StringRecord) -> Result<Self> {
        let find = |column: &str| headers.iter().position(|h| h.eq_ignore_ascii_case(column));
        let missing = |column: &str| {
            EntryError::MalformedImport(format!("header is missing the '{column}' column"))
        };

        Ok(Self {
            name: find("name").ok_or_else(|| missing("name"))?,
            amount: find("amount").ok_or_else(|| missing("amount"))?,
            category: find("category"),
        })
    }

    fn payload(&self, record: &csv::StringRecord) -> Result<NewEntry> {
        let name = record.get(self.name).unwrap_or_default();
        let amount = models::parse_amount(record.get(self.amount).unwrap_or_default())?;
        let category = self.category.and_then(|idx| record.get(idx));

        EntryPayload::new(name, amount, category).validate()
    }
}

/// Reads every data row of `input`. The outer error means the document as a
/// whole is unusable; inner errors belong to single rows.
pub fn parse(input: impl io::Read) -> Result<Vec<(usize, Result<NewEntry>)>> {
    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(input);

    let headers = rdr
        .headers()
        .map_err(|err| EntryError::MalformedImport(err.to_string()))?
        .clone();
    let columns = Columns::from_headers(&headers)?;

    Ok(rdr
        .records()
        .enumerate()
        .map(|(idx, record)| {
            let row = match record {
                Ok(record) => columns.payload(&record),
                Err(err) => Err(EntryError::Csv(err)),
            };
            (idx + 1, row)
        })
        .collect())
}

pub async fn import(store: &EntryStore, input: impl io::Read) -> Result<ImportReport> {
    let mut report = ImportReport::default();

    for (row, entry) in parse(input)? {
        match entry {
            Ok(entry) => report.imported.push(store.insert(&entry).await?),
            Err(err) => {
                log::warn!("rejected import row {row}: {err}");
                report.rejected.push(RejectedRow {
                    row,
                    reason: err.to_string(),
                });
            }
        }
    }

    log::info!(
        "{} records were imported, {} rejected",
        report.imported.len(),
        report.rejected.len()
    );
    Ok(report)
}
