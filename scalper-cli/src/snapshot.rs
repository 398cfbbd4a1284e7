//! CSV series snapshots.
//!
//! Header row names the series (`close`, `trend_ma`, `rsi`, ...). Each row is
//! one completed bar, oldest first. Empty cells are warm-up values and load
//! as `NaN`.

use anyhow::{bail, Context, Result};
use scalper_core::domain::{SeriesKey, SeriesSnapshot};
use std::io::Read;
use std::path::Path;

pub fn load_snapshot(path: &Path) -> Result<SeriesSnapshot> {
    let file = std::fs::File::open(path)
        .with_context(|| format!("failed to open snapshot {}", path.display()))?;
    parse_snapshot(file).with_context(|| format!("invalid snapshot {}", path.display()))
}

pub fn parse_snapshot<R: Read>(reader: R) -> Result<SeriesSnapshot> {
    let mut csv = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(reader);

    let mut keys: Vec<SeriesKey> = Vec::new();
    for name in csv.headers()?.iter() {
        let key: SeriesKey = name.parse().map_err(anyhow::Error::msg)?;
        if keys.contains(&key) {
            bail!("duplicate column '{name}'");
        }
        keys.push(key);
    }
    if keys.is_empty() {
        bail!("snapshot has no columns");
    }

    let mut columns: Vec<Vec<f64>> = vec![Vec::new(); keys.len()];
    for (row, record) in csv.records().enumerate() {
        let record = record.with_context(|| format!("bad row {}", row + 1))?;
        for (i, cell) in record.iter().enumerate() {
            let value = if cell.is_empty() {
                f64::NAN
            } else {
                cell.parse::<f64>().with_context(|| {
                    format!("row {}, column '{}': not a number: {cell}", row + 1, keys[i])
                })?
            };
            columns[i].push(value);
        }
    }

    Ok(keys
        .into_iter()
        .zip(columns)
        .fold(SeriesSnapshot::new(), |snap, (key, values)| snap.with(key, values)))
}
