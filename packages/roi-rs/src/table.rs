use crate::error::Result;
use crate::scratch::TempArtifact;
use crate::signals::RegionSignals;
use csv::{StringRecord, WriterBuilder};
use std::io::Write;
use std::path::Path;

/// Write signals as CSV: a header of region labels, then one row per time point.
pub fn write_signals<W: Write>(writer: W, signals: &RegionSignals) -> Result<()> {
    let mut wtr = WriterBuilder::new().has_headers(false).from_writer(writer);

    wtr.write_record(signals.labels().iter().map(|label| label.to_string()))?;
    for t in 0..signals.n_timepoints() {
        wtr.serialize(signals.row(t))?;
    }
    wtr.flush()?;
    Ok(())
}

/// Write a signal table to `path`.
///
/// The table is written next to its destination and renamed into place, so a
/// failed write never leaves a partial table at `path`.
pub fn write_table(path: &Path, signals: &RegionSignals) -> Result<()> {
    write_atomically(path, |file| write_signals(file, signals))
}

/// A CSV table kept as text, used when tables are combined without reparsing values.
#[derive(Debug, Clone, PartialEq)]
pub struct TableData {
    pub header: StringRecord,
    pub records: Vec<StringRecord>,
}

impl TableData {
    pub fn n_rows(&self) -> usize {
        self.records.len()
    }

    pub fn n_columns(&self) -> usize {
        self.header.len()
    }
}

pub fn read_table(path: &Path) -> Result<TableData> {
    let mut rdr = csv::Reader::from_path(path)?;
    let header = rdr.headers()?.clone();
    let records = rdr.records().collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(TableData { header, records })
}

pub fn write_table_data(path: &Path, table: &TableData) -> Result<()> {
    write_atomically(path, |file| {
        let mut wtr = WriterBuilder::new().has_headers(false).from_writer(file);
        wtr.write_record(&table.header)?;
        for record in &table.records {
            wtr.write_record(record)?;
        }
        wtr.flush()?;
        Ok(())
    })
}

fn write_atomically<F>(path: &Path, write: F) -> Result<()>
where
    F: FnOnce(std::fs::File) -> Result<()>,
{
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "table".to_string());

    let staging = TempArtifact::new(dir, &format!(".{}", file_name), ".tmp");
    let file = std::fs::File::create(staging.path())?;
    write(file)?;
    staging.persist(path)
}
