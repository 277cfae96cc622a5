//! CSV archive ingestion
//!
//! Reads scraped post archives into raw rows. Acquisition of the archives
//! themselves (scraping) is an external concern; this is the one concrete
//! row source the pipeline ships.

use std::path::Path;

use crate::error::Result;
use crate::post::RawRow;

/// Read one archive file into raw rows
pub fn load_rows<P: AsRef<Path>>(path: P) -> Result<Vec<RawRow>> {
    let path = path.as_ref();
    let mut reader = csv::Reader::from_path(path)?;
    let mut rows = Vec::new();
    for record in reader.deserialize() {
        let row: RawRow = record?;
        rows.push(row);
    }
    tracing::info!("loaded {} rows from {}", rows.len(), path.display());
    Ok(rows)
}

/// Read several archive files, one row sequence per file
pub fn load_sources<P: AsRef<Path>>(paths: &[P]) -> Result<Vec<Vec<RawRow>>> {
    let mut sources = Vec::with_capacity(paths.len());
    for path in paths {
        sources.push(load_rows(path)?);
    }
    Ok(sources)
}
