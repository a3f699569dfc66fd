//! JSON Lines journal for price points.
//!
//! Uses JSON Lines format (.jsonl) for robustness:
//! - Each line is a complete JSON object
//! - Partial file corruption only affects individual lines
//! - Can be read even if a write was interrupted
//!
//! Every append is flushed before returning, so a point acknowledged to
//! the caller is on disk.

use crate::error::StoreResult;
use skindex_core::PricePoint;
use std::fs::{File, OpenOptions};
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Journal file name inside the data directory.
pub const JOURNAL_FILE: &str = "price_points.jsonl";

/// Append-only writer for price points.
pub struct PricePointJournal {
    path: PathBuf,
    writer: BufWriter<File>,
    records_written: usize,
}

impl PricePointJournal {
    /// Open (or create) the journal in `dir` in append mode.
    pub fn open(dir: &Path) -> StoreResult<Self> {
        std::fs::create_dir_all(dir)?;
        let path = dir.join(JOURNAL_FILE);

        info!(path = %path.display(), "Opening price point journal (append mode)");

        // Append mode - never truncates existing history
        let file = OpenOptions::new().create(true).append(true).open(&path)?;

        Ok(Self {
            path,
            writer: BufWriter::new(file),
            records_written: 0,
        })
    }

    /// Append one point and flush it to disk.
    pub fn append(&mut self, point: &PricePoint) -> StoreResult<()> {
        let json = serde_json::to_string(point)?;
        writeln!(self.writer, "{json}")?;
        self.writer.flush()?;
        self.records_written += 1;

        debug!(
            index_id = %point.index_id,
            value = %point.value,
            "Journaled price point"
        );
        Ok(())
    }

    /// Read every intact point from the journal in `dir`, in file order.
    ///
    /// A missing file yields an empty history. Corrupt lines are skipped.
    pub fn replay(dir: &Path) -> StoreResult<Vec<PricePoint>> {
        let path = dir.join(JOURNAL_FILE);
        if !path.exists() {
            return Ok(Vec::new());
        }

        let reader = BufReader::new(File::open(&path)?);
        let mut points = Vec::new();
        let mut skipped = 0usize;

        for (line_no, line) in reader.lines().enumerate() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            match serde_json::from_str::<PricePoint>(&line) {
                Ok(point) => points.push(point),
                Err(e) => {
                    skipped += 1;
                    warn!(line = line_no + 1, error = %e, "Skipping corrupt journal line");
                }
            }
        }

        info!(
            path = %path.display(),
            points = points.len(),
            skipped,
            "Replayed price point journal"
        );
        Ok(points)
    }
}

impl Drop for PricePointJournal {
    fn drop(&mut self) {
        if let Err(e) = self.writer.flush() {
            warn!(?e, "Failed to flush journal on drop");
        }
        debug!(
            path = %self.path.display(),
            records = self.records_written,
            "Closed price point journal"
        );
    }
}
