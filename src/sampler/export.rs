//! Merge and CSV export of sampler contents.
//!
//! # Packing
//!
//! Buffer snapshots are laid side by side in column blocks, they are not
//! aligned on time. With snapshots of `c_i` columns and `w_i` value rows the
//! packed matrix has `1 + Σw_i` rows and `Σc_i` columns. Buffer `i` owns
//! columns `[Σ_{j<i} c_j, Σ_{j<=i} c_j)`: its timestamps go on row 0, its
//! values on its own value rows, and every other cell is NaN.
//!
//! The exported table is the transpose: one row per sample slot and one
//! column per field, headed `Time,<name_1>,...`.

use crate::config::{ExportSettings, NanMarker};
use crate::error::{MonitorError, Result, ResultExt};
use crate::types::Matrix;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

/// Header of the time column
pub const TIME_COLUMN: &str = "Time";

/// Result of a successful export
#[derive(Debug, Clone, PartialEq)]
pub struct ExportSummary {
    pub path: PathBuf,
    /// Data rows written (excluding the header)
    pub rows: usize,
    /// Columns per row, time column included
    pub columns: usize,
    /// Sidecar text file, if one was written
    pub sidecar: Option<PathBuf>,
}

/// Table read back from an export
#[derive(Debug, Clone, PartialEq)]
pub struct ExportTable {
    pub header: Vec<String>,
    /// One row per sample slot
    pub rows: Matrix,
}

impl ExportTable {
    /// Column index of a header name
    pub fn column(&self, name: &str) -> Option<usize> {
        self.header.iter().position(|h| h == name)
    }

    /// Values of one column, top to bottom
    pub fn column_values(&self, name: &str) -> Option<Vec<f64>> {
        let col = self.column(name)?;
        Some(self.rows.iter_rows().map(|row| row[col]).collect())
    }
}

/// Pack field-major snapshots (`(1 + w_i) × c_i`) into one field-major
/// matrix using the column-block layout.
pub fn pack_column_blocks(snapshots: &[Matrix]) -> Matrix {
    let value_rows: usize = snapshots.iter().map(|s| s.rows().saturating_sub(1)).sum();
    let total_cols: usize = snapshots.iter().map(Matrix::cols).sum();
    let mut packed = Matrix::nan(1 + value_rows, total_cols);

    let mut col = 0;
    let mut value_row = 1;
    for snapshot in snapshots {
        if snapshot.rows() == 0 {
            continue;
        }
        packed.write_row_segment(0, col, snapshot.row(0));
        for r in 1..snapshot.rows() {
            packed.write_row_segment(value_row + r - 1, col, snapshot.row(r));
        }
        col += snapshot.cols();
        value_row += snapshot.rows() - 1;
    }
    packed
}

/// Header for a list of `(name, width)` fields. Vector fields expand to
/// `name[0]`, `name[1]`, ...
pub fn header_for<'a>(fields: impl IntoIterator<Item = (&'a str, usize)>) -> Vec<String> {
    let mut header = vec![TIME_COLUMN.to_string()];
    for (name, width) in fields {
        if width == 1 {
            header.push(name.to_string());
        } else {
            header.extend((0..width).map(|k| format!("{}[{}]", name, k)));
        }
    }
    header
}

/// Format one cell
pub fn format_value(value: f64, marker: NanMarker) -> String {
    if value.is_nan() {
        marker.as_str().to_string()
    } else {
        value.to_string()
    }
}

/// Parse one cell. Empty cells and `nan` (any case) read as NaN.
pub fn parse_value(cell: &str) -> Result<f64> {
    let cell = cell.trim();
    if cell.is_empty() || cell.eq_ignore_ascii_case("nan") {
        return Ok(f64::NAN);
    }
    cell.parse::<f64>()
        .map_err(|e| MonitorError::Serialization(format!("invalid cell {:?}: {}", cell, e)))
}

/// Write `table` (one row per sample slot) with its header. The file is
/// truncated first.
pub fn write_csv(
    path: &Path,
    header: &[String],
    table: &Matrix,
    settings: &ExportSettings,
) -> Result<ExportSummary> {
    if header.len() != table.cols() && table.rows() > 0 {
        return Err(MonitorError::ShapeMismatch {
            buffer: path.display().to_string(),
            expected: header.len(),
            actual: table.cols(),
        });
    }

    let file = File::create(path)
        .with_context(|| format!("Failed to create export file {}", path.display()))?;
    let mut writer = csv::WriterBuilder::new()
        .delimiter(settings.delimiter()?)
        .from_writer(BufWriter::new(file));

    if settings.include_header {
        writer.write_record(header)?;
    }
    for row in table.iter_rows() {
        writer.write_record(row.iter().map(|v| format_value(*v, settings.nan_marker)))?;
    }
    writer.flush()?;

    tracing::info!(
        "Exported {} rows x {} columns to {:?}",
        table.rows(),
        header.len(),
        path
    );
    Ok(ExportSummary {
        path: path.to_path_buf(),
        rows: table.rows(),
        columns: header.len(),
        sidecar: None,
    })
}

/// Read an export written with `settings` back into a table.
pub fn read_csv(path: &Path, settings: &ExportSettings) -> Result<ExportTable> {
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(settings.delimiter()?)
        .has_headers(settings.include_header)
        .from_path(path)
        .map_err(|e| {
            MonitorError::Csv(e).with_context(format!("Failed to open {}", path.display()))
        })?;

    let header: Vec<String> = if settings.include_header {
        reader.headers()?.iter().map(str::to_string).collect()
    } else {
        Vec::new()
    };

    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record?;
        let row = record.iter().map(parse_value).collect::<Result<Vec<f64>>>()?;
        rows.push(row);
    }

    let width = rows.first().map(Vec::len).unwrap_or(header.len());
    let rows = if rows.is_empty() {
        Matrix::nan(0, width)
    } else {
        Matrix::from_rows(rows).ok_or_else(|| {
            MonitorError::Serialization(format!("ragged rows in {}", path.display()))
        })?
    };
    Ok(ExportTable { header, rows })
}

/// `<path without extension><suffix>`
pub fn sidecar_path(csv_path: &Path, suffix: &str) -> PathBuf {
    let mut stem = csv_path.with_extension("").into_os_string();
    stem.push(suffix);
    PathBuf::from(stem)
}

/// Write the sidecar text verbatim next to `csv_path`
pub fn write_sidecar(csv_path: &Path, suffix: &str, text: &str) -> Result<PathBuf> {
    let path = sidecar_path(csv_path, suffix);
    let mut file = File::create(&path)
        .with_context(|| format!("Failed to create sidecar {}", path.display()))?;
    file.write_all(text.as_bytes())
        .with_context(|| format!("Failed to write sidecar {}", path.display()))?;
    tracing::debug!("Wrote sidecar {:?}", path);
    Ok(path)
}
