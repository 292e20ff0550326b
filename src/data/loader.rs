use std::fs::File;
use std::io::{ErrorKind, Read};
use std::path::Path;

use log::{debug, info, warn};

use super::model::{required_columns, CellValue, TrackTable, NUMERIC_COLUMNS, TRACK_GENRE, TRACK_ID};
use crate::config::{ParsePolicy, PipelineConfig, TextEncoding};
use crate::error::{PipelineError, Result};

// ---------------------------------------------------------------------------
// Public entry-point
// ---------------------------------------------------------------------------

/// Load the raw (uncleaned) track table from a zip archive holding one CSV.
///
/// The archive handle lives only for the duration of this call and is
/// released on every return path, including the not-found one.
pub fn load_archive(path: &Path, config: &PipelineConfig) -> Result<TrackTable> {
    let file = File::open(path).map_err(|e| match e.kind() {
        ErrorKind::NotFound => PipelineError::ResourceNotFound(path.to_path_buf()),
        _ => PipelineError::Io(e),
    })?;
    let mut archive = zip::ZipArchive::new(file)?;

    let index = locate_entry(&mut archive, config.entry.as_deref())?;
    let mut entry = archive.by_index(index)?;
    debug!(
        "Reading entry '{}' ({} bytes) from {}",
        entry.name(),
        entry.size(),
        path.display()
    );

    let mut bytes = Vec::with_capacity(preallocation(entry.size()));
    entry.read_to_end(&mut bytes)?;
    drop(entry);

    let table = parse_csv(&bytes, config.encoding, config.parse_policy)?;
    info!(
        "Loaded {} rows x {} columns from {}",
        table.len(),
        table.column_names().len(),
        path.display()
    );
    Ok(table)
}

/// Upper bound on the buffer reserved up front for an archive entry.
const MAX_PREALLOCATION: u64 = 64 * 1024 * 1024;

/// Initial buffer size for an entry. The declared size comes from the archive
/// header, so a corrupt archive can claim anything.
fn preallocation(declared: u64) -> usize {
    declared.min(MAX_PREALLOCATION) as usize
}

/// Find the data entry: the configured name, or the only file in the archive.
fn locate_entry<R: Read + std::io::Seek>(
    archive: &mut zip::ZipArchive<R>,
    wanted: Option<&str>,
) -> Result<usize> {
    let mut candidates = Vec::new();
    for i in 0..archive.len() {
        let entry = archive.by_index(i)?;
        if entry.is_dir() || entry.name().starts_with("__MACOSX/") {
            continue;
        }
        match wanted {
            Some(name) if entry.name() == name => return Ok(i),
            Some(_) => {}
            None => candidates.push((i, entry.name().to_string())),
        }
    }

    if let Some(name) = wanted {
        return Err(PipelineError::Archive(format!("no entry named '{name}'")));
    }
    match candidates.as_slice() {
        [(i, _)] => Ok(*i),
        [] => Err(PipelineError::Archive("archive contains no data file".into())),
        many => Err(PipelineError::Archive(format!(
            "archive contains {} files ({}); configure which entry to read",
            many.len(),
            many.iter().map(|(_, n)| n.as_str()).collect::<Vec<_>>().join(", ")
        ))),
    }
}

// ---------------------------------------------------------------------------
// CSV parsing
// ---------------------------------------------------------------------------

/// Decode raw bytes with the configured single-byte encoding.
pub fn decode(bytes: &[u8], encoding: TextEncoding, policy: ParsePolicy) -> Result<String> {
    match encoding {
        TextEncoding::Latin1 => Ok(bytes.iter().map(|&b| b as char).collect()),
        TextEncoding::Utf8 => match (std::str::from_utf8(bytes), policy) {
            (Ok(s), _) => Ok(s.to_string()),
            (Err(_), ParsePolicy::Lenient) => Ok(String::from_utf8_lossy(bytes).into_owned()),
            (Err(e), ParsePolicy::Strict) => Err(PipelineError::MalformedRow {
                line: 0,
                reason: format!("invalid UTF-8: {e}"),
            }),
        },
    }
}

/// Parse a CSV document with a header row into a [`TrackTable`].
///
/// A line is malformed when the CSV reader rejects it, when its field count
/// differs from the header's, or when a required numeric column holds
/// non-numeric text. Malformed lines are skipped under
/// [`ParsePolicy::Lenient`] and fail the load under [`ParsePolicy::Strict`].
/// Empty fields are kept as `Null`; removing them is the cleaner's job.
///
/// Cell types are settled per column: `track_id` and `track_genre` are
/// always text, and any other column holding a single non-numeric value is
/// read as text throughout, so `"0042"` and `"42"` stay distinct.
pub fn parse_csv(bytes: &[u8], encoding: TextEncoding, policy: ParsePolicy) -> Result<TrackTable> {
    let text = decode(bytes, encoding, policy)?;
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .from_reader(text.as_bytes());

    let headers: Vec<String> = reader
        .headers()?
        .iter()
        .enumerate()
        .map(|(i, h)| {
            if h.trim().is_empty() {
                format!("Unnamed: {i}")
            } else {
                h.trim().to_string()
            }
        })
        .collect();

    for name in required_columns() {
        if !headers.iter().any(|h| h == name) {
            return Err(PipelineError::MissingColumn(name.to_string()));
        }
    }
    let numeric_idx: Vec<usize> = NUMERIC_COLUMNS
        .iter()
        .filter_map(|name| headers.iter().position(|h| h == name))
        .collect();

    let mut records = Vec::new();
    let mut skipped = 0usize;

    for result in reader.records() {
        let outcome = match result {
            Ok(record) => {
                let line = record.position().map_or(0, |p| p.line());
                check_record(record, headers.len(), &numeric_idx)
                    .map_err(|reason| PipelineError::MalformedRow { line, reason })
            }
            Err(e) => {
                let line = e.position().map_or(0, |p| p.line());
                Err(PipelineError::MalformedRow {
                    line,
                    reason: e.to_string(),
                })
            }
        };

        match (outcome, policy) {
            (Ok(record), _) => records.push(record),
            (Err(e), ParsePolicy::Strict) => return Err(e),
            (Err(e), ParsePolicy::Lenient) => {
                debug!("Skipping {e}");
                skipped += 1;
            }
        }
    }

    if skipped > 0 {
        warn!("Skipped {skipped} malformed line(s)");
    }

    let kinds = column_kinds(&headers, &numeric_idx, &records);
    let rows = records
        .iter()
        .map(|record| {
            record
                .iter()
                .zip(&kinds)
                .map(|(field, kind)| match kind {
                    ColumnKind::Text => CellValue::text(field),
                    ColumnKind::Inferred => CellValue::parse(field),
                })
                .collect()
        })
        .collect();
    Ok(TrackTable::from_rows(headers, rows))
}

fn check_record(
    record: csv::StringRecord,
    width: usize,
    numeric_idx: &[usize],
) -> std::result::Result<csv::StringRecord, String> {
    if record.len() != width {
        return Err(format!("expected {width} fields, found {}", record.len()));
    }
    for &i in numeric_idx {
        let field = record.get(i).unwrap_or("");
        if let CellValue::String(_) | CellValue::Bool(_) = CellValue::parse(field) {
            return Err(format!("'{}' is not a number", field.trim()));
        }
    }
    Ok(record)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ColumnKind {
    /// Every present cell is a `CellValue::String`.
    Text,
    /// Each cell is typed on its own.
    Inferred,
}

fn column_kinds(
    headers: &[String],
    numeric_idx: &[usize],
    records: &[csv::StringRecord],
) -> Vec<ColumnKind> {
    headers
        .iter()
        .enumerate()
        .map(|(i, name)| {
            if name == TRACK_ID || name == TRACK_GENRE {
                ColumnKind::Text
            } else if numeric_idx.contains(&i) {
                ColumnKind::Inferred
            } else if records
                .iter()
                .any(|r| matches!(CellValue::parse(r.get(i).unwrap_or("")), CellValue::String(_)))
            {
                ColumnKind::Text
            } else {
                ColumnKind::Inferred
            }
        })
        .collect()
}
