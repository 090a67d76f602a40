//! CSV dataset loader.
//!
//! Reads every `.csv` file in a directory (sorted by file name) and
//! concatenates the rows. Files are expected to be UTF-8 with a header
//! row; files may have different column sets.

use std::collections::BTreeMap;
use std::io::Read;
use std::path::{Path, PathBuf};

use crate::{CrashRecord, DatasetColumns, RecordsError};

/// Loads all CSV files in `dir` into crash records.
///
/// # Errors
///
/// * [`RecordsError::MissingDirectory`] if `dir` does not exist
/// * [`RecordsError::NoCsvFiles`] if `dir` contains no `.csv` file
/// * [`RecordsError::Io`] / [`RecordsError::Csv`] if a file cannot be
///   opened or has no readable header row
pub fn load_csv_dir(dir: &Path, columns: &DatasetColumns) -> Result<Vec<CrashRecord>, RecordsError> {
    if !dir.is_dir() {
        return Err(RecordsError::MissingDirectory {
            dir: dir.display().to_string(),
        });
    }

    let files = collect_csv_files(dir)?;
    if files.is_empty() {
        return Err(RecordsError::NoCsvFiles {
            dir: dir.display().to_string(),
        });
    }

    let mut records = Vec::new();
    for path in &files {
        let file = std::fs::File::open(path).map_err(|e| RecordsError::Io {
            path: path.display().to_string(),
            source: e,
        })?;

        let before = records.len();
        parse_csv_reader(file, columns, &mut records).map_err(|e| RecordsError::Csv {
            path: path.display().to_string(),
            source: e,
        })?;
        log::info!(
            "Loaded {} records from {}",
            records.len() - before,
            path.display()
        );
    }

    log::info!(
        "Loaded {} records from {} CSV files in {}",
        records.len(),
        files.len(),
        dir.display()
    );

    Ok(records)
}

/// Parses crash records from any CSV `Read` source, appending them to
/// `out`. Returns the number of rows skipped as malformed.
///
/// # Errors
///
/// Returns a [`csv::Error`] if the header row cannot be read.
pub fn parse_csv_reader(
    reader: impl Read,
    columns: &DatasetColumns,
    out: &mut Vec<CrashRecord>,
) -> Result<u64, csv::Error> {
    let mut csv_reader = csv::ReaderBuilder::new().flexible(true).from_reader(reader);

    let headers: Vec<String> = csv_reader
        .headers()?
        .iter()
        .map(|h| h.trim().trim_start_matches('\u{feff}').to_owned())
        .collect();

    let mut skipped = 0u64;
    for result in csv_reader.records() {
        let row = match result {
            Ok(r) => r,
            Err(e) => {
                log::trace!("  skipping malformed row: {e}");
                skipped += 1;
                continue;
            }
        };

        let fields: BTreeMap<String, String> = headers
            .iter()
            .zip(row.iter())
            .map(|(header, value)| (header.clone(), value.to_owned()))
            .collect();

        out.push(CrashRecord::from_fields(fields, columns));
    }

    if skipped > 0 {
        log::warn!("Skipped {skipped} malformed CSV rows");
    }

    Ok(skipped)
}

/// Collects the `.csv` files directly inside `dir`, sorted by path.
fn collect_csv_files(dir: &Path) -> Result<Vec<PathBuf>, RecordsError> {
    let entries = std::fs::read_dir(dir).map_err(|e| RecordsError::Io {
        path: dir.display().to_string(),
        source: e,
    })?;

    let mut files = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|e| RecordsError::Io {
            path: dir.display().to_string(),
            source: e,
        })?;

        let path = entry.path();
        if path.is_file()
            && path
                .extension()
                .is_some_and(|ext| ext.eq_ignore_ascii_case("csv"))
        {
            files.push(path);
        }
    }

    files.sort();
    Ok(files)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = "\
Nom_districte,Nom_carrer,Nk_Any,Descripcio_causa_mediata,Latitud_WGS84,Longitud_WGS84
Eixample,Carrer d'Aragó,2021,Excés de velocitat,41.39,2.16
Sant Martí,Gran Via de les Corts Catalanes,,Altres,41.41,2.19
";

    #[test]
    fn parses_rows_into_records() {
        let mut records = Vec::new();
        let skipped =
            parse_csv_reader(SAMPLE.as_bytes(), &DatasetColumns::default(), &mut records).unwrap();

        assert_eq!(skipped, 0);
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].street.as_deref(), Some("Carrer d'Aragó"));
        assert_eq!(records[0].year, Some(2021));
        assert_eq!(records[1].year, None);
        assert_eq!(records[1].field("Nk_Any"), None);
        assert_eq!(records[1].cause.as_deref(), Some("Altres"));
    }

    #[test]
    fn strips_byte_order_mark_from_first_header() {
        let csv = "\u{feff}Nom_carrer,Nk_Any\nRonda de Dalt,2020\n";
        let mut records = Vec::new();
        parse_csv_reader(csv.as_bytes(), &DatasetColumns::default(), &mut records).unwrap();

        assert_eq!(records[0].street.as_deref(), Some("Ronda de Dalt"));
    }

    #[test]
    fn short_rows_leave_trailing_columns_absent() {
        let csv = "Nom_carrer,Nom_districte,Nk_Any\nCarrer Gran,Gràcia\n";
        let mut records = Vec::new();
        parse_csv_reader(csv.as_bytes(), &DatasetColumns::default(), &mut records).unwrap();

        assert_eq!(records.len(), 1);
        assert_eq!(records[0].district.as_deref(), Some("Gràcia"));
        assert_eq!(records[0].year, None);
    }

    #[test]
    fn missing_directory_is_an_error() {
        let err = load_csv_dir(
            Path::new("/nonexistent/crash_cause/data"),
            &DatasetColumns::default(),
        )
        .unwrap_err();

        assert!(matches!(err, RecordsError::MissingDirectory { .. }));
    }
}
