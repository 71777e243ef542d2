//! CSV persistence for aggregated delay rows.

use std::fs::{self, OpenOptions};
use std::path::Path;

use anyhow::{Context, Result};
use csv::WriterBuilder;
use tracing::debug;

use crate::aggregate::types::DelayRecord;

/// Appends rows to `path`, writing the header line only when the file does
/// not exist yet or is empty. Missing parent directories are created first.
pub fn append_records(path: &Path, records: &[DelayRecord]) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create {}", parent.display()))?;
    }

    let needs_header = fs::metadata(path).map_or(true, |m| m.len() == 0);
    debug!(path = %path.display(), needs_header, rows = records.len(), "Appending CSV records");

    let file = OpenOptions::new().append(true).create(true).open(path)?;

    let mut writer = WriterBuilder::new()
        .has_headers(false) // IMPORTANT when appending
        .from_writer(file);

    if needs_header {
        writer.write_record(DelayRecord::COLUMNS)?;
    }
    for record in records {
        writer.serialize(record)?;
    }
    writer.flush()?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::env;

    fn temp_path(name: &str) -> String {
        format!("{}/{}", env::temp_dir().display(), name)
    }

    fn record(linie: i64, verspaetung: i64) -> DelayRecord {
        DelayRecord {
            linie,
            betriebsdatum: "01.01.22".to_string(),
            fahrzeug: 1234,
            soll_an_von: 100,
            verspaetung,
            halt_id_von: 987,
        }
    }

    #[test]
    fn test_append_records_creates_file_with_header() {
        let path = temp_path("vbz_delays_test_create.csv");
        let _ = fs::remove_file(&path); // clean up any prior run

        append_records(Path::new(&path), &[record(5, 7)]).unwrap();

        let content = fs::read_to_string(&path).unwrap();
        let mut lines = content.lines();
        assert_eq!(
            lines.next(),
            Some("linie,betriebsdatum,fahrzeug,soll_an_von,verspaetung,halt_id_von")
        );
        assert_eq!(lines.next(), Some("5,01.01.22,1234,100,7,987"));

        fs::remove_file(&path).unwrap();
    }

    #[test]
    fn test_append_records_writes_header_once() {
        let path = temp_path("vbz_delays_test_header.csv");
        let _ = fs::remove_file(&path);

        append_records(Path::new(&path), &[record(5, 7)]).unwrap();
        append_records(Path::new(&path), &[record(6, -2)]).unwrap();

        let content = fs::read_to_string(&path).unwrap();
        let header_count = content.lines().filter(|l| l.contains("verspaetung")).count();
        assert_eq!(header_count, 1);
        assert_eq!(content.lines().count(), 3);

        fs::remove_file(&path).unwrap();
    }

    #[test]
    fn test_append_to_empty_existing_file_writes_header() {
        let path = temp_path("vbz_delays_test_empty.csv");
        fs::write(&path, "").unwrap();

        append_records(Path::new(&path), &[record(5, 7)]).unwrap();

        let content = fs::read_to_string(&path).unwrap();
        assert!(content.starts_with("linie,"));

        fs::remove_file(&path).unwrap();
    }

    #[test]
    fn test_empty_batch_still_writes_header() {
        let path = temp_path("vbz_delays_test_no_rows.csv");
        let _ = fs::remove_file(&path);

        append_records(Path::new(&path), &[]).unwrap();

        let content = fs::read_to_string(&path).unwrap();
        assert_eq!(content.lines().count(), 1);

        fs::remove_file(&path).unwrap();
    }

    #[test]
    fn test_creates_missing_parent_directory() {
        let dir = temp_path("vbz_delays_test_parent");
        let _ = fs::remove_dir_all(&dir);
        let path = format!("{dir}/nested/out.csv");

        append_records(Path::new(&path), &[record(5, 7)]).unwrap();
        assert!(Path::new(&path).exists());

        fs::remove_dir_all(&dir).unwrap();
    }
}
