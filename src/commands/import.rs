use anyhow::{bail, Context, Result};
use std::fs;
use std::io::{self, Write};
use std::path::Path;

use crate::db::Database;
use crate::import::{self, Progress, MAX_FILE_BYTES};
use crate::models::SessionStatus;

/// Reference export with the exact required header set, embedded at build
/// time (build.rs tracks the resource file).
pub const SAMPLE_CSV: &str = include_str!("../../resources/sample_import.csv");

pub fn run(db: &Database, user_email: &str, source_id: &str, path: &Path) -> Result<()> {
    check_file(path)?;

    let content = fs::read_to_string(path).context("Failed to read CSV file")?;
    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string());

    let report = import::run(db, user_email, source_id, &file_name, &content, print_progress)?;

    println!(
        "Imported {} of {} rows into upload session #{}",
        report.inserted, report.total_rows, report.session_id
    );
    if report.skipped > 0 {
        println!(
            "Rows skipped: {} (no mapping for their Assigned_Support_Organization)",
            report.skipped
        );
    }

    Ok(())
}

fn print_progress(progress: &Progress) {
    match progress.status {
        SessionStatus::Processing => {
            println!("Processed {}/{} rows...", progress.current, progress.total);
        }
        SessionStatus::Completed => {
            println!("Processed {}/{} rows.", progress.current, progress.total);
        }
        SessionStatus::Failed => {
            println!("Import failed after {} rows.", progress.current);
        }
    }
}

/// Size and extension gate, applied before reading any rows.
pub fn check_file(path: &Path) -> Result<()> {
    let is_csv = path
        .extension()
        .map(|e| e.eq_ignore_ascii_case("csv"))
        .unwrap_or(false);
    if !is_csv {
        bail!("'{}' is not a CSV file.", path.display());
    }

    let metadata = fs::metadata(path)
        .with_context(|| format!("Cannot read '{}'", path.display()))?;
    if metadata.len() > MAX_FILE_BYTES {
        bail!(
            "File is {} bytes; the limit is {} bytes (1 MB).",
            metadata.len(),
            MAX_FILE_BYTES
        );
    }

    Ok(())
}

pub fn sample(output_path: Option<&str>) -> Result<()> {
    match output_path {
        Some(path) => {
            fs::write(path, SAMPLE_CSV).context("Failed to write sample file")?;
            eprintln!("Wrote sample import file to {}", path);
        }
        None => {
            let mut stdout = io::stdout().lock();
            write!(stdout, "{}", SAMPLE_CSV)?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::csv;
    use tempfile::tempdir;

    fn setup_test_db() -> (Database, tempfile::TempDir) {
        let dir = tempdir().unwrap();
        let db = Database::open(&dir.path().join("test.db")).unwrap();
        (db, dir)
    }

    #[test]
    fn test_check_file_rejects_non_csv() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("dump.txt");
        fs::write(&path, "data").unwrap();
        assert!(check_file(&path).is_err());
    }

    #[test]
    fn test_check_file_extension_case_insensitive() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("dump.CSV");
        fs::write(&path, "data").unwrap();
        assert!(check_file(&path).is_ok());
    }

    #[test]
    fn test_check_file_rejects_oversize() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("big.csv");
        fs::write(&path, vec![b'x'; (MAX_FILE_BYTES + 1) as usize]).unwrap();
        assert!(check_file(&path).is_err());
    }

    #[test]
    fn test_check_file_missing() {
        let dir = tempdir().unwrap();
        assert!(check_file(&dir.path().join("absent.csv")).is_err());
    }

    #[test]
    fn test_sample_has_required_headers_and_rows() {
        let mut lines = SAMPLE_CSV.lines();
        let header = lines.next().unwrap();
        let headers: Vec<String> = header.split(',').map(|h| h.trim().to_string()).collect();
        assert!(csv::missing_headers(&headers).is_empty());
        assert_eq!(headers.len(), 49);

        let data: Vec<&str> = lines.filter(|l| !l.trim().is_empty()).collect();
        assert_eq!(data.len(), 2);
        for line in data {
            assert_eq!(csv::split_line(line).len(), 49);
        }
    }

    #[test]
    fn test_sample_imports_cleanly() {
        let (db, _dir) = setup_test_db();
        db.create_mapping("remedy", "Network Operations Center", "NOC")
            .unwrap();
        db.create_mapping("remedy", "Messaging Operations", "Messaging")
            .unwrap();

        let report = crate::import::run(
            &db,
            "u@example.com",
            "remedy",
            "sample_import.csv",
            SAMPLE_CSV,
            |_| {},
        )
        .unwrap();
        assert_eq!(report.total_rows, 2);
        assert_eq!(report.inserted, 2);
        assert_eq!(report.skipped, 0);

        // Second sample row carries no Closed Date
        let tickets = db.list_uploaded_tickets(10).unwrap();
        let open = tickets
            .iter()
            .find(|t| t.incident_id.as_deref() == Some("INC000000000102"))
            .unwrap();
        assert!(open.closed_date.is_none());
    }

    #[test]
    fn test_sample_written_to_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("sample.csv");
        sample(Some(path.to_str().unwrap())).unwrap();
        let content = fs::read_to_string(&path).unwrap();
        assert_eq!(content, SAMPLE_CSV);
    }

    #[test]
    fn test_run_end_to_end_from_file() {
        let (db, dir) = setup_test_db();
        db.create_mapping("remedy", "Network Operations Center", "NOC")
            .unwrap();
        let path = dir.path().join("dump.csv");
        fs::write(&path, SAMPLE_CSV).unwrap();

        run(&db, "u@example.com", "remedy", &path).unwrap();

        let sessions = db.list_upload_sessions("u@example.com").unwrap();
        assert_eq!(sessions.len(), 1);
        assert_eq!(sessions[0].file_name, "dump.csv");
        assert_eq!(sessions[0].processed_rows, 2);
        // Only the NOC row maps; the messaging row is skipped
        assert_eq!(db.count_uploaded_tickets().unwrap(), 1);
    }
}
