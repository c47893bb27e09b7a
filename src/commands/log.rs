use anyhow::{anyhow, bail, Result};
use chrono::{DateTime, NaiveDateTime, TimeZone, Utc};

use crate::commands::format_hms;
use crate::db::Database;
use crate::models::{Categories, NewWorkLog};

/// Manual work-log entry: an independent, simpler path to the same record,
/// with user-entered datetimes and zero pause time.
pub fn add(
    db: &Database,
    user_email: &str,
    project: &str,
    ticket_id: &str,
    task_detail: &str,
    start: &str,
    end: &str,
    categories: &[(String, String)],
) -> Result<()> {
    let project = project.trim();
    let ticket_id = ticket_id.trim();
    let task_detail = task_detail.trim();
    if project.is_empty() || ticket_id.is_empty() || task_detail.is_empty() {
        bail!("Project, ticket and task detail are all required.");
    }

    let start_time = parse_entry_datetime(start)?;
    let end_time = parse_entry_datetime(end)?;
    if start_time >= end_time {
        bail!("Start time must be strictly before end time.");
    }

    let duration = (end_time - start_time).num_seconds();
    let categories: Categories = categories.iter().cloned().collect();
    db.insert_work_log(&NewWorkLog {
        user_email,
        project,
        ticket_id,
        task_detail,
        categories: &categories,
        start_time,
        end_time,
        total_pause_duration_seconds: 0,
        logged_duration_seconds: duration,
    })?;

    println!("Logged {} on {} ({})", format_hms(duration), ticket_id, project);
    Ok(())
}

pub fn list(db: &Database, user_email: &str) -> Result<()> {
    let logs = db.list_work_logs(user_email)?;
    if logs.is_empty() {
        println!("No work logs.");
        return Ok(());
    }

    for log in &logs {
        println!(
            "#{:<4} {:<12} {:<16} {:<10} {}",
            log.id,
            log.project,
            log.ticket_id,
            format_hms(log.logged_duration_seconds),
            log.start_time.format("%Y-%m-%d %H:%M")
        );
    }

    Ok(())
}

/// Accepts `YYYY-MM-DD HH:MM[:SS]` (taken as UTC) or RFC 3339.
fn parse_entry_datetime(raw: &str) -> Result<DateTime<Utc>> {
    let value = raw.trim();
    for format in ["%Y-%m-%d %H:%M:%S", "%Y-%m-%d %H:%M"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(value, format) {
            return Ok(Utc.from_utc_datetime(&naive));
        }
    }
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|_| anyhow!("Invalid datetime '{}'. Use 'YYYY-MM-DD HH:MM'.", value))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn setup_test_db() -> (Database, tempfile::TempDir) {
        let dir = tempdir().unwrap();
        let db = Database::open(&dir.path().join("test.db")).unwrap();
        (db, dir)
    }

    #[test]
    fn test_manual_log_computes_duration() {
        let (db, _dir) = setup_test_db();
        add(
            &db,
            "u@example.com",
            "NOC",
            "INC-1",
            "triage",
            "2025-08-18 09:00",
            "2025-08-18 10:30",
            &[],
        )
        .unwrap();

        let logs = db.list_work_logs("u@example.com").unwrap();
        assert_eq!(logs.len(), 1);
        assert_eq!(logs[0].logged_duration_seconds, 5400);
        assert_eq!(logs[0].total_pause_duration_seconds, 0);
    }

    #[test]
    fn test_start_after_end_rejected_before_write() {
        let (db, _dir) = setup_test_db();
        let result = add(
            &db,
            "u@example.com",
            "NOC",
            "INC-1",
            "triage",
            "2025-08-18 11:00",
            "2025-08-18 10:00",
            &[],
        );
        assert!(result.is_err());
        assert!(db.list_work_logs("u@example.com").unwrap().is_empty());
    }

    #[test]
    fn test_start_equal_end_rejected() {
        let (db, _dir) = setup_test_db();
        let result = add(
            &db,
            "u@example.com",
            "NOC",
            "INC-1",
            "triage",
            "2025-08-18 10:00",
            "2025-08-18 10:00",
            &[],
        );
        assert!(result.is_err());
        assert!(db.list_work_logs("u@example.com").unwrap().is_empty());
    }

    #[test]
    fn test_invalid_datetime_rejected() {
        let (db, _dir) = setup_test_db();
        let result = add(
            &db,
            "u@example.com",
            "NOC",
            "INC-1",
            "triage",
            "yesterday",
            "2025-08-18 10:00",
            &[],
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_parse_entry_datetime_formats() {
        assert_eq!(
            parse_entry_datetime("2025-08-18 09:00").unwrap().to_rfc3339(),
            "2025-08-18T09:00:00+00:00"
        );
        assert_eq!(
            parse_entry_datetime("2025-08-18 09:00:30").unwrap().to_rfc3339(),
            "2025-08-18T09:00:30+00:00"
        );
        assert!(parse_entry_datetime("2025-08-18T09:00:00Z").is_ok());
    }

    #[test]
    fn test_categories_persisted() {
        let (db, _dir) = setup_test_db();
        add(
            &db,
            "u@example.com",
            "NOC",
            "INC-1",
            "triage",
            "2025-08-18 09:00",
            "2025-08-18 09:30",
            &[("Work Type".to_string(), "Incident".to_string())],
        )
        .unwrap();
        let logs = db.list_work_logs("u@example.com").unwrap();
        assert_eq!(logs[0].categories.get("Work Type").unwrap(), "Incident");
    }
}
