//! CSV ticket-import pipeline.
//!
//! Header validation happens before any write. After that, rows are parsed,
//! resolved against the configured mappings, and persisted in fixed-size
//! batches; the upload session's processed-row counter advances after each
//! batch. Rows without a matching organization mapping are skipped and
//! counted, but never fail the upload. A persistence error abandons the
//! remaining batches and marks the session failed; earlier batches stay.

use anyhow::{bail, Result};
use std::collections::HashMap;

use crate::csv;
use crate::db::Database;
use crate::models::{SessionStatus, StagedTicket, TicketRecord};

/// Uploads larger than 1 MiB are rejected before reading rows.
pub const MAX_FILE_BYTES: u64 = 1_048_576;

/// Rows persisted per bulk write.
pub const BATCH_SIZE: usize = 50;

/// Snapshot reported after each persisted batch and at finalization.
#[derive(Debug, Clone)]
pub struct Progress {
    pub current: usize,
    pub total: usize,
    pub status: SessionStatus,
}

/// Outcome of a completed import.
#[derive(Debug)]
pub struct ImportReport {
    pub session_id: i64,
    pub total_rows: usize,
    pub inserted: usize,
    pub skipped: usize,
}

/// Runs a full import of `content` against the configured mappings.
///
/// The caller has already vetted the file itself (size, extension); this
/// function owns everything from header validation to session finalization.
pub fn run<F>(
    db: &Database,
    user_email: &str,
    source_id: &str,
    file_name: &str,
    content: &str,
    mut on_progress: F,
) -> Result<ImportReport>
where
    F: FnMut(&Progress),
{
    let mut lines = content.lines();
    let header_line = loop {
        match lines.next() {
            Some(line) if !line.trim().is_empty() => break line,
            Some(_) => continue,
            None => bail!("The file is empty"),
        }
    };

    let headers: Vec<String> = header_line
        .split(',')
        .map(|h| h.trim().to_string())
        .collect();
    let missing = csv::missing_headers(&headers);
    if !missing.is_empty() {
        bail!("Missing required headers: {}", missing.join(", "));
    }
    let columns: Vec<String> = headers.iter().map(|h| csv::column_for_header(h)).collect();

    let data_lines: Vec<&str> = lines.filter(|line| !line.trim().is_empty()).collect();
    let total = data_lines.len();

    // Header validation passed: the session row is the first write.
    let session_id = db.create_upload_session(user_email, source_id, file_name, total as i64)?;

    match import_rows(
        db,
        session_id,
        source_id,
        &columns,
        &data_lines,
        &mut on_progress,
    ) {
        Ok((inserted, skipped)) => {
            db.finish_session(session_id, SessionStatus::Completed, None)?;
            on_progress(&Progress {
                current: total,
                total,
                status: SessionStatus::Completed,
            });
            tracing::info!(session_id, total, inserted, skipped, "import completed");
            Ok(ImportReport {
                session_id,
                total_rows: total,
                inserted,
                skipped,
            })
        }
        Err(err) => {
            // Best effort: the original failure is what the caller sees.
            let _ = db.finish_session(session_id, SessionStatus::Failed, Some(&err.to_string()));
            on_progress(&Progress {
                current: 0,
                total,
                status: SessionStatus::Failed,
            });
            tracing::error!(session_id, error = %err, "import failed");
            Err(err)
        }
    }
}

fn import_rows<F>(
    db: &Database,
    session_id: i64,
    source_id: &str,
    columns: &[String],
    data_lines: &[&str],
    on_progress: &mut F,
) -> Result<(usize, usize)>
where
    F: FnMut(&Progress),
{
    let mappings = db.list_mappings(Some(source_id))?;
    let by_organization: HashMap<&str, usize> = mappings
        .iter()
        .enumerate()
        .map(|(idx, m)| (m.organization_value.as_str(), idx))
        .collect();

    let master: HashMap<String, String> =
        db.master_user_mappings(source_id)?.into_iter().collect();
    let mut per_mapping: HashMap<i64, HashMap<String, String>> = HashMap::new();
    for mapping in &mappings {
        let users = db
            .list_user_mappings(mapping.id)?
            .into_iter()
            .map(|u| (u.assignee_value, u.user_email))
            .collect();
        per_mapping.insert(mapping.id, users);
    }

    let total = data_lines.len();
    let mut batch: Vec<StagedTicket> = Vec::with_capacity(BATCH_SIZE);
    let mut walked = 0usize;
    let mut inserted = 0usize;
    let mut skipped = 0usize;

    for line in data_lines {
        walked += 1;
        let fields = csv::split_line(line);
        let mut record = TicketRecord::default();
        for (idx, column) in columns.iter().enumerate() {
            let raw = fields.get(idx).map(String::as_str).unwrap_or("");
            record.set_column(column, raw);
        }

        let organization = record.assigned_support_organization.as_deref().unwrap_or("");
        let Some(&mapping_idx) = by_organization.get(organization) else {
            tracing::debug!(row = walked, organization, "no mapping match, row skipped");
            skipped += 1;
            continue;
        };
        let mapping = &mappings[mapping_idx];

        let mapped_user_email = record.assignee.as_deref().and_then(|assignee| {
            master.get(assignee).cloned().or_else(|| {
                per_mapping
                    .get(&mapping.id)
                    .and_then(|users| users.get(assignee).cloned())
            })
        });

        batch.push(StagedTicket {
            mapping_id: mapping.id,
            project: mapping.project.clone(),
            mapped_user_email,
            record,
        });

        if batch.len() == BATCH_SIZE {
            db.insert_uploaded_tickets(&batch)?;
            inserted += batch.len();
            batch.clear();
            db.set_session_progress(session_id, walked as i64)?;
            on_progress(&Progress {
                current: walked,
                total,
                status: SessionStatus::Processing,
            });
        }
    }

    if !batch.is_empty() {
        db.insert_uploaded_tickets(&batch)?;
        inserted += batch.len();
    }
    // Final counter update covers the last partial batch and any trailing
    // skipped rows: processed_rows counts every data line walked.
    db.set_session_progress(session_id, walked as i64)?;

    Ok((inserted, skipped))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::SessionStatus;
    use tempfile::tempdir;

    fn setup_test_db() -> (Database, tempfile::TempDir) {
        let dir = tempdir().unwrap();
        let db_path = dir.path().join("test.db");
        let db = Database::open(&db_path).unwrap();
        (db, dir)
    }

    fn header_line() -> String {
        csv::HEADER_COLUMNS
            .iter()
            .map(|(h, _)| *h)
            .collect::<Vec<_>>()
            .join(",")
    }

    /// Builds a data line with every field blank except the given columns.
    fn data_line(overrides: &[(&str, &str)]) -> String {
        let fields: Vec<String> = csv::HEADER_COLUMNS
            .iter()
            .map(|(_, column)| {
                overrides
                    .iter()
                    .find(|(c, _)| c == column)
                    .map(|(_, v)| {
                        if v.contains(',') || v.contains('"') {
                            format!("\"{}\"", v.replace('"', "\"\""))
                        } else {
                            (*v).to_string()
                        }
                    })
                    .unwrap_or_default()
            })
            .collect();
        fields.join(",")
    }

    #[test]
    fn test_missing_headers_abort_before_any_write() {
        let (db, _dir) = setup_test_db();
        let content = "Incident ID,Priority\nINC1,High\n";
        let err = run(&db, "u@example.com", "remedy", "bad.csv", content, |_| {})
            .unwrap_err();
        assert!(err.to_string().contains("Missing required headers"));
        assert!(err.to_string().contains("Region"));
        // Atomic at the file level: no session, no tickets
        assert!(db.list_upload_sessions("u@example.com").unwrap().is_empty());
        assert_eq!(db.count_uploaded_tickets().unwrap(), 0);
    }

    #[test]
    fn test_empty_file_is_an_error() {
        let (db, _dir) = setup_test_db();
        assert!(run(&db, "u@example.com", "remedy", "empty.csv", "", |_| {}).is_err());
        assert!(run(&db, "u@example.com", "remedy", "blank.csv", "\n\n", |_| {}).is_err());
    }

    #[test]
    fn test_three_row_scenario() {
        // Row 1 matches the only mapping, rows 2 and 3 do not; row 3 also
        // carries an empty Closed Date.
        let (db, _dir) = setup_test_db();
        db.create_mapping("remedy", "NOC India", "NOC").unwrap();

        let content = format!(
            "{}\n{}\n{}\n{}\n",
            header_line(),
            data_line(&[
                ("incident_id", "INC1"),
                ("assigned_support_organization", "NOC India"),
                ("closed_date", "08/18/2025, 07:11:50 PM"),
            ]),
            data_line(&[
                ("incident_id", "INC2"),
                ("assigned_support_organization", "Unknown Org"),
            ]),
            data_line(&[
                ("incident_id", "INC3"),
                ("assigned_support_organization", "Elsewhere"),
                ("closed_date", ""),
            ]),
        );

        let report = run(&db, "u@example.com", "remedy", "dump.csv", &content, |_| {}).unwrap();
        assert_eq!(report.total_rows, 3);
        assert_eq!(report.inserted, 1);
        assert_eq!(report.skipped, 2);

        let session = db.get_upload_session(report.session_id).unwrap().unwrap();
        assert_eq!(session.processed_rows, 3);
        assert_eq!(session.total_rows, 3);
        assert_eq!(session.status, SessionStatus::Completed);

        let tickets = db.list_uploaded_tickets(10).unwrap();
        assert_eq!(tickets.len(), 1);
        assert_eq!(tickets[0].incident_id.as_deref(), Some("INC1"));
        assert_eq!(
            tickets[0].closed_date.unwrap().to_rfc3339(),
            "2025-08-18T19:11:50+00:00"
        );
    }

    #[test]
    fn test_empty_closed_date_persists_as_null() {
        let (db, _dir) = setup_test_db();
        db.create_mapping("remedy", "NOC India", "NOC").unwrap();
        let content = format!(
            "{}\n{}\n",
            header_line(),
            data_line(&[
                ("incident_id", "INC3"),
                ("assigned_support_organization", "NOC India"),
                ("closed_date", ""),
            ]),
        );
        run(&db, "u@example.com", "remedy", "dump.csv", &content, |_| {}).unwrap();
        let tickets = db.list_uploaded_tickets(10).unwrap();
        assert_eq!(tickets.len(), 1);
        assert!(tickets[0].closed_date.is_none());
    }

    #[test]
    fn test_unmatched_rows_never_persist() {
        let (db, _dir) = setup_test_db();
        db.create_mapping("remedy", "NOC India", "NOC").unwrap();
        let content = format!(
            "{}\n{}\n",
            header_line(),
            data_line(&[
                ("incident_id", "INC9"),
                ("assigned_support_organization", "Elsewhere"),
            ]),
        );
        let report = run(&db, "u@example.com", "remedy", "dump.csv", &content, |_| {}).unwrap();
        assert_eq!(report.inserted, 0);
        assert_eq!(report.skipped, 1);
        assert_eq!(db.count_uploaded_tickets().unwrap(), 0);
        // Skips still complete the session and count as processed
        let session = db.get_upload_session(report.session_id).unwrap().unwrap();
        assert_eq!(session.status, SessionStatus::Completed);
        assert_eq!(session.processed_rows, 1);
    }

    #[test]
    fn test_quoted_fields_survive_import() {
        let (db, _dir) = setup_test_db();
        db.create_mapping("remedy", "NOC India", "NOC").unwrap();
        let content = format!(
            "{}\n{}\n",
            header_line(),
            data_line(&[
                ("incident_id", "INC1"),
                ("summary", "Router down, site \"B\" unreachable"),
                ("assigned_support_organization", "NOC India"),
            ]),
        );
        let report = run(&db, "u@example.com", "remedy", "dump.csv", &content, |_| {}).unwrap();
        assert_eq!(report.inserted, 1);
    }

    #[test]
    fn test_assignee_resolution_prefers_master() {
        let (db, _dir) = setup_test_db();
        let mapping_id = db.create_mapping("remedy", "NOC India", "NOC").unwrap();
        db.add_user_mapping(mapping_id, "rkumar", "per-mapping@example.com")
            .unwrap();
        db.add_master_user_mapping("remedy", "rkumar", "master@example.com")
            .unwrap();
        db.add_user_mapping(mapping_id, "jdoe", "jane@example.com").unwrap();

        let content = format!(
            "{}\n{}\n{}\n{}\n",
            header_line(),
            data_line(&[
                ("incident_id", "INC1"),
                ("assignee", "rkumar"),
                ("assigned_support_organization", "NOC India"),
            ]),
            data_line(&[
                ("incident_id", "INC2"),
                ("assignee", "jdoe"),
                ("assigned_support_organization", "NOC India"),
            ]),
            data_line(&[
                ("incident_id", "INC3"),
                ("assignee", "stranger"),
                ("assigned_support_organization", "NOC India"),
            ]),
        );
        run(&db, "u@example.com", "remedy", "dump.csv", &content, |_| {}).unwrap();

        let tickets = db.list_uploaded_tickets(10).unwrap();
        let by_incident = |id: &str| {
            tickets
                .iter()
                .find(|t| t.incident_id.as_deref() == Some(id))
                .unwrap()
        };
        assert_eq!(
            by_incident("INC1").mapped_user_email.as_deref(),
            Some("master@example.com")
        );
        assert_eq!(
            by_incident("INC2").mapped_user_email.as_deref(),
            Some("jane@example.com")
        );
        assert!(by_incident("INC3").mapped_user_email.is_none());
    }

    #[test]
    fn test_batched_progress_updates() {
        let (db, _dir) = setup_test_db();
        db.create_mapping("remedy", "NOC India", "NOC").unwrap();

        let mut content = header_line();
        content.push('\n');
        for i in 0..(BATCH_SIZE + 5) {
            content.push_str(&data_line(&[
                ("incident_id", &format!("INC{i}")),
                ("assigned_support_organization", "NOC India"),
            ]));
            content.push('\n');
        }

        let mut snapshots: Vec<(usize, SessionStatus)> = Vec::new();
        let report = run(&db, "u@example.com", "remedy", "big.csv", &content, |p| {
            snapshots.push((p.current, p.status));
        })
        .unwrap();

        assert_eq!(report.inserted, BATCH_SIZE + 5);
        // One batch-boundary snapshot, then the completion snapshot
        assert_eq!(
            snapshots,
            vec![
                (BATCH_SIZE, SessionStatus::Processing),
                (BATCH_SIZE + 5, SessionStatus::Completed),
            ]
        );
        let session = db.get_upload_session(report.session_id).unwrap().unwrap();
        assert_eq!(session.processed_rows, (BATCH_SIZE + 5) as i64);
    }

    #[test]
    fn test_blank_lines_are_not_rows() {
        let (db, _dir) = setup_test_db();
        db.create_mapping("remedy", "NOC India", "NOC").unwrap();
        let content = format!(
            "{}\n\n{}\n\n\n",
            header_line(),
            data_line(&[
                ("incident_id", "INC1"),
                ("assigned_support_organization", "NOC India"),
            ]),
        );
        let report = run(&db, "u@example.com", "remedy", "dump.csv", &content, |_| {}).unwrap();
        assert_eq!(report.total_rows, 1);
        let session = db.get_upload_session(report.session_id).unwrap().unwrap();
        assert_eq!(session.total_rows, 1);
        assert_eq!(session.processed_rows, 1);
    }

    #[test]
    fn test_columns_in_any_order() {
        let (db, _dir) = setup_test_db();
        db.create_mapping("remedy", "NOC India", "NOC").unwrap();
        // Reverse the column order entirely
        let headers: Vec<&str> = csv::HEADER_COLUMNS.iter().rev().map(|(h, _)| *h).collect();
        let fields: Vec<&str> = csv::HEADER_COLUMNS
            .iter()
            .rev()
            .map(|(_, c)| match *c {
                "incident_id" => "INC1",
                "assigned_support_organization" => "NOC India",
                _ => "",
            })
            .collect();
        let content = format!("{}\n{}\n", headers.join(","), fields.join(","));
        let report = run(&db, "u@example.com", "remedy", "dump.csv", &content, |_| {}).unwrap();
        assert_eq!(report.inserted, 1);
        let tickets = db.list_uploaded_tickets(1).unwrap();
        assert_eq!(tickets[0].incident_id.as_deref(), Some("INC1"));
    }
}
