use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, ToSql};
use std::path::Path;

use crate::csv;
use crate::models::{
    Categories, NewWorkLog, SessionStatus, StagedTicket, Timer, TicketMapping, UploadSession,
    UserMapping, WorkLog,
};

const SCHEMA_VERSION: i32 = 1;

pub struct Database {
    conn: Connection,
}

impl Database {
    pub fn open(path: &Path) -> Result<Self> {
        let conn = Connection::open(path).context("Failed to open database")?;
        let db = Database { conn };
        db.init_schema()?;
        Ok(db)
    }

    fn init_schema(&self) -> Result<()> {
        let version: i32 = self
            .conn
            .query_row(
                "SELECT COALESCE(MAX(version), 0) FROM pragma_user_version",
                [],
                |row| row.get(0),
            )
            .unwrap_or(0);

        if version < SCHEMA_VERSION {
            self.conn.execute_batch(&format!(
                r#"
                -- One row per CSV upload attempt
                CREATE TABLE IF NOT EXISTS upload_sessions (
                    id INTEGER PRIMARY KEY AUTOINCREMENT,
                    user_email TEXT NOT NULL,
                    source_id TEXT NOT NULL,
                    file_name TEXT NOT NULL,
                    total_rows INTEGER NOT NULL,
                    processed_rows INTEGER NOT NULL DEFAULT 0,
                    status TEXT NOT NULL DEFAULT 'processing',
                    error_message TEXT,
                    created_at TEXT NOT NULL
                );

                -- (source, organization) -> project bindings
                CREATE TABLE IF NOT EXISTS ticket_upload_mappings (
                    id INTEGER PRIMARY KEY AUTOINCREMENT,
                    source_id TEXT NOT NULL,
                    organization_value TEXT NOT NULL,
                    project TEXT NOT NULL,
                    created_at TEXT NOT NULL,
                    UNIQUE (source_id, organization_value)
                );

                -- Per-mapping assignee -> user email
                CREATE TABLE IF NOT EXISTS ticket_upload_user_mappings (
                    id INTEGER PRIMARY KEY AUTOINCREMENT,
                    mapping_id INTEGER NOT NULL,
                    assignee_value TEXT NOT NULL,
                    user_email TEXT NOT NULL,
                    UNIQUE (mapping_id, assignee_value),
                    FOREIGN KEY (mapping_id) REFERENCES ticket_upload_mappings(id) ON DELETE CASCADE
                );

                -- Global assignee -> user email, consulted before per-mapping rows
                CREATE TABLE IF NOT EXISTS master_user_mappings (
                    id INTEGER PRIMARY KEY AUTOINCREMENT,
                    source_id TEXT NOT NULL,
                    assignee_value TEXT NOT NULL,
                    user_email TEXT NOT NULL,
                    UNIQUE (source_id, assignee_value)
                );

                -- Imported ticket rows; only rows with a matched mapping exist here
                CREATE TABLE IF NOT EXISTS uploaded_tickets (
                    id INTEGER PRIMARY KEY AUTOINCREMENT,
                    mapping_id INTEGER NOT NULL,
                    project TEXT NOT NULL,
                    mapped_user_email TEXT,
                    incident_id TEXT,
                    priority TEXT,
                    region TEXT,
                    country TEXT,
                    city TEXT,
                    site_group TEXT,
                    site TEXT,
                    assigned_group TEXT,
                    assignee TEXT,
                    status TEXT,
                    status_reason TEXT,
                    urgency TEXT,
                    impact TEXT,
                    incident_type TEXT,
                    summary TEXT,
                    notes TEXT,
                    reported_source TEXT,
                    company TEXT,
                    organization TEXT,
                    department TEXT,
                    submitter TEXT,
                    submit_date TEXT,
                    reported_date TEXT,
                    responded_date TEXT,
                    last_resolved_date TEXT,
                    closed_date TEXT,
                    last_modified_by TEXT,
                    last_modified_date TEXT,
                    resolution TEXT,
                    resolution_category TEXT,
                    resolution_category_tier_2 TEXT,
                    resolution_category_tier_3 TEXT,
                    product_category_tier_1 TEXT,
                    product_category_tier_2 TEXT,
                    product_category_tier_3 TEXT,
                    operational_category_tier_1 TEXT,
                    operational_category_tier_2 TEXT,
                    operational_category_tier_3 TEXT,
                    assigned_support_company TEXT,
                    assigned_support_organization TEXT,
                    owner_group TEXT,
                    owner TEXT,
                    vendor_name TEXT,
                    vendor_ticket_number TEXT,
                    group_transfers REAL,
                    individual_transfers REAL,
                    reopen_count REAL,
                    mtti REAL,
                    mttr REAL,
                    created_at TEXT NOT NULL,
                    FOREIGN KEY (mapping_id) REFERENCES ticket_upload_mappings(id) ON DELETE CASCADE
                );

                -- Open (running or paused) timers
                CREATE TABLE IF NOT EXISTS timers (
                    id INTEGER PRIMARY KEY AUTOINCREMENT,
                    user_email TEXT NOT NULL,
                    project TEXT NOT NULL,
                    ticket_id TEXT NOT NULL,
                    task_detail TEXT NOT NULL,
                    categories TEXT NOT NULL DEFAULT '{{}}',
                    start_time TEXT NOT NULL,
                    is_running INTEGER NOT NULL DEFAULT 1,
                    is_paused INTEGER NOT NULL DEFAULT 0,
                    pause_start_time TEXT,
                    total_pause_duration_seconds INTEGER NOT NULL DEFAULT 0,
                    created_at TEXT NOT NULL
                );

                -- Finalized, immutable work records
                CREATE TABLE IF NOT EXISTS work_logs (
                    id INTEGER PRIMARY KEY AUTOINCREMENT,
                    user_email TEXT NOT NULL,
                    project TEXT NOT NULL,
                    ticket_id TEXT NOT NULL,
                    task_detail TEXT NOT NULL,
                    categories TEXT NOT NULL DEFAULT '{{}}',
                    start_time TEXT NOT NULL,
                    end_time TEXT NOT NULL,
                    total_pause_duration_seconds INTEGER NOT NULL DEFAULT 0,
                    logged_duration_seconds INTEGER NOT NULL DEFAULT 0,
                    created_at TEXT NOT NULL
                );

                -- Indexes
                CREATE INDEX IF NOT EXISTS idx_sessions_user ON upload_sessions(user_email);
                CREATE INDEX IF NOT EXISTS idx_mappings_source ON ticket_upload_mappings(source_id);
                CREATE INDEX IF NOT EXISTS idx_user_mappings_mapping ON ticket_upload_user_mappings(mapping_id);
                CREATE INDEX IF NOT EXISTS idx_tickets_mapping ON uploaded_tickets(mapping_id);
                CREATE INDEX IF NOT EXISTS idx_tickets_incident ON uploaded_tickets(incident_id);
                CREATE INDEX IF NOT EXISTS idx_timers_user ON timers(user_email);
                CREATE INDEX IF NOT EXISTS idx_work_logs_user ON work_logs(user_email);

                PRAGMA user_version = {SCHEMA_VERSION};
                "#
            ))?;
        }

        // Enable foreign keys
        self.conn.execute("PRAGMA foreign_keys = ON", [])?;

        Ok(())
    }

    // Timers

    pub fn create_timer(
        &self,
        user_email: &str,
        project: &str,
        ticket_id: &str,
        task_detail: &str,
        categories: &Categories,
    ) -> Result<i64> {
        let now = Utc::now().to_rfc3339();
        let categories_json = serde_json::to_string(categories)?;
        self.conn.execute(
            "INSERT INTO timers (user_email, project, ticket_id, task_detail, categories, start_time, is_running, is_paused, pause_start_time, total_pause_duration_seconds, created_at) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, 1, 0, NULL, 0, ?6)",
            params![user_email, project, ticket_id, task_detail, categories_json, now],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    pub fn get_timer(&self, id: i64) -> Result<Option<Timer>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, user_email, project, ticket_id, task_detail, categories, start_time, is_running, is_paused, pause_start_time, total_pause_duration_seconds, created_at \
             FROM timers WHERE id = ?1",
        )?;

        let timer = stmt.query_row([id], timer_from_row).ok();
        Ok(timer)
    }

    pub fn list_open_timers(&self, user_email: &str) -> Result<Vec<Timer>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, user_email, project, ticket_id, task_detail, categories, start_time, is_running, is_paused, pause_start_time, total_pause_duration_seconds, created_at \
             FROM timers WHERE user_email = ?1 ORDER BY id",
        )?;

        let timers = stmt
            .query_map([user_email], timer_from_row)?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(timers)
    }

    /// Running → paused. Returns false if the timer was not running.
    pub fn mark_timer_paused(&self, id: i64, pause_start: DateTime<Utc>) -> Result<bool> {
        let rows = self.conn.execute(
            "UPDATE timers SET is_running = 0, is_paused = 1, pause_start_time = ?1 \
             WHERE id = ?2 AND is_running = 1",
            params![pause_start.to_rfc3339(), id],
        )?;
        Ok(rows > 0)
    }

    /// Paused → running. The caller folds the closed pause interval into
    /// `total_pause_seconds` before calling.
    pub fn mark_timer_resumed(&self, id: i64, total_pause_seconds: i64) -> Result<bool> {
        let rows = self.conn.execute(
            "UPDATE timers SET is_running = 1, is_paused = 0, pause_start_time = NULL, total_pause_duration_seconds = ?1 \
             WHERE id = ?2 AND is_paused = 1",
            params![total_pause_seconds, id],
        )?;
        Ok(rows > 0)
    }

    pub fn delete_timer(&self, id: i64) -> Result<bool> {
        let rows = self.conn.execute("DELETE FROM timers WHERE id = ?1", [id])?;
        Ok(rows > 0)
    }

    // Work logs

    pub fn insert_work_log(&self, log: &NewWorkLog<'_>) -> Result<i64> {
        let now = Utc::now().to_rfc3339();
        let categories_json = serde_json::to_string(log.categories)?;
        self.conn.execute(
            "INSERT INTO work_logs (user_email, project, ticket_id, task_detail, categories, start_time, end_time, total_pause_duration_seconds, logged_duration_seconds, created_at) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
            params![
                log.user_email,
                log.project,
                log.ticket_id,
                log.task_detail,
                categories_json,
                log.start_time.to_rfc3339(),
                log.end_time.to_rfc3339(),
                log.total_pause_duration_seconds,
                log.logged_duration_seconds,
                now
            ],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    pub fn list_work_logs(&self, user_email: &str) -> Result<Vec<WorkLog>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, user_email, project, ticket_id, task_detail, categories, start_time, end_time, total_pause_duration_seconds, logged_duration_seconds, created_at \
             FROM work_logs WHERE user_email = ?1 ORDER BY start_time DESC",
        )?;

        let logs = stmt
            .query_map([user_email], |row| {
                Ok(WorkLog {
                    id: row.get(0)?,
                    user_email: row.get(1)?,
                    project: row.get(2)?,
                    ticket_id: row.get(3)?,
                    task_detail: row.get(4)?,
                    categories: parse_categories(row.get::<_, String>(5)?),
                    start_time: parse_datetime(row.get::<_, String>(6)?),
                    end_time: parse_datetime(row.get::<_, String>(7)?),
                    total_pause_duration_seconds: row.get(8)?,
                    logged_duration_seconds: row.get(9)?,
                    created_at: parse_datetime(row.get::<_, String>(10)?),
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(logs)
    }

    // Upload sessions

    pub fn create_upload_session(
        &self,
        user_email: &str,
        source_id: &str,
        file_name: &str,
        total_rows: i64,
    ) -> Result<i64> {
        let now = Utc::now().to_rfc3339();
        self.conn.execute(
            "INSERT INTO upload_sessions (user_email, source_id, file_name, total_rows, processed_rows, status, created_at) \
             VALUES (?1, ?2, ?3, ?4, 0, 'processing', ?5)",
            params![user_email, source_id, file_name, total_rows, now],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    pub fn set_session_progress(&self, id: i64, processed_rows: i64) -> Result<bool> {
        let rows = self.conn.execute(
            "UPDATE upload_sessions SET processed_rows = ?1 WHERE id = ?2",
            params![processed_rows, id],
        )?;
        Ok(rows > 0)
    }

    pub fn finish_session(
        &self,
        id: i64,
        status: SessionStatus,
        error_message: Option<&str>,
    ) -> Result<bool> {
        let rows = self.conn.execute(
            "UPDATE upload_sessions SET status = ?1, error_message = ?2 WHERE id = ?3",
            params![status.as_str(), error_message, id],
        )?;
        Ok(rows > 0)
    }

    pub fn get_upload_session(&self, id: i64) -> Result<Option<UploadSession>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, user_email, source_id, file_name, total_rows, processed_rows, status, error_message, created_at \
             FROM upload_sessions WHERE id = ?1",
        )?;

        let session = stmt.query_row([id], session_from_row).ok();
        Ok(session)
    }

    pub fn list_upload_sessions(&self, user_email: &str) -> Result<Vec<UploadSession>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, user_email, source_id, file_name, total_rows, processed_rows, status, error_message, created_at \
             FROM upload_sessions WHERE user_email = ?1 ORDER BY id DESC",
        )?;

        let sessions = stmt
            .query_map([user_email], session_from_row)?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(sessions)
    }

    pub fn delete_upload_session(&self, id: i64) -> Result<bool> {
        let rows = self
            .conn
            .execute("DELETE FROM upload_sessions WHERE id = ?1", [id])?;
        Ok(rows > 0)
    }

    // Mappings

    pub fn create_mapping(
        &self,
        source_id: &str,
        organization_value: &str,
        project: &str,
    ) -> Result<i64> {
        let now = Utc::now().to_rfc3339();
        self.conn.execute(
            "INSERT INTO ticket_upload_mappings (source_id, organization_value, project, created_at) \
             VALUES (?1, ?2, ?3, ?4)",
            params![source_id, organization_value, project, now],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    pub fn get_mapping(&self, id: i64) -> Result<Option<TicketMapping>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, source_id, organization_value, project, created_at \
             FROM ticket_upload_mappings WHERE id = ?1",
        )?;

        let mapping = stmt.query_row([id], mapping_from_row).ok();
        Ok(mapping)
    }

    pub fn list_mappings(&self, source_id: Option<&str>) -> Result<Vec<TicketMapping>> {
        let mut sql = String::from(
            "SELECT id, source_id, organization_value, project, created_at FROM ticket_upload_mappings",
        );
        let mut params_vec: Vec<Box<dyn ToSql>> = Vec::new();

        if let Some(source) = source_id {
            sql.push_str(" WHERE source_id = ?");
            params_vec.push(Box::new(source.to_string()));
        }
        sql.push_str(" ORDER BY id");

        let mut stmt = self.conn.prepare(&sql)?;
        let params_refs: Vec<&dyn ToSql> = params_vec.iter().map(|p| p.as_ref()).collect();

        let mappings = stmt
            .query_map(params_refs.as_slice(), mapping_from_row)?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(mappings)
    }

    /// Deletes a mapping; user mappings and uploaded tickets cascade.
    pub fn delete_mapping(&self, id: i64) -> Result<bool> {
        let rows = self
            .conn
            .execute("DELETE FROM ticket_upload_mappings WHERE id = ?1", [id])?;
        Ok(rows > 0)
    }

    pub fn add_user_mapping(
        &self,
        mapping_id: i64,
        assignee_value: &str,
        user_email: &str,
    ) -> Result<bool> {
        let result = self.conn.execute(
            "INSERT OR IGNORE INTO ticket_upload_user_mappings (mapping_id, assignee_value, user_email) \
             VALUES (?1, ?2, ?3)",
            params![mapping_id, assignee_value, user_email],
        )?;
        Ok(result > 0)
    }

    pub fn list_user_mappings(&self, mapping_id: i64) -> Result<Vec<UserMapping>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, mapping_id, assignee_value, user_email \
             FROM ticket_upload_user_mappings WHERE mapping_id = ?1 ORDER BY assignee_value",
        )?;

        let mappings = stmt
            .query_map([mapping_id], |row| {
                Ok(UserMapping {
                    id: row.get(0)?,
                    mapping_id: row.get(1)?,
                    assignee_value: row.get(2)?,
                    user_email: row.get(3)?,
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(mappings)
    }

    pub fn add_master_user_mapping(
        &self,
        source_id: &str,
        assignee_value: &str,
        user_email: &str,
    ) -> Result<bool> {
        let result = self.conn.execute(
            "INSERT OR IGNORE INTO master_user_mappings (source_id, assignee_value, user_email) \
             VALUES (?1, ?2, ?3)",
            params![source_id, assignee_value, user_email],
        )?;
        Ok(result > 0)
    }

    /// Global (assignee value, user email) pairs for one source.
    pub fn master_user_mappings(&self, source_id: &str) -> Result<Vec<(String, String)>> {
        let mut stmt = self.conn.prepare(
            "SELECT assignee_value, user_email FROM master_user_mappings WHERE source_id = ?1",
        )?;

        let pairs = stmt
            .query_map([source_id], |row| Ok((row.get(0)?, row.get(1)?)))?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(pairs)
    }

    // Uploaded tickets

    /// Persists one batch inside a single transaction.
    pub fn insert_uploaded_tickets(&self, batch: &[StagedTicket]) -> Result<()> {
        let now = Utc::now().to_rfc3339();
        let tx = self.conn.unchecked_transaction()?;
        {
            let mut stmt = tx.prepare_cached(&ticket_insert_sql())?;
            for staged in batch {
                let values = ticket_params(staged, &now);
                let params_refs: Vec<&dyn ToSql> = values.iter().map(|p| p.as_ref()).collect();
                stmt.execute(params_refs.as_slice())?;
            }
        }
        tx.commit().context("Failed to commit ticket batch")?;
        Ok(())
    }

    pub fn count_uploaded_tickets(&self) -> Result<i64> {
        let count = self
            .conn
            .query_row("SELECT COUNT(*) FROM uploaded_tickets", [], |row| row.get(0))?;
        Ok(count)
    }

    pub fn count_tickets_for_mapping(&self, mapping_id: i64) -> Result<i64> {
        let count = self.conn.query_row(
            "SELECT COUNT(*) FROM uploaded_tickets WHERE mapping_id = ?1",
            [mapping_id],
            |row| row.get(0),
        )?;
        Ok(count)
    }

    pub fn list_uploaded_tickets(&self, limit: i64) -> Result<Vec<UploadedTicketSummary>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, mapping_id, project, incident_id, priority, status, assignee, mapped_user_email, closed_date, created_at \
             FROM uploaded_tickets ORDER BY id DESC LIMIT ?1",
        )?;

        let tickets = stmt
            .query_map([limit], |row| {
                Ok(UploadedTicketSummary {
                    id: row.get(0)?,
                    mapping_id: row.get(1)?,
                    project: row.get(2)?,
                    incident_id: row.get(3)?,
                    priority: row.get(4)?,
                    status: row.get(5)?,
                    assignee: row.get(6)?,
                    mapped_user_email: row.get(7)?,
                    closed_date: row.get::<_, Option<String>>(8)?.map(parse_datetime),
                    created_at: parse_datetime(row.get::<_, String>(9)?),
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(tickets)
    }
}

/// Display projection of an imported ticket row.
#[derive(Debug, Clone)]
pub struct UploadedTicketSummary {
    pub id: i64,
    pub mapping_id: i64,
    pub project: String,
    pub incident_id: Option<String>,
    pub priority: Option<String>,
    pub status: Option<String>,
    pub assignee: Option<String>,
    pub mapped_user_email: Option<String>,
    pub closed_date: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

fn ticket_insert_sql() -> String {
    let mut columns = vec!["mapping_id", "project", "mapped_user_email"];
    columns.extend(csv::HEADER_COLUMNS.iter().map(|(_, column)| *column));
    columns.push("created_at");
    let placeholders = vec!["?"; columns.len()].join(", ");
    format!(
        "INSERT INTO uploaded_tickets ({}) VALUES ({})",
        columns.join(", "),
        placeholders
    )
}

/// Binds one staged ticket in the column order of `ticket_insert_sql`.
fn ticket_params(staged: &StagedTicket, created_at: &str) -> Vec<Box<dyn ToSql>> {
    fn date(value: Option<DateTime<Utc>>) -> Box<dyn ToSql> {
        Box::new(value.map(|d| d.to_rfc3339()))
    }

    let r = &staged.record;
    vec![
        Box::new(staged.mapping_id),
        Box::new(staged.project.clone()),
        Box::new(staged.mapped_user_email.clone()),
        Box::new(r.incident_id.clone()),
        Box::new(r.priority.clone()),
        Box::new(r.region.clone()),
        Box::new(r.country.clone()),
        Box::new(r.city.clone()),
        Box::new(r.site_group.clone()),
        Box::new(r.site.clone()),
        Box::new(r.assigned_group.clone()),
        Box::new(r.assignee.clone()),
        Box::new(r.status.clone()),
        Box::new(r.status_reason.clone()),
        Box::new(r.urgency.clone()),
        Box::new(r.impact.clone()),
        Box::new(r.incident_type.clone()),
        Box::new(r.summary.clone()),
        Box::new(r.notes.clone()),
        Box::new(r.reported_source.clone()),
        Box::new(r.company.clone()),
        Box::new(r.organization.clone()),
        Box::new(r.department.clone()),
        Box::new(r.submitter.clone()),
        date(r.submit_date),
        date(r.reported_date),
        date(r.responded_date),
        date(r.last_resolved_date),
        date(r.closed_date),
        Box::new(r.last_modified_by.clone()),
        date(r.last_modified_date),
        Box::new(r.resolution.clone()),
        Box::new(r.resolution_category.clone()),
        Box::new(r.resolution_category_tier_2.clone()),
        Box::new(r.resolution_category_tier_3.clone()),
        Box::new(r.product_category_tier_1.clone()),
        Box::new(r.product_category_tier_2.clone()),
        Box::new(r.product_category_tier_3.clone()),
        Box::new(r.operational_category_tier_1.clone()),
        Box::new(r.operational_category_tier_2.clone()),
        Box::new(r.operational_category_tier_3.clone()),
        Box::new(r.assigned_support_company.clone()),
        Box::new(r.assigned_support_organization.clone()),
        Box::new(r.owner_group.clone()),
        Box::new(r.owner.clone()),
        Box::new(r.vendor_name.clone()),
        Box::new(r.vendor_ticket_number.clone()),
        Box::new(r.group_transfers),
        Box::new(r.individual_transfers),
        Box::new(r.reopen_count),
        Box::new(r.mtti),
        Box::new(r.mttr),
        Box::new(created_at.to_string()),
    ]
}

fn timer_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Timer> {
    Ok(Timer {
        id: row.get(0)?,
        user_email: row.get(1)?,
        project: row.get(2)?,
        ticket_id: row.get(3)?,
        task_detail: row.get(4)?,
        categories: parse_categories(row.get::<_, String>(5)?),
        start_time: parse_datetime(row.get::<_, String>(6)?),
        is_running: row.get::<_, i64>(7)? != 0,
        is_paused: row.get::<_, i64>(8)? != 0,
        pause_start_time: row.get::<_, Option<String>>(9)?.map(parse_datetime),
        total_pause_duration_seconds: row.get(10)?,
        created_at: parse_datetime(row.get::<_, String>(11)?),
    })
}

fn session_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<UploadSession> {
    let status_raw: String = row.get(6)?;
    Ok(UploadSession {
        id: row.get(0)?,
        user_email: row.get(1)?,
        source_id: row.get(2)?,
        file_name: row.get(3)?,
        total_rows: row.get(4)?,
        processed_rows: row.get(5)?,
        status: SessionStatus::parse(&status_raw).unwrap_or(SessionStatus::Failed),
        error_message: row.get(7)?,
        created_at: parse_datetime(row.get::<_, String>(8)?),
    })
}

fn mapping_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<TicketMapping> {
    Ok(TicketMapping {
        id: row.get(0)?,
        source_id: row.get(1)?,
        organization_value: row.get(2)?,
        project: row.get(3)?,
        created_at: parse_datetime(row.get::<_, String>(4)?),
    })
}

fn parse_datetime(s: String) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(&s)
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_else(|_| Utc::now())
}

fn parse_categories(s: String) -> Categories {
    serde_json::from_str(&s).unwrap_or_default()
}
