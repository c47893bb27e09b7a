use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

use crate::csv;

/// Free-form category selections attached to a timer or work log,
/// e.g. `{"Work Type": "Incident", "Shift": "Night"}`.
pub type Categories = BTreeMap<String, String>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionStatus {
    Processing,
    Completed,
    Failed,
}

impl SessionStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            SessionStatus::Processing => "processing",
            SessionStatus::Completed => "completed",
            SessionStatus::Failed => "failed",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "processing" => Some(SessionStatus::Processing),
            "completed" => Some(SessionStatus::Completed),
            "failed" => Some(SessionStatus::Failed),
            _ => None,
        }
    }
}

impl fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Bookkeeping row for one CSV upload attempt. Never deleted automatically.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadSession {
    pub id: i64,
    pub user_email: String,
    pub source_id: String,
    pub file_name: String,
    pub total_rows: i64,
    pub processed_rows: i64,
    pub status: SessionStatus,
    pub error_message: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Binding of an external source's organization label to an internal project.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TicketMapping {
    pub id: i64,
    pub source_id: String,
    pub organization_value: String,
    pub project: String,
    pub created_at: DateTime<Utc>,
}

/// Per-mapping assignee-value → user-email binding.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserMapping {
    pub id: i64,
    pub mapping_id: i64,
    pub assignee_value: String,
    pub user_email: String,
}

/// An in-progress, resumable unit of tracked work, not yet finalized.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Timer {
    pub id: i64,
    pub user_email: String,
    pub project: String,
    pub ticket_id: String,
    pub task_detail: String,
    pub categories: Categories,
    pub start_time: DateTime<Utc>,
    pub is_running: bool,
    pub is_paused: bool,
    pub pause_start_time: Option<DateTime<Utc>>,
    pub total_pause_duration_seconds: i64,
    pub created_at: DateTime<Utc>,
}

impl Timer {
    /// Pause seconds accumulated as of `now`, including the open pause
    /// interval when the timer is currently paused.
    pub fn pause_seconds_at(&self, now: DateTime<Utc>) -> i64 {
        let mut total = self.total_pause_duration_seconds;
        if let Some(pause_start) = self.pause_start_time {
            total += (now - pause_start).num_seconds().max(0);
        }
        total
    }

    /// Net worked seconds for display. While paused the clock reads up to
    /// the pause point, so it visibly stops ticking.
    pub fn elapsed_seconds(&self, now: DateTime<Utc>) -> i64 {
        let end = if self.is_paused {
            self.pause_start_time.unwrap_or(now)
        } else {
            now
        };
        ((end - self.start_time).num_seconds() - self.total_pause_duration_seconds).max(0)
    }

    /// Final logged duration if the timer were stopped at `now`. Clamped to
    /// zero: clock skew must never produce a negative work log.
    pub fn net_duration_at(&self, now: DateTime<Utc>) -> i64 {
        ((now - self.start_time).num_seconds() - self.pause_seconds_at(now)).max(0)
    }
}

/// An immutable, finalized record of time spent on a ticket.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkLog {
    pub id: i64,
    pub user_email: String,
    pub project: String,
    pub ticket_id: String,
    pub task_detail: String,
    pub categories: Categories,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub total_pause_duration_seconds: i64,
    pub logged_duration_seconds: i64,
    pub created_at: DateTime<Utc>,
}

/// Work log fields as computed by the caller; the database assigns the id
/// and creation timestamp.
#[derive(Debug, Clone)]
pub struct NewWorkLog<'a> {
    pub user_email: &'a str,
    pub project: &'a str,
    pub ticket_id: &'a str,
    pub task_detail: &'a str,
    pub categories: &'a Categories,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub total_pause_duration_seconds: i64,
    pub logged_duration_seconds: i64,
}

/// One parsed CSV row, fields in export-column order. Text columns keep
/// their raw trimmed value; date and metric columns are normalized and
/// null on parse failure.
#[derive(Debug, Clone, Default)]
pub struct TicketRecord {
    pub incident_id: Option<String>,
    pub priority: Option<String>,
    pub region: Option<String>,
    pub country: Option<String>,
    pub city: Option<String>,
    pub site_group: Option<String>,
    pub site: Option<String>,
    pub assigned_group: Option<String>,
    pub assignee: Option<String>,
    pub status: Option<String>,
    pub status_reason: Option<String>,
    pub urgency: Option<String>,
    pub impact: Option<String>,
    pub incident_type: Option<String>,
    pub summary: Option<String>,
    pub notes: Option<String>,
    pub reported_source: Option<String>,
    pub company: Option<String>,
    pub organization: Option<String>,
    pub department: Option<String>,
    pub submitter: Option<String>,
    pub submit_date: Option<DateTime<Utc>>,
    pub reported_date: Option<DateTime<Utc>>,
    pub responded_date: Option<DateTime<Utc>>,
    pub last_resolved_date: Option<DateTime<Utc>>,
    pub closed_date: Option<DateTime<Utc>>,
    pub last_modified_by: Option<String>,
    pub last_modified_date: Option<DateTime<Utc>>,
    pub resolution: Option<String>,
    pub resolution_category: Option<String>,
    pub resolution_category_tier_2: Option<String>,
    pub resolution_category_tier_3: Option<String>,
    pub product_category_tier_1: Option<String>,
    pub product_category_tier_2: Option<String>,
    pub product_category_tier_3: Option<String>,
    pub operational_category_tier_1: Option<String>,
    pub operational_category_tier_2: Option<String>,
    pub operational_category_tier_3: Option<String>,
    pub assigned_support_company: Option<String>,
    pub assigned_support_organization: Option<String>,
    pub owner_group: Option<String>,
    pub owner: Option<String>,
    pub vendor_name: Option<String>,
    pub vendor_ticket_number: Option<String>,
    pub group_transfers: Option<f64>,
    pub individual_transfers: Option<f64>,
    pub reopen_count: Option<f64>,
    pub mtti: Option<f64>,
    pub mttr: Option<f64>,
}

impl TicketRecord {
    /// Assigns one raw CSV field to its column. Blank values stay null;
    /// columns outside the known set are ignored.
    pub fn set_column(&mut self, column: &str, raw: &str) {
        let value = raw.trim();

        fn text(value: &str) -> Option<String> {
            if value.is_empty() {
                None
            } else {
                Some(value.to_string())
            }
        }

        match column {
            "incident_id" => self.incident_id = text(value),
            "priority" => self.priority = text(value),
            "region" => self.region = text(value),
            "country" => self.country = text(value),
            "city" => self.city = text(value),
            "site_group" => self.site_group = text(value),
            "site" => self.site = text(value),
            "assigned_group" => self.assigned_group = text(value),
            "assignee" => self.assignee = text(value),
            "status" => self.status = text(value),
            "status_reason" => self.status_reason = text(value),
            "urgency" => self.urgency = text(value),
            "impact" => self.impact = text(value),
            "incident_type" => self.incident_type = text(value),
            "summary" => self.summary = text(value),
            "notes" => self.notes = text(value),
            "reported_source" => self.reported_source = text(value),
            "company" => self.company = text(value),
            "organization" => self.organization = text(value),
            "department" => self.department = text(value),
            "submitter" => self.submitter = text(value),
            "submit_date" => self.submit_date = csv::parse_source_datetime(value),
            "reported_date" => self.reported_date = csv::parse_source_datetime(value),
            "responded_date" => self.responded_date = csv::parse_source_datetime(value),
            "last_resolved_date" => self.last_resolved_date = csv::parse_source_datetime(value),
            "closed_date" => self.closed_date = csv::parse_source_datetime(value),
            "last_modified_by" => self.last_modified_by = text(value),
            "last_modified_date" => self.last_modified_date = csv::parse_source_datetime(value),
            "resolution" => self.resolution = text(value),
            "resolution_category" => self.resolution_category = text(value),
            "resolution_category_tier_2" => self.resolution_category_tier_2 = text(value),
            "resolution_category_tier_3" => self.resolution_category_tier_3 = text(value),
            "product_category_tier_1" => self.product_category_tier_1 = text(value),
            "product_category_tier_2" => self.product_category_tier_2 = text(value),
            "product_category_tier_3" => self.product_category_tier_3 = text(value),
            "operational_category_tier_1" => self.operational_category_tier_1 = text(value),
            "operational_category_tier_2" => self.operational_category_tier_2 = text(value),
            "operational_category_tier_3" => self.operational_category_tier_3 = text(value),
            "assigned_support_company" => self.assigned_support_company = text(value),
            "assigned_support_organization" => {
                self.assigned_support_organization = text(value);
            }
            "owner_group" => self.owner_group = text(value),
            "owner" => self.owner = text(value),
            "vendor_name" => self.vendor_name = text(value),
            "vendor_ticket_number" => self.vendor_ticket_number = text(value),
            "group_transfers" => self.group_transfers = csv::parse_source_number(value),
            "individual_transfers" => self.individual_transfers = csv::parse_source_number(value),
            "reopen_count" => self.reopen_count = csv::parse_source_number(value),
            "mtti" => self.mtti = csv::parse_source_number(value),
            "mttr" => self.mttr = csv::parse_source_number(value),
            _ => {}
        }
    }
}

/// A parsed row together with its resolved mapping, ready to persist.
#[derive(Debug, Clone)]
pub struct StagedTicket {
    pub mapping_id: i64,
    pub project: String,
    pub mapped_user_email: Option<String>,
    pub record: TicketRecord,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};
    use proptest::prelude::*;

    fn base_timer(start: DateTime<Utc>) -> Timer {
        Timer {
            id: 1,
            user_email: "user@example.com".to_string(),
            project: "NOC".to_string(),
            ticket_id: "INC-1".to_string(),
            task_detail: "triage".to_string(),
            categories: Categories::new(),
            start_time: start,
            is_running: true,
            is_paused: false,
            pause_start_time: None,
            total_pause_duration_seconds: 0,
            created_at: start,
        }
    }

    #[test]
    fn test_net_duration_subtracts_pauses() {
        let start = Utc.with_ymd_and_hms(2025, 8, 18, 9, 0, 0).unwrap();
        let mut timer = base_timer(start);
        timer.total_pause_duration_seconds = 120;
        let now = start + Duration::seconds(600);
        assert_eq!(timer.net_duration_at(now), 480);
    }

    #[test]
    fn test_net_duration_folds_open_pause() {
        let start = Utc.with_ymd_and_hms(2025, 8, 18, 9, 0, 0).unwrap();
        let mut timer = base_timer(start);
        timer.is_running = false;
        timer.is_paused = true;
        timer.total_pause_duration_seconds = 60;
        timer.pause_start_time = Some(start + Duration::seconds(300));
        // Stopped at +400s: 400 wall - 60 accumulated - 100 open pause = 240
        let now = start + Duration::seconds(400);
        assert_eq!(timer.pause_seconds_at(now), 160);
        assert_eq!(timer.net_duration_at(now), 240);
    }

    #[test]
    fn test_net_duration_clamped_to_zero() {
        let start = Utc.with_ymd_and_hms(2025, 8, 18, 9, 0, 0).unwrap();
        let mut timer = base_timer(start);
        timer.total_pause_duration_seconds = 9_999;
        let now = start + Duration::seconds(10);
        assert_eq!(timer.net_duration_at(now), 0);
    }

    #[test]
    fn test_elapsed_frozen_while_paused() {
        let start = Utc.with_ymd_and_hms(2025, 8, 18, 9, 0, 0).unwrap();
        let mut timer = base_timer(start);
        timer.is_running = false;
        timer.is_paused = true;
        timer.pause_start_time = Some(start + Duration::seconds(300));
        let later = start + Duration::seconds(5_000);
        assert_eq!(timer.elapsed_seconds(later), 300);
        assert_eq!(
            timer.elapsed_seconds(later + Duration::seconds(60)),
            timer.elapsed_seconds(later)
        );
    }

    #[test]
    fn test_elapsed_excludes_prior_pauses() {
        let start = Utc.with_ymd_and_hms(2025, 8, 18, 9, 0, 0).unwrap();
        let mut timer = base_timer(start);
        timer.total_pause_duration_seconds = 100;
        let now = start + Duration::seconds(400);
        assert_eq!(timer.elapsed_seconds(now), 300);
    }

    #[test]
    fn test_set_column_blank_stays_null() {
        let mut record = TicketRecord::default();
        record.set_column("closed_date", "");
        record.set_column("summary", "   ");
        assert!(record.closed_date.is_none());
        assert!(record.summary.is_none());
    }

    #[test]
    fn test_set_column_normalizes_dates_and_numbers() {
        let mut record = TicketRecord::default();
        record.set_column("closed_date", "08/18/2025, 07:11:50 PM");
        record.set_column("mtti", "1.25");
        record.set_column("reopen_count", "junk");
        assert_eq!(
            record.closed_date.unwrap().to_rfc3339(),
            "2025-08-18T19:11:50+00:00"
        );
        assert_eq!(record.mtti, Some(1.25));
        assert!(record.reopen_count.is_none());
    }

    #[test]
    fn test_set_column_unknown_is_ignored() {
        let mut record = TicketRecord::default();
        record.set_column("some_custom_field", "value");
        assert!(record.incident_id.is_none());
    }

    proptest! {
        /// For any start/pause/resume/stop sequence, the logged duration is
        /// (stop - start) - sum(pause intervals), and never negative.
        #[test]
        fn prop_duration_never_negative(
            run_secs in prop::collection::vec(0i64..3_600, 1..8),
            pause_secs in prop::collection::vec(0i64..3_600, 1..8),
        ) {
            let start = Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap();
            let mut timer = base_timer(start);
            let mut now = start;
            let mut paused_total = 0i64;

            for (run, pause) in run_secs.iter().zip(pause_secs.iter()) {
                now += Duration::seconds(*run);
                timer.is_running = false;
                timer.is_paused = true;
                timer.pause_start_time = Some(now);
                now += Duration::seconds(*pause);
                timer.total_pause_duration_seconds += *pause;
                paused_total += *pause;
                timer.pause_start_time = None;
                timer.is_running = true;
                timer.is_paused = false;
            }

            let net = timer.net_duration_at(now);
            let wall = (now - start).num_seconds();
            prop_assert_eq!(net, (wall - paused_total).max(0));
            prop_assert!(net >= 0);
        }
    }
}
