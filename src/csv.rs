//! Hand-rolled CSV handling for Remedy-style ticket exports.
//!
//! The source system quotes free-text fields (`Summary`, `Resolution`) that
//! can contain commas and doubled quotes, so a naive `split(',')` is not an
//! option for data lines. Header rows are unquoted and are split naively.

use chrono::{DateTime, NaiveDateTime, TimeZone, Utc};

/// Header name → database column for every required export column.
///
/// This table is authoritative: auto-slugification is only a fallback for
/// columns outside this list, because several header variants collide after
/// naive snake-casing.
pub const HEADER_COLUMNS: [(&str, &str); 49] = [
    ("Incident ID", "incident_id"),
    ("Priority", "priority"),
    ("Region", "region"),
    ("Country", "country"),
    ("City", "city"),
    ("Site Group", "site_group"),
    ("Site", "site"),
    ("Assigned Group", "assigned_group"),
    ("Assignee", "assignee"),
    ("Status", "status"),
    ("Status_Reason", "status_reason"),
    ("Urgency", "urgency"),
    ("Impact", "impact"),
    ("Incident Type", "incident_type"),
    ("Summary", "summary"),
    ("Notes", "notes"),
    ("Reported Source", "reported_source"),
    ("Company", "company"),
    ("Organization", "organization"),
    ("Department", "department"),
    ("Submitter", "submitter"),
    ("Submit Date", "submit_date"),
    ("Reported Date", "reported_date"),
    ("Responded Date", "responded_date"),
    ("Last Resolved Date", "last_resolved_date"),
    ("Closed Date", "closed_date"),
    ("Last Modified By", "last_modified_by"),
    ("Last Modified Date", "last_modified_date"),
    ("Resolution", "resolution"),
    ("Resolution Category", "resolution_category"),
    ("Resolution Category Tier 2", "resolution_category_tier_2"),
    ("Resolution Category Tier 3", "resolution_category_tier_3"),
    ("Product Categorization Tier 1", "product_category_tier_1"),
    ("Product Categorization Tier 2", "product_category_tier_2"),
    ("Product Categorization Tier 3", "product_category_tier_3"),
    ("Operational Categorization Tier 1", "operational_category_tier_1"),
    ("Operational Categorization Tier 2", "operational_category_tier_2"),
    ("Operational Categorization Tier 3", "operational_category_tier_3"),
    ("Assigned_Support_Company", "assigned_support_company"),
    ("Assigned_Support_Organization", "assigned_support_organization"),
    ("Owner Group", "owner_group"),
    ("Owner", "owner"),
    ("Vendor Name", "vendor_name"),
    ("Vendor Ticket Number", "vendor_ticket_number"),
    ("Group Transfers", "group_transfers"),
    ("Individual Transfers", "individual_transfers"),
    ("Reopen Count", "reopen_count"),
    ("MTTI", "mtti"),
    ("MTTR", "mttr"),
];

/// Splits one data line into fields, honoring double-quote escaping.
///
/// Inside a quoted field a doubled quote (`""`) unescapes to a single `"`
/// and commas do not split. An unterminated quote runs to end of line.
pub fn split_line(line: &str) -> Vec<String> {
    let mut fields = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;
    let mut chars = line.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '"' if in_quotes => {
                if chars.peek() == Some(&'"') {
                    chars.next();
                    current.push('"');
                } else {
                    in_quotes = false;
                }
            }
            '"' => in_quotes = true,
            ',' if !in_quotes => fields.push(std::mem::take(&mut current)),
            _ => current.push(c),
        }
    }
    fields.push(current);
    fields
}

/// Required headers absent from `present`, in table order. Empty means the
/// file is importable; column order in the file itself is free.
pub fn missing_headers(present: &[String]) -> Vec<&'static str> {
    HEADER_COLUMNS
        .iter()
        .map(|(header, _)| *header)
        .filter(|header| !present.iter().any(|p| p == header))
        .collect()
}

/// Database column for a header: explicit table first, slugify fallback.
pub fn column_for_header(header: &str) -> String {
    HEADER_COLUMNS
        .iter()
        .find(|(h, _)| *h == header)
        .map(|(_, column)| (*column).to_string())
        .unwrap_or_else(|| slugify(header))
}

/// Best-effort snake-casing for columns outside the explicit table.
pub fn slugify(header: &str) -> String {
    let mut out = String::with_capacity(header.len());
    let mut last_was_sep = true;
    for c in header.chars() {
        if c.is_ascii_alphanumeric() {
            out.push(c.to_ascii_lowercase());
            last_was_sep = false;
        } else if !last_was_sep {
            out.push('_');
            last_was_sep = true;
        }
    }
    while out.ends_with('_') {
        out.pop();
    }
    out
}

/// Parses a source timestamp like `08/18/2025, 07:11:50 PM`.
///
/// The exporter's format is recognized by the comma plus an AM/PM marker;
/// RFC 3339 is accepted as well. Anything else is a warning and `None`,
/// never an error: a bad date must not sink the row.
pub fn parse_source_datetime(raw: &str) -> Option<DateTime<Utc>> {
    let value = raw.trim();
    if value.is_empty() {
        return None;
    }

    let upper = value.to_ascii_uppercase();
    if value.contains(',') && (upper.contains("AM") || upper.contains("PM")) {
        if let Ok(naive) = NaiveDateTime::parse_from_str(value, "%m/%d/%Y, %I:%M:%S %p") {
            return Some(Utc.from_utc_datetime(&naive));
        }
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Some(dt.with_timezone(&Utc));
    }

    tracing::warn!(value, "unparseable timestamp in ticket export, storing null");
    None
}

/// Lenient numeric parse for metric columns (MTTI, transfer counts).
pub fn parse_source_number(raw: &str) -> Option<f64> {
    let value = raw.trim();
    if value.is_empty() {
        return None;
    }
    value.parse::<f64>().ok()
}
