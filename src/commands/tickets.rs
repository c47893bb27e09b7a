use anyhow::Result;

use crate::db::Database;

pub fn list(db: &Database, limit: i64) -> Result<()> {
    let tickets = db.list_uploaded_tickets(limit)?;
    if tickets.is_empty() {
        println!("No uploaded tickets.");
        return Ok(());
    }

    for ticket in &tickets {
        let closed = ticket
            .closed_date
            .map(|d| d.format("%Y-%m-%d").to_string())
            .unwrap_or_else(|| "open".to_string());
        println!(
            "#{:<5} {:<18} {:<12} {:<10} {:<12} {}",
            ticket.id,
            ticket.incident_id.as_deref().unwrap_or("-"),
            ticket.project,
            ticket.priority.as_deref().unwrap_or("-"),
            ticket
                .mapped_user_email
                .as_deref()
                .or(ticket.assignee.as_deref())
                .unwrap_or("-"),
            closed
        );
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_list_empty_is_ok() {
        let dir = tempdir().unwrap();
        let db = Database::open(&dir.path().join("test.db")).unwrap();
        assert!(list(&db, 20).is_ok());
    }
}
