use anyhow::{bail, Result};

use crate::commands::confirm;
use crate::db::Database;

pub fn list(db: &Database, user_email: &str) -> Result<()> {
    let sessions = db.list_upload_sessions(user_email)?;
    if sessions.is_empty() {
        println!("No upload sessions.");
        return Ok(());
    }

    for session in &sessions {
        println!(
            "#{:<4} {:<10} {:<28} {:>5}/{:<5} {:<10} {}",
            session.id,
            session.source_id,
            session.file_name,
            session.processed_rows,
            session.total_rows,
            session.status,
            session.created_at.format("%Y-%m-%d %H:%M")
        );
    }

    Ok(())
}

pub fn show(db: &Database, id: i64) -> Result<()> {
    let Some(session) = db.get_upload_session(id)? else {
        bail!("Upload session #{} not found.", id);
    };

    println!("Upload session #{}", session.id);
    println!("  File:      {}", session.file_name);
    println!("  Source:    {}", session.source_id);
    println!("  Uploader:  {}", session.user_email);
    println!("  Progress:  {}/{} rows", session.processed_rows, session.total_rows);
    println!("  Status:    {}", session.status);
    if let Some(ref error) = session.error_message {
        println!("  Error:     {}", error);
    }
    println!("  Created:   {}", session.created_at.format("%Y-%m-%d %H:%M:%S"));

    Ok(())
}

pub fn delete(db: &Database, id: i64, force: bool) -> Result<()> {
    if db.get_upload_session(id)?.is_none() {
        bail!("Upload session #{} not found.", id);
    }

    if !force && !confirm(&format!("Delete upload session #{}?", id))? {
        println!("Cancelled.");
        return Ok(());
    }

    db.delete_upload_session(id)?;
    println!("Deleted upload session #{}", id);
    Ok(())
}
