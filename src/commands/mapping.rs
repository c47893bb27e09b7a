use anyhow::{bail, Result};

use crate::commands::confirm;
use crate::db::Database;

pub fn add(db: &Database, source_id: &str, organization_value: &str, project: &str) -> Result<()> {
    let source_id = source_id.trim();
    let organization_value = organization_value.trim();
    let project = project.trim();
    if source_id.is_empty() || organization_value.is_empty() || project.is_empty() {
        bail!("Source, organization and project are all required.");
    }

    let id = db.create_mapping(source_id, organization_value, project)?;
    println!(
        "Created mapping #{}: {} / '{}' -> {}",
        id, source_id, organization_value, project
    );
    Ok(())
}

pub fn list(db: &Database, source_id: Option<&str>) -> Result<()> {
    let mappings = db.list_mappings(source_id)?;
    if mappings.is_empty() {
        println!("No mappings configured.");
        return Ok(());
    }

    for mapping in &mappings {
        let users = db.list_user_mappings(mapping.id)?;
        println!(
            "#{:<4} {:<10} {:<32} -> {:<16} ({} user mappings)",
            mapping.id,
            mapping.source_id,
            mapping.organization_value,
            mapping.project,
            users.len()
        );
    }

    Ok(())
}

pub fn delete(db: &Database, id: i64, force: bool) -> Result<()> {
    let mapping = db.get_mapping(id)?;
    let Some(mapping) = mapping else {
        bail!("Mapping #{} not found.", id);
    };

    if !force {
        let users = db.list_user_mappings(id)?.len();
        let tickets = db.count_tickets_for_mapping(id)?;
        let prompt = format!(
            "Delete mapping #{} ('{}' -> {})? {} user mapping(s) and {} uploaded ticket(s) will be removed.",
            id, mapping.organization_value, mapping.project, users, tickets
        );
        if !confirm(&prompt)? {
            println!("Cancelled.");
            return Ok(());
        }
    }

    db.delete_mapping(id)?;
    println!("Deleted mapping #{}", id);
    Ok(())
}

/// Adds an assignee binding: per-mapping when `mapping_id` is given,
/// otherwise to the global master table for `source_id`.
pub fn add_user(
    db: &Database,
    mapping_id: Option<i64>,
    source_id: Option<&str>,
    assignee_value: &str,
    user_email: &str,
) -> Result<()> {
    let assignee_value = assignee_value.trim();
    let user_email = user_email.trim();
    if assignee_value.is_empty() || user_email.is_empty() {
        bail!("Assignee value and user email are both required.");
    }

    match (mapping_id, source_id) {
        (Some(id), None) => {
            if db.get_mapping(id)?.is_none() {
                bail!("Mapping #{} not found.", id);
            }
            if db.add_user_mapping(id, assignee_value, user_email)? {
                println!("Mapped '{}' -> {} on mapping #{}", assignee_value, user_email, id);
            } else {
                println!("Mapping #{} already maps '{}'.", id, assignee_value);
            }
        }
        (None, Some(source)) => {
            if db.add_master_user_mapping(source, assignee_value, user_email)? {
                println!("Mapped '{}' -> {} globally for {}", assignee_value, user_email, source);
            } else {
                println!("Source '{}' already maps '{}' globally.", source, assignee_value);
            }
        }
        _ => bail!("Provide exactly one of --mapping <id> or --source <id>."),
    }

    Ok(())
}
