use anyhow::Result;
use std::fs;
use std::path::Path;

use crate::config::{self, Config};
use crate::db::Database;

pub const ALIGNZO_DIR: &str = ".alignzo";
pub const DB_FILE: &str = "worklog.db";

pub fn run(cwd: &Path, user_email: &str) -> Result<()> {
    let alignzo_dir = cwd.join(ALIGNZO_DIR);
    let already = alignzo_dir.exists();
    if !already {
        fs::create_dir_all(&alignzo_dir)?;
    }

    // Opening creates the schema
    let _db = Database::open(&alignzo_dir.join(DB_FILE))?;

    config::store(&alignzo_dir, &Config {
        user_email: user_email.to_string(),
    })?;

    if already {
        println!("Reinitialized alignzo in {}", alignzo_dir.display());
    } else {
        println!("Initialized alignzo in {}", alignzo_dir.display());
    }
    println!("Acting user: {}", user_email);
    println!("Run 'alignzo timer start' to begin tracking work.");

    Ok(())
}
