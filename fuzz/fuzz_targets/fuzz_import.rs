#![no_main]

//! Fuzz target for the whole import pipeline.
//!
//! Feeds arbitrary file content through `import::run` against a real
//! database with one mapping configured. Imports may fail, but they must
//! never panic and a failed run must leave a Failed session behind rather
//! than a dangling Processing one.

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;
use tempfile::tempdir;

use alignzo::db::Database;
use alignzo::import;
use alignzo::models::SessionStatus;

#[derive(Arbitrary, Debug)]
struct ImportInput {
    content: String,
    organization: String,
}

fuzz_target!(|input: ImportInput| {
    let dir = match tempdir() {
        Ok(d) => d,
        Err(_) => return,
    };
    let db = match Database::open(&dir.path().join("worklog.db")) {
        Ok(d) => d,
        Err(_) => return,
    };

    let _ = db.create_mapping("remedy", &input.organization, "Fuzz Project");

    let _ = import::run(
        &db,
        "fuzz@example.com",
        "remedy",
        "fuzz.csv",
        &input.content,
        |_| {},
    );

    if let Ok(sessions) = db.list_upload_sessions("fuzz@example.com") {
        for session in sessions {
            assert_ne!(session.status, SessionStatus::Processing);
        }
    }
});
