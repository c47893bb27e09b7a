#![no_main]

//! Fuzz target for the timer state machine.
//!
//! Applies arbitrary pause/resume/stop sequences against a real database
//! and checks that the guarded transitions keep the persisted state
//! consistent and that durations never go negative.

use arbitrary::Arbitrary;
use chrono::Utc;
use libfuzzer_sys::fuzz_target;
use tempfile::tempdir;

use alignzo::db::Database;
use alignzo::models::Categories;

#[derive(Arbitrary, Debug)]
enum Op {
    Pause,
    Resume,
    Status,
}

#[derive(Arbitrary, Debug)]
struct LifecycleInput {
    ticket: String,
    ops: Vec<Op>,
}

fuzz_target!(|input: LifecycleInput| {
    let dir = match tempdir() {
        Ok(d) => d,
        Err(_) => return,
    };
    let db = match Database::open(&dir.path().join("worklog.db")) {
        Ok(d) => d,
        Err(_) => return,
    };

    let ticket = if input.ticket.is_empty() {
        "INC-1".to_string()
    } else {
        input.ticket
    };
    let id = match db.create_timer("fuzz@example.com", "Fuzz", &ticket, "work", &Categories::new())
    {
        Ok(id) => id,
        Err(_) => return,
    };

    for op in input.ops.iter().take(64) {
        let timer = match db.get_timer(id) {
            Ok(Some(t)) => t,
            _ => return,
        };
        let now = Utc::now();

        // State flags are mutually exclusive in storage
        assert!(timer.is_running != timer.is_paused);
        assert!(timer.elapsed_seconds(now) >= 0);
        assert!(timer.net_duration_at(now) >= 0);
        assert!(timer.pause_seconds_at(now) >= timer.total_pause_duration_seconds);

        match op {
            Op::Pause => {
                if timer.is_running {
                    db.mark_timer_paused(id, now).unwrap();
                }
            }
            Op::Resume => {
                if timer.is_paused {
                    let pause_start = timer.pause_start_time.unwrap_or(now);
                    let total = timer.total_pause_duration_seconds
                        + (now - pause_start).num_seconds().max(0);
                    db.mark_timer_resumed(id, total).unwrap();
                }
            }
            Op::Status => {
                let open = db.list_open_timers("fuzz@example.com").unwrap();
                assert_eq!(open.len(), 1);
            }
        }
    }
});
