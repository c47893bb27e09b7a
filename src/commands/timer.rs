use anyhow::{bail, Context, Result};
use chrono::Utc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use crate::commands::format_hms;
use crate::db::Database;
use crate::feed::TimerView;
use crate::models::{Categories, NewWorkLog, Timer};

pub fn start(
    db: &Database,
    user_email: &str,
    project: &str,
    ticket_id: &str,
    task_detail: &str,
    categories: &[(String, String)],
) -> Result<()> {
    let project = project.trim();
    let ticket_id = ticket_id.trim();
    let task_detail = task_detail.trim();
    if project.is_empty() || ticket_id.is_empty() || task_detail.is_empty() {
        bail!("Project, ticket and task detail are all required.");
    }

    let categories: Categories = categories.iter().cloned().collect();
    let id = db.create_timer(user_email, project, ticket_id, task_detail, &categories)?;
    println!("Started timer #{} on {} ({})", id, ticket_id, project);
    println!("Run 'alignzo timer stop {}' when done.", id);

    Ok(())
}

pub fn pause(db: &Database, user_email: &str, id: i64) -> Result<()> {
    let timer = fetch_owned(db, user_email, id)?;
    if !timer.is_running {
        bail!("Timer #{} is not running.", id);
    }

    db.mark_timer_paused(id, Utc::now())?;
    println!(
        "Paused timer #{} on {} at {}",
        id,
        timer.ticket_id,
        format_hms(timer.elapsed_seconds(Utc::now()))
    );

    Ok(())
}

pub fn resume(db: &Database, user_email: &str, id: i64) -> Result<()> {
    let timer = fetch_owned(db, user_email, id)?;
    if !timer.is_paused {
        bail!("Timer #{} is not paused.", id);
    }

    let now = Utc::now();
    let pause_start = timer
        .pause_start_time
        .context("Paused timer has no pause start time")?;
    let total_pause = timer.total_pause_duration_seconds + (now - pause_start).num_seconds().max(0);

    db.mark_timer_resumed(id, total_pause)?;
    println!(
        "Resumed timer #{} on {} (paused {} so far)",
        id,
        timer.ticket_id,
        format_hms(total_pause)
    );

    Ok(())
}

pub fn stop(db: &Database, user_email: &str, id: i64) -> Result<()> {
    let timer = fetch_owned(db, user_email, id)?;
    let now = Utc::now();

    // An open pause interval ends at the stop instant
    let total_pause = timer.pause_seconds_at(now);
    let net = timer.net_duration_at(now);

    db.insert_work_log(&NewWorkLog {
        user_email: &timer.user_email,
        project: &timer.project,
        ticket_id: &timer.ticket_id,
        task_detail: &timer.task_detail,
        categories: &timer.categories,
        start_time: timer.start_time,
        end_time: now,
        total_pause_duration_seconds: total_pause,
        logged_duration_seconds: net,
    })?;
    db.delete_timer(id)?;

    println!("Stopped timer #{} on {}", id, timer.ticket_id);
    println!("Logged: {} (paused {})", format_hms(net), format_hms(total_pause));

    Ok(())
}

pub fn status(db: &Database, user_email: &str) -> Result<()> {
    let timers = db.list_open_timers(user_email)?;
    if timers.is_empty() {
        println!("No open timers.");
        return Ok(());
    }

    let now = Utc::now();
    for timer in &timers {
        println!("{}", render_line(timer, now));
    }

    Ok(())
}

/// Polls the open-timer list every `interval` seconds until Ctrl-C. The
/// elapsed clocks tick locally each second; the database is only hit when
/// the view's cache goes stale.
pub fn watch(db: &Database, user_email: &str, interval: u64) -> Result<()> {
    let term = Arc::new(AtomicBool::new(false));
    signal_hook::flag::register(signal_hook::consts::SIGINT, Arc::clone(&term))?;
    signal_hook::flag::register(signal_hook::consts::SIGTERM, Arc::clone(&term))?;

    let mut view = TimerView::new(db, user_email, Duration::from_secs(interval));
    println!("Watching timers for {} (Ctrl-C to exit)", user_email);

    while !term.load(Ordering::Relaxed) {
        let now = Utc::now();
        let timers = view.timers()?;
        if timers.is_empty() {
            println!("No open timers.");
        } else {
            for timer in timers {
                println!("{}", render_line(timer, now));
            }
        }

        let deadline = Instant::now() + Duration::from_secs(1);
        while Instant::now() < deadline && !term.load(Ordering::Relaxed) {
            thread::sleep(Duration::from_millis(100));
        }
    }

    println!("Stopped watching.");
    Ok(())
}

fn render_line(timer: &Timer, now: chrono::DateTime<Utc>) -> String {
    let state = if timer.is_paused { "paused " } else { "running" };
    format!(
        "#{:<4} [{}] {:<12} {:<16} {}",
        timer.id,
        state,
        timer.project,
        timer.ticket_id,
        format_hms(timer.elapsed_seconds(now))
    )
}

fn fetch_owned(db: &Database, user_email: &str, id: i64) -> Result<Timer> {
    let timer = db.get_timer(id)?;
    match timer {
        Some(t) if t.user_email == user_email => Ok(t),
        Some(_) => bail!("Timer #{} belongs to another user.", id),
        None => bail!("Timer #{} not found.", id),
    }
}
