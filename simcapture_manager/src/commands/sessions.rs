//! Session inspection commands: list, show, clean

use super::format_size;
use anyhow::{bail, Context, Result};
use colored::*;
use simcapture_core::{validate_name, CaptureStore, CapturedRecord, LogSummary, RecordFormat};

/// Print every session with its destinations. Returns the session count.
pub fn list_sessions(store: &CaptureStore) -> Result<usize> {
    let sessions = store
        .list_sessions()
        .with_context(|| format!("Failed to read {}", store.base_dir().display()))?;

    if sessions.is_empty() {
        println!("No capture sessions in {}", store.base_dir().display());
        return Ok(0);
    }

    println!(
        "{} {} session(s) in {}\n",
        "→".cyan(),
        sessions.len(),
        store.base_dir().display()
    );

    for session in &sessions {
        let destinations = store.destinations(session)?;
        let size: u64 = destinations.iter().map(|d| d.size_bytes).sum();
        println!(
            "  {} {}",
            session.yellow().bold(),
            format!("({} file(s), {})", destinations.len(), format_size(size)).dimmed()
        );

        for destination in destinations {
            let modified = destination
                .modified
                .map(|t| {
                    chrono::DateTime::<chrono::Local>::from(t)
                        .format("%Y-%m-%d %H:%M:%S")
                        .to_string()
                })
                .unwrap_or_else(|| "unknown".to_string());
            println!(
                "      {:<24} {:<6} {:>10}  {}",
                destination.name,
                destination.format.to_string(),
                format_size(destination.size_bytes),
                modified.dimmed()
            );
        }
    }

    println!(
        "\n{} total",
        format_size(store.total_size()?).bold()
    );
    Ok(sessions.len())
}

/// Print the records of one destination. Returns them for the caller.
///
/// `format` picks between `<name>.jsonl` and `<name>.bin` when both exist.
pub fn show_destination(
    store: &CaptureStore,
    session: &str,
    name: &str,
    format: Option<RecordFormat>,
    json: bool,
) -> Result<Vec<CapturedRecord>> {
    let Some(destination) = store.find_destination(session, name, format)? else {
        bail!("No destination '{}' in session '{}'", name, session);
    };

    let records = store
        .read_destination(&destination.path)
        .with_context(|| format!("Failed to read {}", destination.path.display()))?;

    if !json {
        println!(
            "{} {} ({} record(s))\n",
            "→".cyan(),
            destination.path.display(),
            records.len()
        );
    }
    for (index, record) in records.iter().enumerate() {
        if json {
            println!("{}", serde_json::to_string(record)?);
        } else {
            println!("  {:>4}  {}", index, record.log_summary());
        }
    }

    Ok(records)
}

/// Delete one session
pub fn clean_session(store: &CaptureStore, session: &str) -> Result<()> {
    validate_name(session)?;
    if !store.list_sessions()?.iter().any(|s| s == session) {
        println!("Session {} does not exist", session.yellow());
        return Ok(());
    }

    store
        .delete_session(session)
        .with_context(|| format!("Failed to delete session '{}'", session))?;
    tracing::info!(session, "capture session removed");
    println!("{} Removed session {}", "✓".green(), session.yellow());
    Ok(())
}
