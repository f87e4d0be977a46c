use crate::output::{print_json, print_table};
use anyhow::Context;
use preingest_core::action::ActionRecord;
use preingest_core::collection::session_id_for;
use preingest_core::ActionStore;
use std::path::Path;
use uuid::Uuid;

pub fn run(config_path: &Path, session: &str, json: bool) -> anyhow::Result<()> {
    let settings = super::load_settings(config_path)?;
    let session_id = resolve_session(session);

    let database = settings.database_path();
    let store = ActionStore::open(&database)
        .with_context(|| format!("failed to open action store {}", database.display()))?;
    let records = store.list_actions(session_id)?;

    if json {
        return print_json(&records);
    }
    if records.is_empty() {
        println!("No actions recorded for session {session_id}.");
        return Ok(());
    }

    println!("Session {session_id}");
    let rows: Vec<Vec<String>> = records.iter().map(row).collect();
    print_table(
        &["PROCESS ID", "ACTION", "PHASE", "RESULT", "P/A/R", "CREATED"],
        &rows,
    );
    Ok(())
}

/// A UUID is taken as-is; anything else is treated as a collection name.
fn resolve_session(session: &str) -> Uuid {
    Uuid::parse_str(session.trim()).unwrap_or_else(|_| session_id_for(session.trim()))
}

fn row(record: &ActionRecord) -> Vec<String> {
    let summary = match record.statistics_summary {
        Some(s) if !s.is_unavailable() => format!("{}/{}/{}", s.processed, s.accepted, s.rejected),
        _ => "-".to_string(),
    };
    vec![
        record.process_id.to_string(),
        record.name.clone(),
        record
            .last_phase()
            .map(|p| p.to_string())
            .unwrap_or_else(|| "-".to_string()),
        record
            .action_status
            .map(|r| r.to_string())
            .unwrap_or_else(|| "-".to_string()),
        summary,
        record.creation.format("%Y-%m-%d %H:%M:%S").to_string(),
    ]
}
