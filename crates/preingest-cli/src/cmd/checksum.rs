use crate::output::print_json;
use anyhow::Context;
use preingest_core::fixity::HttpFixityClient;
use preingest_core::{
    ActionResult, ActionStore, ChecksumStep, Collection, EventNotifier, PreingestError,
    PreingestEvent, ResultPayload, Step, StepContext,
};
use std::path::Path;
use std::sync::Arc;

/// Run the checksum step in-process and print its payload.
///
/// Exits non-zero when the digests differ or no digest could be calculated;
/// the payload is printed either way.
pub fn run(
    config_path: &Path,
    collection: &str,
    algorithm: &str,
    expected: Option<String>,
    json: bool,
) -> anyhow::Result<()> {
    let settings = Arc::new(super::load_settings(config_path)?);
    let collection = Collection::new(&settings.data_folder, collection)?;
    if !collection.exists() {
        return Err(PreingestError::CollectionNotFound(collection.name().to_string()).into());
    }

    let database = settings.database_path();
    let store = ActionStore::open(&database)
        .with_context(|| format!("failed to open action store {}", database.display()))?;
    let notifier = EventNotifier::new();
    let _progress = (!json).then(|| notifier.subscribe(Arc::new(print_progress)));

    let client = Arc::new(HttpFixityClient::from_settings(&settings));
    let ctx = StepContext {
        settings,
        notifier,
        store: Arc::new(store),
        collection,
    };
    let mut step = ChecksumStep::new(ctx, client, algorithm).with_expected(expected);
    let payload = step.execute()?;

    if json {
        print_json(&payload)?;
    } else {
        print_payload(&payload);
    }

    match payload.result {
        Some(ActionResult::Success) => Ok(()),
        Some(ActionResult::Error) => anyhow::bail!("checksum does not match the expected value"),
        _ => anyhow::bail!("checksum calculation failed"),
    }
}

fn print_progress(event: &PreingestEvent) {
    println!("[{}] {}", event.action_type, event.description);
}

fn print_payload(payload: &ResultPayload) {
    let props = &payload.properties;
    println!();
    println!("Process:  {}", props.process_id);
    println!("Session:  {}", props.session_id);
    if let Some(result) = payload.result {
        println!("Result:   {result}");
    }
    if !payload.summary.is_unavailable() {
        let s = payload.summary;
        println!(
            "Summary:  processed {}, accepted {}, rejected {}",
            s.processed, s.accepted, s.rejected
        );
    }
    for data in &payload.action_data {
        println!("Data:     {data}");
    }
    if !props.result_files.is_empty() {
        println!("Results:  {}", props.result_files.join(", "));
    }
    if !payload.messages.is_empty() {
        println!("Messages:");
        for m in &payload.messages {
            for line in m.lines() {
                println!("  {line}");
            }
        }
    }
}
