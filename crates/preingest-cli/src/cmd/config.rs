use crate::output::print_json;
use preingest_core::config::WarnLevel;
use std::path::Path;

// ---------------------------------------------------------------------------
// show + validate
// ---------------------------------------------------------------------------

pub fn run(config_path: &Path, json: bool) -> anyhow::Result<()> {
    let settings = super::load_settings(config_path)?;
    let warnings = settings.validate();

    if json {
        let value = serde_json::json!({
            "path": config_path,
            "database": settings.database_path(),
            "settings": settings,
            "warnings": warnings,
        });
        print_json(&value)?;
    } else {
        println!("# {}", config_path.display());
        print!("{}", serde_yaml::to_string(&settings)?);
        println!("# database: {}", settings.database_path().display());
        if warnings.is_empty() {
            println!("Settings are valid. No warnings.");
        }
        for w in &warnings {
            let prefix = match w.level {
                WarnLevel::Warning => "warning",
                WarnLevel::Error => "error",
            };
            println!("[{prefix}] {}", w.message);
        }
    }

    if warnings.iter().any(|w| w.level == WarnLevel::Error) {
        anyhow::bail!("settings validation found errors");
    }
    Ok(())
}
