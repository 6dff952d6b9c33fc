//! The `quizclock analyze` command.

use std::path::PathBuf;

use anyhow::Result;

use quizclock_core::report::SessionSnapshot;

use super::{load_questions, render_summary};

pub fn execute(questions_path: PathBuf, session_path: PathBuf, format: String) -> Result<()> {
    let (_, questions) = load_questions(&questions_path)?;
    let snapshot = SessionSnapshot::load_json(&session_path)?;
    let report = snapshot.analyze(&questions)?;

    match format.as_str() {
        "markdown" | "md" => println!("{}", report.to_markdown()),
        "json" => println!("{}", serde_json::to_string_pretty(&report)?),
        "text" => println!("{}", render_summary(&report)),
        other => anyhow::bail!("unknown format: '{other}' (expected text, json or markdown)"),
    }

    Ok(())
}
