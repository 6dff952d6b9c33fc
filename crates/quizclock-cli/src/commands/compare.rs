//! The `quizclock compare` command.

use std::path::PathBuf;

use anyhow::Result;

use quizclock_core::analytics::AnalysisReport;

pub fn execute(
    baseline_path: PathBuf,
    current_path: PathBuf,
    threshold: f64,
    fail_on_decline: bool,
    format: String,
) -> Result<()> {
    anyhow::ensure!(
        (0.0..=1.0).contains(&threshold),
        "threshold must be between 0.0 and 1.0"
    );

    let baseline = AnalysisReport::load_json(&baseline_path)?;
    let current = AnalysisReport::load_json(&current_path)?;

    let comparison = current.compare(&baseline, threshold);

    match format.as_str() {
        "markdown" | "md" => {
            println!("{}", comparison.to_markdown());
        }
        "json" => {
            println!("{}", serde_json::to_string_pretty(&comparison)?);
        }
        _ => {
            // text format
            println!(
                "Score: {} -> {} ({:+})",
                comparison.baseline_score, comparison.current_score, comparison.score_delta
            );
            println!(
                "Subjects: {} improved, {} declined, {} unchanged",
                comparison.improved.len(),
                comparison.declined.len(),
                comparison.unchanged.len()
            );

            for (title, changes) in [
                ("Declined", &comparison.declined),
                ("Improved", &comparison.improved),
            ] {
                if changes.is_empty() {
                    continue;
                }
                println!("\n{title}:");
                for c in changes {
                    println!(
                        "  {} {:.1}% -> {:.1}% ({:+.1}%)",
                        c.subject,
                        c.baseline_accuracy * 100.0,
                        c.current_accuracy * 100.0,
                        c.delta * 100.0
                    );
                }
            }

            if !comparison.new_subjects.is_empty() {
                println!("\nNew subject(s): {}", comparison.new_subjects.join(", "));
            }
            if !comparison.dropped_subjects.is_empty() {
                println!(
                    "Dropped subject(s): {}",
                    comparison.dropped_subjects.join(", ")
                );
            }
        }
    }

    if fail_on_decline && comparison.has_declines() {
        std::process::exit(1);
    }

    Ok(())
}
