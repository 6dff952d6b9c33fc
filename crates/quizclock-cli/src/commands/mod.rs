//! Subcommand implementations.

use std::path::Path;

use anyhow::Result;
use comfy_table::{Cell, Table};

use quizclock_core::analytics::AnalysisReport;
use quizclock_core::model::Question;
use quizclock_core::parser;
use quizclock_core::report::format_duration;

pub mod analyze;
pub mod compare;
pub mod init;
pub mod run;
pub mod validate;

/// Load the questions at `path` (a bank file or a directory of banks).
///
/// Banks from a directory are concatenated in file-name order. Returns the
/// combined bank id alongside the questions.
pub(crate) fn load_questions(path: &Path) -> Result<(String, Vec<Question>)> {
    let banks = parser::load_banks(path)?;
    anyhow::ensure!(!banks.is_empty(), "no question banks found in {}", path.display());

    let id = banks
        .iter()
        .map(|b| b.id.as_str())
        .collect::<Vec<_>>()
        .join("+");
    let questions = banks.into_iter().flat_map(|b| b.questions).collect();
    Ok((id, questions))
}

/// Render the score line, subject table and recommendations.
pub(crate) fn render_summary(report: &AnalysisReport) -> String {
    let mut out = format!(
        "Score: {}/100 ({} of {} correct, {} answered) | Time: {} | Hints: {}\n",
        report.score,
        report.correct_count,
        report.total_questions,
        report.answered_count,
        format_duration(report.total_time_seconds),
        report.hints_used_count,
    );

    let mut table = Table::new();
    table.set_header(vec!["Subject", "Correct", "Total", "Accuracy", ""]);
    for (subject, tally) in &report.subject_performance {
        let label = if tally.is_strong() {
            "strong"
        } else if tally.is_weak() {
            "weak"
        } else {
            ""
        };
        table.add_row(vec![
            Cell::new(subject),
            Cell::new(tally.correct),
            Cell::new(tally.total),
            Cell::new(format!("{:.1}%", tally.accuracy() * 100.0)),
            Cell::new(label),
        ]);
    }
    out.push_str(&format!("\n{table}\n"));

    if !report.recommendations.is_empty() {
        out.push_str("\nRecommendations:\n");
        for rec in &report.recommendations {
            out.push_str(&format!("  - {rec}\n"));
        }
    }
    out
}
