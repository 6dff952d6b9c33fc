//! HTML report generator.
//!
//! Produces a self-contained HTML file with all CSS/JS inlined.

use anyhow::{Context, Result};
use std::collections::BTreeMap;
use std::path::Path;

use chrono::DateTime;
use quizclock_core::analytics::{AnalysisReport, Tally};
use quizclock_core::report::format_duration;

/// Escape a string for safe HTML insertion.
fn html_escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#x27;")
}

/// Generate an HTML page from an analysis report.
pub fn generate_html(report: &AnalysisReport) -> String {
    let mut html = String::new();

    html.push_str("<!DOCTYPE html>\n<html lang=\"en\">\n<head>\n");
    html.push_str("<meta charset=\"utf-8\">\n");
    html.push_str("<meta name=\"viewport\" content=\"width=device-width, initial-scale=1\">\n");
    html.push_str(&format!(
        "<title>quizclock report — {}/100</title>\n",
        report.score
    ));
    html.push_str("<style>\n");
    html.push_str(CSS);
    html.push_str("</style>\n");
    html.push_str("</head>\n<body>\n");

    // Header
    html.push_str("<header>\n");
    html.push_str("<h1>quizclock report</h1>\n");
    let completed = report
        .completed_at_epoch_millis
        .and_then(DateTime::from_timestamp_millis)
        .map(|at| at.format("%Y-%m-%d %H:%M:%S UTC").to_string())
        .unwrap_or_else(|| "-".to_string());
    html.push_str(&format!(
        "<p class=\"meta\">Mode: <strong>{}</strong> | Difficulty: {} | {} questions | {}</p>\n",
        report.mode, report.difficulty, report.total_questions, completed
    ));
    html.push_str("</header>\n");

    // Summary dashboard
    html.push_str("<section class=\"dashboard\">\n");
    html.push_str("<h2>Summary</h2>\n");
    html.push_str("<table class=\"summary\">\n");
    html.push_str("<thead><tr><th>Score</th><th>Correct</th><th>Answered</th><th>Time</th><th>Avg/question</th><th>Hints</th></tr></thead>\n");
    html.push_str(&format!(
        "<tbody><tr><td>{}/100</td><td>{}/{}</td><td>{}</td><td>{}</td><td>{:.1}s</td><td>{}</td></tr></tbody>\n",
        report.score,
        report.correct_count,
        report.total_questions,
        report.answered_count,
        format_duration(report.total_time_seconds),
        report.average_time_per_question_seconds,
        report.hints_used_count,
    ));
    html.push_str("</table>\n");

    if !report.subject_performance.is_empty() {
        html.push_str(&generate_bar_chart(&report.subject_performance));
    }
    html.push_str("</section>\n");

    // Breakdowns
    html.push_str("<section class=\"breakdown\">\n");
    html.push_str("<h2>Subjects</h2>\n");
    push_tally_table(&mut html, "Subject", &report.subject_performance);
    html.push_str("<h2>Difficulty</h2>\n");
    let by_level: BTreeMap<String, Tally> = report
        .difficulty_performance
        .iter()
        .map(|(level, tally)| (level.to_string(), *tally))
        .collect();
    push_tally_table(&mut html, "Level", &by_level);
    if !report.achievement_performance.is_empty() {
        html.push_str("<h2>Achievements</h2>\n");
        push_tally_table(&mut html, "Achievement", &report.achievement_performance);
    }
    html.push_str("</section>\n");

    // Recommendations
    html.push_str("<section class=\"recommendations\">\n");
    html.push_str("<h2>Recommendations</h2>\n<ul>\n");
    for rec in &report.recommendations {
        html.push_str(&format!("<li>{}</li>\n", html_escape(rec)));
    }
    html.push_str("</ul>\n</section>\n");

    // Per-question results
    html.push_str("<section class=\"results\">\n");
    html.push_str("<h2>Questions</h2>\n");
    html.push_str("<table class=\"results-table\" id=\"results\">\n");
    html.push_str("<thead><tr><th onclick=\"sortTable(0)\">#</th><th onclick=\"sortTable(1)\">Question</th><th onclick=\"sortTable(2)\">Subject</th><th onclick=\"sortTable(3)\">Answer</th><th onclick=\"sortTable(4)\">Time</th><th onclick=\"sortTable(5)\">Hint</th></tr></thead>\n");
    html.push_str("<tbody>\n");

    for q in &report.questions {
        let (class, answer) = match q.selected {
            None => ("skip", "-".to_string()),
            Some(option) if q.correct => ("pass", option_letter(option)),
            Some(option) => ("fail", option_letter(option)),
        };
        html.push_str(&format!(
            "<tr class=\"{}\"><td>{}</td><td>{}</td><td>{}</td><td>{}</td><td>{}s</td><td>{}</td></tr>\n",
            class,
            q.index + 1,
            html_escape(&q.question_id),
            html_escape(&q.subject),
            answer,
            q.elapsed_seconds,
            if q.hint_used { "yes" } else { "" }
        ));
    }

    html.push_str("</tbody></table>\n");
    html.push_str("</section>\n");

    // Raw JSON
    html.push_str("<section class=\"raw-data\">\n");
    html.push_str("<details>\n<summary>Raw JSON Data</summary>\n");
    html.push_str("<pre><code>");
    html.push_str(
        &serde_json::to_string_pretty(report)
            .unwrap_or_default()
            .replace('<', "&lt;")
            .replace('>', "&gt;"),
    );
    html.push_str("</code></pre>\n");
    html.push_str("</details>\n</section>\n");

    // JavaScript for sorting
    html.push_str("<script>\n");
    html.push_str(JS);
    html.push_str("</script>\n");

    html.push_str("</body>\n</html>");
    html
}

/// Write an HTML report to a file.
pub fn write_html_report(report: &AnalysisReport, path: &Path) -> Result<()> {
    let html = generate_html(report);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, html)
        .with_context(|| format!("failed to write HTML report to {}", path.display()))?;
    Ok(())
}

/// `0 → A`, `1 → B`, …
fn option_letter(option: usize) -> String {
    u8::try_from(option)
        .ok()
        .filter(|o| *o < 26)
        .map(|o| char::from(b'A' + o).to_string())
        .unwrap_or_else(|| (option + 1).to_string())
}

fn push_tally_table(html: &mut String, label: &str, tallies: &BTreeMap<String, Tally>) {
    html.push_str("<table>\n");
    html.push_str(&format!(
        "<thead><tr><th>{label}</th><th>Correct</th><th>Total</th><th>Accuracy</th></tr></thead>\n"
    ));
    html.push_str("<tbody>\n");
    for (name, tally) in tallies {
        let class = if tally.is_strong() {
            "pass"
        } else if tally.is_weak() {
            "fail"
        } else {
            ""
        };
        html.push_str(&format!(
            "<tr class=\"{}\"><td>{}</td><td>{}</td><td>{}</td><td>{:.1}%</td></tr>\n",
            class,
            html_escape(name),
            tally.correct,
            tally.total,
            tally.accuracy() * 100.0
        ));
    }
    html.push_str("</tbody></table>\n");
}

fn generate_bar_chart(per_subject: &BTreeMap<String, Tally>) -> String {
    let bar_height = 30;
    let max_width = 400;
    let padding = 10;
    let label_width = 200;

    let total_height = per_subject.len() * (bar_height + padding) + padding;

    let mut svg = format!(
        "<svg width=\"{}\" height=\"{}\" xmlns=\"http://www.w3.org/2000/svg\">\n",
        label_width + max_width + 60,
        total_height
    );

    for (i, (subject, tally)) in per_subject.iter().enumerate() {
        let y = i * (bar_height + padding) + padding;
        let accuracy = tally.accuracy();
        let width = (accuracy * max_width as f64) as usize;

        let color = if tally.is_strong() {
            "#22c55e"
        } else if tally.is_weak() {
            "#ef4444"
        } else {
            "#eab308"
        };

        svg.push_str(&format!(
            "  <text x=\"{}\" y=\"{}\" font-size=\"14\" fill=\"currentColor\" text-anchor=\"end\" dominant-baseline=\"middle\">{}</text>\n",
            label_width - 10,
            y + bar_height / 2,
            html_escape(subject)
        ));
        svg.push_str(&format!(
            "  <rect x=\"{}\" y=\"{}\" width=\"{}\" height=\"{}\" fill=\"{}\" rx=\"4\"/>\n",
            label_width, y, width, bar_height, color
        ));
        svg.push_str(&format!(
            "  <text x=\"{}\" y=\"{}\" font-size=\"12\" fill=\"currentColor\" dominant-baseline=\"middle\">{:.1}%</text>\n",
            label_width + width + 8,
            y + bar_height / 2,
            accuracy * 100.0
        ));
    }

    svg.push_str("</svg>\n");
    svg
}

const CSS: &str = r#"
:root { --bg: #fff; --fg: #1a1a1a; --border: #e5e7eb; --pass: #dcfce7; --fail: #fde2e2; --skip: #f3f4f6; }
@media (prefers-color-scheme: dark) {
  :root { --bg: #111827; --fg: #f9fafb; --border: #374151; --pass: #064e3b; --fail: #7f1d1d; --skip: #1f2937; }
}
body { font-family: -apple-system, BlinkMacSystemFont, 'Segoe UI', sans-serif; margin: 0; padding: 2rem; background: var(--bg); color: var(--fg); }
h1, h2 { margin-top: 2rem; }
.meta { color: #6b7280; }
table { border-collapse: collapse; width: 100%; margin: 1rem 0; }
th, td { border: 1px solid var(--border); padding: 0.5rem 1rem; text-align: left; }
th { background: var(--border); cursor: pointer; }
.pass { background: var(--pass); }
.fail { background: var(--fail); }
.skip { background: var(--skip); }
pre { overflow-x: auto; padding: 1rem; background: var(--border); border-radius: 8px; }
code { font-family: 'JetBrains Mono', 'Fira Code', monospace; font-size: 0.85rem; }
details { margin: 1rem 0; }
summary { cursor: pointer; font-weight: bold; }
svg { margin: 1rem 0; }
"#;

const JS: &str = r#"
function sortTable(col) {
  const table = document.getElementById('results');
  const tbody = table.querySelector('tbody');
  const rows = Array.from(tbody.querySelectorAll('tr'));
  const asc = table.dataset.sortCol == col && table.dataset.sortDir == 'asc' ? false : true;
  rows.sort((a, b) => {
    const va = a.cells[col].textContent;
    const vb = b.cells[col].textContent;
    const na = parseFloat(va), nb = parseFloat(vb);
    const cmp = !isNaN(na) && !isNaN(nb) ? na - nb : va.localeCompare(vb);
    return asc ? cmp : -cmp;
  });
  table.dataset.sortCol = col;
  table.dataset.sortDir = asc ? 'asc' : 'desc';
  rows.forEach(r => tbody.appendChild(r));
}
"#;

#[cfg(test)]
mod tests {
    use super::*;
    use quizclock_core::analyze;
    use quizclock_core::model::{Difficulty, Mode, Question, SessionConfig};
    use quizclock_core::session::{Phase, SessionState};

    fn make_test_report() -> AnalysisReport {
        let questions: Vec<Question> = ["Fen", "Fen", "Tarih & Kültür"]
            .iter()
            .enumerate()
            .map(|(i, subject)| Question {
                id: format!("case-{i}"),
                text: "?".into(),
                options: vec!["A".into(), "B".into(), "C".into()],
                correct_answer: 1,
                subject: subject.to_string(),
                achievement_tag: "F.8.1".into(),
                difficulty: Difficulty::Medium,
            })
            .collect();
        let mut state = SessionState::new(3, 1500);
        state.phase = Phase::Completed;
        state.answers.insert(0, 1);
        state.answers.insert(1, 2);
        state.hints_used.insert(1);
        state.completed_at_epoch_millis = Some(1_700_000_000_000);
        analyze(
            &state,
            &SessionConfig::new(Mode::Practice, Difficulty::Medium),
            &questions,
        )
        .unwrap()
    }

    #[test]
    fn html_report_contains_required_elements() {
        let report = make_test_report();
        let html = generate_html(&report);

        assert!(html.contains("<html"));
        assert!(html.contains("</html>"));
        assert!(html.contains("33/100"));
        assert!(html.contains("case-0"));
        assert!(html.contains("Tarih &amp; Kültür"));
        assert!(html.contains("2023-11-14"));
        assert!(html.contains("<svg"));
        assert!(html.contains("<tr class=\"skip\"><td>3</td>"));
    }

    #[test]
    fn option_letters() {
        assert_eq!(option_letter(0), "A");
        assert_eq!(option_letter(3), "D");
        assert_eq!(option_letter(30), "31");
    }

    #[test]
    fn html_report_write_to_file() {
        let report = make_test_report();
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("report.html");

        write_html_report(&report, &path).unwrap();
        assert!(path.exists());

        let content = std::fs::read_to_string(&path).unwrap();
        assert!(content.contains("<html"));
    }
}
