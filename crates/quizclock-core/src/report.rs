//! Report persistence, session snapshots and progress comparison.

use std::collections::BTreeSet;
use std::path::Path;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::analytics::{analyze, AnalysisReport};
use crate::model::{Question, SessionConfig};
use crate::session::{SessionController, SessionState};

fn write_json<T: Serialize>(value: &T, path: &Path, what: &str) -> Result<()> {
    let json = serde_json::to_string_pretty(value)
        .with_context(|| format!("failed to serialize {what}"))?;
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, json)
        .with_context(|| format!("failed to write {what} to {}", path.display()))?;
    Ok(())
}

fn read_json<T: for<'de> Deserialize<'de>>(path: &Path, what: &str) -> Result<T> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {what} from {}", path.display()))?;
    serde_json::from_str(&content).with_context(|| format!("failed to parse {what} JSON"))
}

/// A frozen session, saved so it can be analysed again later.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionSnapshot {
    /// Unique snapshot identifier.
    pub id: Uuid,
    /// When the snapshot was taken.
    pub created_at: DateTime<Utc>,
    /// Identifier of the bank the session ran on.
    pub bank_id: String,
    /// Question ids in session order, used to check the bank has not changed.
    pub question_ids: Vec<String>,
    pub config: SessionConfig,
    pub state: SessionState,
}

impl SessionSnapshot {
    /// Capture the current state of `controller`.
    pub fn capture(controller: &SessionController, bank_id: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            created_at: Utc::now(),
            bank_id: bank_id.into(),
            question_ids: controller.questions().iter().map(|q| q.id.clone()).collect(),
            config: *controller.config(),
            state: controller.state().clone(),
        }
    }

    /// Re-derive the report from this snapshot against `questions`.
    pub fn analyze(&self, questions: &[Question]) -> Result<AnalysisReport> {
        let ids_match = questions.len() == self.question_ids.len()
            && questions
                .iter()
                .zip(&self.question_ids)
                .all(|(q, id)| &q.id == id);
        anyhow::ensure!(
            ids_match,
            "question bank does not match snapshot {} (bank '{}')",
            self.id,
            self.bank_id
        );
        analyze(&self.state, &self.config, questions)
            .with_context(|| format!("failed to analyse snapshot {}", self.id))
    }

    pub fn save_json(&self, path: &Path) -> Result<()> {
        write_json(self, path, "snapshot")
    }

    pub fn load_json(path: &Path) -> Result<Self> {
        read_json(path, "snapshot")
    }
}

impl AnalysisReport {
    /// Save the report as JSON to a file.
    pub fn save_json(&self, path: &Path) -> Result<()> {
        write_json(self, path, "report")
    }

    /// Load a report from a JSON file.
    pub fn load_json(path: &Path) -> Result<Self> {
        read_json(path, "report")
    }

    /// Format the report as markdown.
    pub fn to_markdown(&self) -> String {
        let mut md = String::new();

        md.push_str("# Session Report\n\n");
        md.push_str(&format!(
            "**Score:** {}/100 ({} of {} correct, {} answered)\n\n",
            self.score, self.correct_count, self.total_questions, self.answered_count
        ));
        md.push_str(&format!(
            "**Mode:** {} | **Difficulty:** {} | **Time:** {} | **Avg/question:** {:.1}s | **Hints:** {}\n\n",
            self.mode,
            self.difficulty,
            format_duration(self.total_time_seconds),
            self.average_time_per_question_seconds,
            self.hints_used_count
        ));

        md.push_str("## Subjects\n\n");
        md.push_str("| Subject | Correct | Total | Accuracy |\n");
        md.push_str("|---------|---------|-------|----------|\n");
        for (subject, tally) in &self.subject_performance {
            md.push_str(&format!(
                "| {} | {} | {} | {:.1}% |\n",
                subject,
                tally.correct,
                tally.total,
                tally.accuracy() * 100.0
            ));
        }
        md.push('\n');

        md.push_str("## Difficulty\n\n");
        md.push_str("| Level | Correct | Total | Accuracy |\n");
        md.push_str("|-------|---------|-------|----------|\n");
        for (level, tally) in &self.difficulty_performance {
            md.push_str(&format!(
                "| {} | {} | {} | {:.1}% |\n",
                level,
                tally.correct,
                tally.total,
                tally.accuracy() * 100.0
            ));
        }
        md.push('\n');

        if !self.weak_subjects.is_empty() {
            md.push_str(&format!("**Weak:** {}\n\n", self.weak_subjects.join(", ")));
        }
        if !self.strong_subjects.is_empty() {
            md.push_str(&format!(
                "**Strong:** {}\n\n",
                self.strong_subjects.join(", ")
            ));
        }

        md.push_str("## Recommendations\n\n");
        for rec in &self.recommendations {
            md.push_str(&format!("- {rec}\n"));
        }

        md
    }

    /// Compare this report against an earlier `baseline`.
    ///
    /// Subject accuracy changes within `threshold` (a fraction, e.g. `0.05`)
    /// count as unchanged.
    pub fn compare(&self, baseline: &AnalysisReport, threshold: f64) -> ProgressComparison {
        let mut improved = Vec::new();
        let mut declined = Vec::new();
        let mut unchanged = Vec::new();
        let mut new_subjects = Vec::new();

        for (subject, tally) in &self.subject_performance {
            let current = tally.accuracy();
            match baseline.subject_accuracy(subject) {
                Some(before) => {
                    let change = SubjectChange {
                        subject: subject.clone(),
                        baseline_accuracy: before,
                        current_accuracy: current,
                        delta: current - before,
                    };
                    if change.delta < -threshold {
                        declined.push(change);
                    } else if change.delta > threshold {
                        improved.push(change);
                    } else {
                        unchanged.push(subject.clone());
                    }
                }
                None => new_subjects.push(subject.clone()),
            }
        }

        let current_subjects: BTreeSet<&String> = self.subject_performance.keys().collect();
        let dropped_subjects = baseline
            .subject_performance
            .keys()
            .filter(|s| !current_subjects.contains(s))
            .cloned()
            .collect();

        ProgressComparison {
            baseline_score: baseline.score,
            current_score: self.score,
            score_delta: i16::from(self.score) - i16::from(baseline.score),
            improved,
            declined,
            unchanged,
            new_subjects,
            dropped_subjects,
        }
    }
}

/// `mm:ss`, or `h:mm:ss` past an hour.
pub fn format_duration(seconds: u32) -> String {
    let (h, m, s) = (seconds / 3600, (seconds % 3600) / 60, seconds % 60);
    if h > 0 {
        format!("{h}:{m:02}:{s:02}")
    } else {
        format!("{m:02}:{s:02}")
    }
}

/// Result of comparing two reports.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProgressComparison {
    pub baseline_score: u8,
    pub current_score: u8,
    pub score_delta: i16,
    /// Subjects whose accuracy went up.
    pub improved: Vec<SubjectChange>,
    /// Subjects whose accuracy went down.
    pub declined: Vec<SubjectChange>,
    /// Subjects with no significant change.
    pub unchanged: Vec<String>,
    /// Subjects in current but not baseline.
    pub new_subjects: Vec<String>,
    /// Subjects in baseline but not current.
    pub dropped_subjects: Vec<String>,
}

/// Accuracy change for one subject.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubjectChange {
    pub subject: String,
    pub baseline_accuracy: f64,
    pub current_accuracy: f64,
    pub delta: f64,
}

impl ProgressComparison {
    /// Format the comparison as markdown.
    pub fn to_markdown(&self) -> String {
        let mut md = String::new();

        md.push_str(&format!(
            "**Score:** {} → {} ({:+})\n\n",
            self.baseline_score, self.current_score, self.score_delta
        ));
        md.push_str(&format!(
            "**Summary:** {} improved, {} declined, {} unchanged\n\n",
            self.improved.len(),
            self.declined.len(),
            self.unchanged.len()
        ));

        for (title, changes) in [("Declined", &self.declined), ("Improved", &self.improved)] {
            if changes.is_empty() {
                continue;
            }
            md.push_str(&format!("### {title}\n\n"));
            md.push_str("| Subject | Baseline | Current | Delta |\n");
            md.push_str("|---------|----------|---------|-------|\n");
            for c in changes {
                md.push_str(&format!(
                    "| {} | {:.1}% | {:.1}% | {:+.1}% |\n",
                    c.subject,
                    c.baseline_accuracy * 100.0,
                    c.current_accuracy * 100.0,
                    c.delta * 100.0
                ));
            }
            md.push('\n');
        }

        if !self.new_subjects.is_empty() {
            md.push_str(&format!("**New subjects:** {}\n\n", self.new_subjects.join(", ")));
        }
        if !self.dropped_subjects.is_empty() {
            md.push_str(&format!(
                "**Dropped subjects:** {}\n\n",
                self.dropped_subjects.join(", ")
            ));
        }

        md
    }

    /// Returns true if the score or any subject went down.
    pub fn has_declines(&self) -> bool {
        self.score_delta < 0 || !self.declined.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analytics::Tally;
    use crate::model::{Difficulty, Mode};

    fn make_report(score: u8, subjects: &[(&str, usize, usize)]) -> AnalysisReport {
        AnalysisReport {
            mode: Mode::Exam,
            difficulty: Difficulty::Medium,
            score,
            correct_count: subjects.iter().map(|s| s.1).sum(),
            answered_count: subjects.iter().map(|s| s.2).sum(),
            total_questions: subjects.iter().map(|s| s.2).sum(),
            total_time_seconds: 600,
            average_time_per_question_seconds: 60.0,
            subject_performance: subjects
                .iter()
                .map(|(s, c, t)| (s.to_string(), Tally { correct: *c, total: *t }))
                .collect(),
            difficulty_performance: Default::default(),
            achievement_performance: Default::default(),
            weak_subjects: vec![],
            strong_subjects: vec![],
            hints_used_count: 0,
            recommendations: vec!["Keep going.".into()],
            questions: vec![],
            started_at_epoch_millis: None,
            completed_at_epoch_millis: None,
        }
    }

    fn question(id: &str) -> Question {
        Question {
            id: id.into(),
            text: "?".into(),
            options: vec!["A".into(), "B".into()],
            correct_answer: 1,
            subject: "Fen".into(),
            achievement_tag: String::new(),
            difficulty: Difficulty::Easy,
        }
    }

    #[test]
    fn compare_identical_reports() {
        let report = make_report(80, &[("Fen", 4, 5)]);
        let cmp = report.compare(&report.clone(), 0.05);
        assert_eq!(cmp.score_delta, 0);
        assert!(cmp.improved.is_empty());
        assert!(cmp.declined.is_empty());
        assert_eq!(cmp.unchanged, vec!["Fen".to_string()]);
        assert!(!cmp.has_declines());
    }

    #[test]
    fn compare_detects_movement() {
        let baseline = make_report(60, &[("Fen", 2, 5), ("Tarih", 4, 5), ("Din", 1, 1)]);
        let current = make_report(70, &[("Fen", 4, 5), ("Tarih", 2, 5), ("İngilizce", 1, 2)]);

        let cmp = current.compare(&baseline, 0.05);
        assert_eq!(cmp.score_delta, 10);
        assert_eq!(cmp.improved.len(), 1);
        assert_eq!(cmp.improved[0].subject, "Fen");
        assert_eq!(cmp.declined[0].subject, "Tarih");
        assert_eq!(cmp.new_subjects, vec!["İngilizce".to_string()]);
        assert_eq!(cmp.dropped_subjects, vec!["Din".to_string()]);
        assert!(cmp.has_declines());

        let md = cmp.to_markdown();
        assert!(md.contains("### Declined"));
        assert!(md.contains("| Fen | 40.0% | 80.0% | +40.0% |"));
        assert!(md.contains("60 → 70 (+10)"));
    }

    #[test]
    fn report_json_roundtrip() {
        let report = make_report(80, &[("Fen", 4, 5)]);
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested/report.json");

        report.save_json(&path).unwrap();
        let loaded = AnalysisReport::load_json(&path).unwrap();
        assert_eq!(loaded, report);
    }

    #[test]
    fn report_markdown() {
        let md = make_report(80, &[("Fen", 4, 5)]).to_markdown();
        assert!(md.contains("**Score:** 80/100"));
        assert!(md.contains("| Fen | 4 | 5 | 80.0% |"));
        assert!(md.contains("- Keep going."));
        assert!(md.contains("**Time:** 10:00"));
    }

    #[test]
    fn durations() {
        assert_eq!(format_duration(0), "00:00");
        assert_eq!(format_duration(95), "01:35");
        assert_eq!(format_duration(3600), "1:00:00");
    }

    #[test]
    fn snapshot_reanalyses_to_the_same_report() {
        let questions = vec![question("a"), question("b")];
        let mut controller =
            SessionController::new(questions.clone(), SessionConfig::new(Mode::Exam, Difficulty::Easy))
                .unwrap();
        controller.start().unwrap();
        controller.select_answer(1).unwrap();
        let report = controller.submit().unwrap();

        let snapshot = SessionSnapshot::capture(&controller, "bank");
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("snapshot.json");
        snapshot.save_json(&path).unwrap();

        let loaded = SessionSnapshot::load_json(&path).unwrap();
        assert_eq!(loaded.id, snapshot.id);
        assert_eq!(loaded.analyze(&questions).unwrap(), report);

        let changed = vec![question("a"), question("z")];
        assert!(loaded.analyze(&changed).is_err());
    }
}
