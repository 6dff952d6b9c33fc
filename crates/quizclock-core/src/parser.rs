//! TOML question bank parser.
//!
//! Loads question banks from TOML files and directories, and validates them.

use std::collections::{HashMap, HashSet};
use std::path::Path;

use anyhow::{Context, Result};
use serde::Deserialize;

use crate::model::{validate_questions, Difficulty, Question, QuestionBank};

/// Intermediate TOML structure for parsing bank files.
#[derive(Debug, Deserialize)]
struct TomlBankFile {
    bank: TomlBankHeader,
    #[serde(default)]
    questions: Vec<TomlQuestion>,
}

#[derive(Debug, Deserialize)]
struct TomlBankHeader {
    id: String,
    name: String,
    #[serde(default)]
    description: String,
    #[serde(default)]
    default_difficulty: Option<String>,
}

#[derive(Debug, Deserialize)]
struct TomlQuestion {
    id: String,
    text: String,
    options: Vec<String>,
    correct_answer: usize,
    subject: String,
    #[serde(default)]
    achievement_tag: String,
    #[serde(default)]
    difficulty: Option<String>,
}

/// Parse a single TOML file into a `QuestionBank`.
pub fn parse_bank(path: &Path) -> Result<QuestionBank> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read question bank: {}", path.display()))?;

    parse_bank_str(&content, path)
}

/// Parse a TOML string into a `QuestionBank` (useful for testing).
///
/// Structural problems that would stop a session from being built (no
/// questions, fewer than two options, a correct answer outside the options)
/// are errors here as well.
pub fn parse_bank_str(content: &str, source_path: &Path) -> Result<QuestionBank> {
    let parsed: TomlBankFile = toml::from_str(content)
        .with_context(|| format!("failed to parse TOML: {}", source_path.display()))?;

    let default_difficulty: Difficulty = parsed
        .bank
        .default_difficulty
        .as_deref()
        .map(str::parse)
        .transpose()?
        .unwrap_or_default();

    let questions = parsed
        .questions
        .into_iter()
        .map(|q| {
            let difficulty = q
                .difficulty
                .as_deref()
                .map(str::parse::<Difficulty>)
                .transpose()
                .with_context(|| format!("question {}", q.id))?
                .unwrap_or(default_difficulty);

            Ok(Question {
                id: q.id,
                text: q.text,
                options: q.options,
                correct_answer: q.correct_answer,
                subject: q.subject,
                achievement_tag: q.achievement_tag,
                difficulty,
            })
        })
        .collect::<Result<Vec<_>>>()?;

    validate_questions(&questions)
        .with_context(|| format!("invalid question bank: {}", source_path.display()))?;

    Ok(QuestionBank {
        id: parsed.bank.id,
        name: parsed.bank.name,
        description: parsed.bank.description,
        questions,
    })
}

/// Recursively load all `.toml` question banks from a directory.
///
/// Files that fail to parse are skipped with a warning. Entries are visited in
/// file-name order.
pub fn load_bank_directory(dir: &Path) -> Result<Vec<QuestionBank>> {
    let mut banks = Vec::new();

    if !dir.is_dir() {
        anyhow::bail!("not a directory: {}", dir.display());
    }

    let mut entries = std::fs::read_dir(dir)
        .with_context(|| format!("failed to read directory: {}", dir.display()))?
        .map(|entry| entry.map(|e| e.path()))
        .collect::<std::io::Result<Vec<_>>>()?;
    entries.sort();

    for path in entries {
        if path.is_dir() {
            banks.extend(load_bank_directory(&path)?);
        } else if path.extension().is_some_and(|ext| ext == "toml") {
            match parse_bank(&path) {
                Ok(bank) => banks.push(bank),
                Err(e) => {
                    tracing::warn!("skipping {}: {:#}", path.display(), e);
                }
            }
        }
    }

    Ok(banks)
}

/// Load a bank file, or every bank under a directory.
pub fn load_banks(path: &Path) -> Result<Vec<QuestionBank>> {
    if path.is_dir() {
        load_bank_directory(path)
    } else {
        Ok(vec![parse_bank(path)?])
    }
}

/// A warning from bank validation.
#[derive(Debug, Clone)]
pub struct ValidationWarning {
    /// The question ID (if applicable).
    pub question_id: Option<String>,
    /// Warning message.
    pub message: String,
}

/// Validate a bank for issues that do not prevent a session but are likely mistakes.
pub fn validate_bank(bank: &QuestionBank) -> Vec<ValidationWarning> {
    let mut warnings = Vec::new();

    let mut seen_ids = HashSet::new();
    for question in &bank.questions {
        if !seen_ids.insert(&question.id) {
            warnings.push(ValidationWarning {
                question_id: Some(question.id.clone()),
                message: format!("duplicate question ID: {}", question.id),
            });
        }
    }

    for question in &bank.questions {
        if question.text.trim().is_empty() {
            warnings.push(ValidationWarning {
                question_id: Some(question.id.clone()),
                message: "question text is empty".into(),
            });
        }

        let mut seen_options = HashSet::new();
        if question
            .options
            .iter()
            .any(|o| !seen_options.insert(o.trim()))
        {
            warnings.push(ValidationWarning {
                question_id: Some(question.id.clone()),
                message: "options contain duplicates".into(),
            });
        }

        if question.subject.trim().is_empty() {
            warnings.push(ValidationWarning {
                question_id: Some(question.id.clone()),
                message: "subject is empty".into(),
            });
        }
    }

    // A subject with one question can only ever be 0% or 100%.
    let mut per_subject: HashMap<&str, usize> = HashMap::new();
    for question in &bank.questions {
        *per_subject.entry(question.subject.as_str()).or_default() += 1;
    }
    let mut singles: Vec<&str> = per_subject
        .into_iter()
        .filter(|(subject, n)| *n == 1 && !subject.trim().is_empty())
        .map(|(subject, _)| subject)
        .collect();
    singles.sort_unstable();
    for subject in singles {
        warnings.push(ValidationWarning {
            question_id: None,
            message: format!("subject '{subject}' has a single question"),
        });
    }

    warnings
}
