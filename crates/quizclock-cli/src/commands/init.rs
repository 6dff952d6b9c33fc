//! The `quizclock init` command.

use anyhow::Result;

pub fn execute() -> Result<()> {
    // Create quizclock.toml
    if std::path::Path::new("quizclock.toml").exists() {
        println!("quizclock.toml already exists, skipping.");
    } else {
        std::fs::write("quizclock.toml", SAMPLE_CONFIG)?;
        println!("Created quizclock.toml");
    }

    // Create example question bank
    std::fs::create_dir_all("questions")?;
    let example_path = std::path::Path::new("questions/example.toml");
    if example_path.exists() {
        println!("questions/example.toml already exists, skipping.");
    } else {
        std::fs::write(example_path, EXAMPLE_BANK)?;
        println!("Created questions/example.toml");
    }

    println!("\nNext steps:");
    println!("  1. Add your own questions under questions/");
    println!("  2. Run: quizclock validate --questions questions/example.toml");
    println!("  3. Run: quizclock run --questions questions/example.toml --mode practice");

    Ok(())
}

const SAMPLE_CONFIG: &str = r#"# quizclock configuration

# practice (30 min, hints, instant feedback), exam (60 min) or adaptive (40 min)
default_mode = "practice"
default_difficulty = "medium"

output_dir = "./quizclock-results"

# json, html, markdown, a comma-separated list, or "all"
report_format = "json,html"

# Append every session event to a JSON-lines file.
# activity_log = "${HOME}/.local/share/quizclock/activity.jsonl"
"#;

const EXAMPLE_BANK: &str = r#"[bank]
id = "example"
name = "Example Question Bank"
description = "A short mixed bank to get started"
default_difficulty = "easy"

[[questions]]
id = "mat-1"
text = "What is 7 × 8?"
options = ["54", "56", "64", "48"]
correct_answer = 1
subject = "Mathematics"
achievement_tag = "Multiplication facts"

[[questions]]
id = "mat-2"
text = "Which of these numbers is prime?"
options = ["21", "27", "29", "33"]
correct_answer = 2
subject = "Mathematics"
achievement_tag = "Prime numbers"
difficulty = "medium"

[[questions]]
id = "sci-1"
text = "Which planet is closest to the Sun?"
options = ["Venus", "Mercury", "Mars", "Earth"]
correct_answer = 1
subject = "Science"
achievement_tag = "The solar system"

[[questions]]
id = "sci-2"
text = "What gas do plants absorb during photosynthesis?"
options = ["Oxygen", "Nitrogen", "Carbon dioxide", "Hydrogen"]
correct_answer = 2
subject = "Science"
achievement_tag = "Photosynthesis"
difficulty = "medium"

[[questions]]
id = "eng-1"
text = "Choose the correct past tense: 'Yesterday I ___ to school.'"
options = ["go", "goes", "went", "going"]
correct_answer = 2
subject = "English"
achievement_tag = "Simple past tense"

[[questions]]
id = "eng-2"
text = "Which word is an adjective?"
options = ["quickly", "happy", "run", "under"]
correct_answer = 1
subject = "English"
achievement_tag = "Parts of speech"
difficulty = "hard"
"#;

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;

    use quizclock_core::parser::{parse_bank_str, validate_bank};

    #[test]
    fn example_bank_is_valid() {
        let bank = parse_bank_str(EXAMPLE_BANK, Path::new("example.toml")).unwrap();
        assert_eq!(bank.questions.len(), 6);
        assert!(validate_bank(&bank).is_empty());
    }

    #[test]
    fn sample_config_parses() {
        let config: crate::config::QuizclockConfig = toml::from_str(SAMPLE_CONFIG).unwrap();
        assert_eq!(config.report_format, "json,html");
    }
}
