//! Conflict prompt on the controlling terminal.

use std::io::{self, BufRead, IsTerminal, Write};
use std::path::PathBuf;

use ferrule_config::{ConflictChoice, ConflictPrompt};

/// Asks on stderr and reads the answer from stdin. Without a terminal on
/// stdin every prompt counts as dismissed.
pub struct TerminalPrompt {
    settings_path: PathBuf,
}

impl TerminalPrompt {
    pub fn new(settings_path: PathBuf) -> Self {
        Self { settings_path }
    }
}

impl ConflictPrompt for TerminalPrompt {
    async fn choose(&self, message: &str, choices: &[ConflictChoice]) -> Option<ConflictChoice> {
        if !io::stdin().is_terminal() {
            tracing::info!("No terminal for the settings prompt; treating it as dismissed");
            return None;
        }

        let mut question = format!("{message}\n");
        for (idx, choice) in choices.iter().enumerate() {
            question.push_str(&format!("  [{}] {}\n", idx + 1, choice.label()));
        }
        question.push_str("Choice (Enter to dismiss): ");

        let answer = tokio::task::spawn_blocking(move || {
            let mut stderr = io::stderr();
            stderr.write_all(question.as_bytes())?;
            stderr.flush()?;
            let mut line = String::new();
            io::stdin().lock().read_line(&mut line)?;
            Ok::<_, io::Error>(line)
        })
        .await;

        let line = match answer {
            Ok(Ok(line)) => line,
            Ok(Err(e)) => {
                tracing::warn!("Reading the prompt answer failed: {e}");
                return None;
            }
            Err(e) => {
                tracing::warn!("Prompt task failed: {e}");
                return None;
            }
        };
        parse_choice(&line, choices)
    }

    async fn open_settings(&self) {
        eprintln!(
            "Edit {} and enable only one of useJsonErrors and useNewErrorFormat.",
            self.settings_path.display()
        );
    }
}

/// Accepts a 1-based index or a label, case-insensitively.
fn parse_choice(answer: &str, choices: &[ConflictChoice]) -> Option<ConflictChoice> {
    let answer = answer.trim();
    if answer.is_empty() {
        return None;
    }
    if let Ok(index) = answer.parse::<usize>() {
        return index.checked_sub(1).and_then(|i| choices.get(i)).copied();
    }
    choices
        .iter()
        .find(|choice| choice.label().eq_ignore_ascii_case(answer))
        .copied()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn answers_by_index_or_label() {
        let choices = ConflictChoice::ALL;
        assert_eq!(parse_choice("1\n", &choices), Some(ConflictChoice::Ignore));
        assert_eq!(
            parse_choice("update settings", &choices),
            Some(ConflictChoice::UpdateSettings)
        );
        assert_eq!(parse_choice("\n", &choices), None);
        assert_eq!(parse_choice("3", &choices), None);
        assert_eq!(parse_choice("0", &choices), None);
        assert_eq!(parse_choice("maybe", &choices), None);
    }
}
