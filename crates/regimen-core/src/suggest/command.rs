//! A provider backed by an external command.
//!
//! The command receives the JSON-encoded [`SuggestionRequest`] on stdin and
//! must print a JSON [`Advice`] document on stdout. A non-zero exit or an
//! unparsable response is an error; the caller falls back to deterministic
//! selection. The child is killed if the caller's timeout drops the future.

use std::process::Stdio;

use async_trait::async_trait;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;

use super::{Advice, ContentSuggester, SuggestionError, SuggestionRequest};

#[derive(Debug, Clone)]
pub struct CommandSuggester {
    program: String,
    args: Vec<String>,
}

impl CommandSuggester {
    pub fn new(program: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            args,
        }
    }

    /// Split a configured command line on whitespace. Returns `None` for a
    /// blank line.
    pub fn from_command_line(line: &str) -> Option<Self> {
        let mut parts = line.split_whitespace().map(str::to_owned);
        let program = parts.next()?;
        Some(Self::new(program, parts.collect()))
    }

    pub fn program(&self) -> &str {
        &self.program
    }
}

#[async_trait]
impl ContentSuggester for CommandSuggester {
    fn name(&self) -> &str {
        "command"
    }

    async fn suggest(&self, request: &SuggestionRequest) -> Result<Advice, SuggestionError> {
        let payload = serde_json::to_vec(request)
            .map_err(|e| SuggestionError::Unavailable(format!("failed to encode request: {e}")))?;

        let mut child = Command::new(&self.program)
            .args(&self.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| {
                SuggestionError::Unavailable(format!("failed to spawn {:?}: {e}", self.program))
            })?;

        if let Some(mut stdin) = child.stdin.take() {
            // A provider may answer without reading its input.
            match stdin.write_all(&payload).await {
                Ok(()) => {}
                Err(e) if e.kind() == std::io::ErrorKind::BrokenPipe => {}
                Err(e) => {
                    return Err(SuggestionError::Unavailable(format!(
                        "failed to write request to {:?}: {e}",
                        self.program
                    )));
                }
            }
        }

        let output = child.wait_with_output().await.map_err(|e| {
            SuggestionError::Unavailable(format!("failed to wait on {:?}: {e}", self.program))
        })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(SuggestionError::Unavailable(format!(
                "{:?} exited with {}: {}",
                self.program,
                output.status,
                stderr.trim()
            )));
        }

        serde_json::from_slice(&output.stdout).map_err(|e| SuggestionError::Malformed(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::profile::{Equipment, Goal, IntakeProfile};
    use crate::template::select_template;

    fn request() -> SuggestionRequest {
        let profile = IntakeProfile {
            goal: Goal::Strength,
            days_per_week: 2,
            session_length_minutes: 40,
            equipment: [Equipment::Dumbbells].into(),
            injury_flags: Default::default(),
        };
        let template = select_template(&profile);
        SuggestionRequest { profile, template }
    }

    fn sh(script: &str) -> CommandSuggester {
        CommandSuggester::new("sh", vec!["-c".to_owned(), script.to_owned()])
    }

    #[tokio::test]
    async fn parses_advice_from_stdout() {
        let suggester = sh(
            r#"cat > /dev/null; printf '%s' '{"slots":[{"session":"full_body","slot":0,"exercise_id":"goblet_squat"}],"notes":["brace"]}'"#,
        );
        let advice = suggester.suggest(&request()).await.expect("should succeed");
        assert_eq!(advice.slots.len(), 1);
        assert_eq!(advice.slots[0].exercise_id, "goblet_squat");
        assert_eq!(advice.notes, vec!["brace".to_owned()]);
    }

    #[tokio::test]
    async fn receives_the_request_on_stdin() {
        // Echo the request's goal back as a note.
        let suggester = sh(
            r#"goal=$(sed -n 's/.*"goal":"\([a-z_]*\)".*/\1/p'); printf '{"notes":["%s"]}' "$goal""#,
        );
        let advice = suggester.suggest(&request()).await.unwrap();
        assert_eq!(advice.notes, vec!["strength".to_owned()]);
    }

    #[tokio::test]
    async fn non_zero_exit_is_unavailable() {
        let err = sh("echo boom >&2; exit 3").suggest(&request()).await.unwrap_err();
        assert!(matches!(err, SuggestionError::Unavailable(ref m) if m.contains("boom")));
    }

    #[tokio::test]
    async fn garbage_output_is_malformed() {
        let err = sh("cat > /dev/null; echo not json")
            .suggest(&request())
            .await
            .unwrap_err();
        assert!(matches!(err, SuggestionError::Malformed(_)));
    }

    #[tokio::test]
    async fn missing_program_is_unavailable() {
        let suggester = CommandSuggester::new("regimen_test_no_such_program", vec![]);
        let err = suggester.suggest(&request()).await.unwrap_err();
        assert!(matches!(err, SuggestionError::Unavailable(_)));
    }

    #[test]
    fn command_line_is_split_on_whitespace() {
        let s = CommandSuggester::from_command_line("  coach-llm --fast  ").unwrap();
        assert_eq!(s.program(), "coach-llm");
        assert_eq!(s.args, vec!["--fast".to_owned()]);
        assert!(CommandSuggester::from_command_line("   ").is_none());
    }
}
