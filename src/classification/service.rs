// External seams of a classification cycle
//
// `ClassificationService` is the opaque `send(prompt) -> response` call and
// is always invoked on the blocking pool. `PresentationSink` receives the
// parsed report. Closures implement both traits.

use std::io::Write;
use std::process::{Command, Stdio};
use std::sync::Mutex;

use super::report::ClassificationReport;
use crate::error::ClassifierError;

/// Opaque downstream classifier
pub trait ClassificationService: Send + Sync {
    /// Send one prompt and return the raw response text
    fn send(&self, prompt: &str) -> Result<String, ClassifierError>;
}

impl<F> ClassificationService for F
where
    F: Fn(&str) -> Result<String, ClassifierError> + Send + Sync,
{
    fn send(&self, prompt: &str) -> Result<String, ClassifierError> {
        self(prompt)
    }
}

/// Consumer of finished classifications (overlay, notification, log)
pub trait PresentationSink: Send + Sync {
    fn present(&self, report: &ClassificationReport);
}

impl<F> PresentationSink for F
where
    F: Fn(&ClassificationReport) + Send + Sync,
{
    fn present(&self, report: &ClassificationReport) {
        self(report)
    }
}

/// Pipes the prompt into an external command's stdin and returns its stdout
#[derive(Debug, Clone)]
pub struct CommandClassifier {
    program: String,
    args: Vec<String>,
}

impl CommandClassifier {
    pub fn new(program: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            args,
        }
    }

    /// Split a whitespace-separated command line (no shell quoting)
    pub fn from_command_line(command_line: &str) -> Result<Self, ClassifierError> {
        let mut parts = command_line.split_whitespace().map(str::to_string);
        let program = parts.next().ok_or_else(|| ClassifierError::Unavailable {
            reason: "empty classifier command".to_string(),
        })?;
        Ok(Self::new(program, parts.collect()))
    }

    pub fn program(&self) -> &str {
        &self.program
    }
}

impl ClassificationService for CommandClassifier {
    fn send(&self, prompt: &str) -> Result<String, ClassifierError> {
        let mut child = Command::new(&self.program)
            .args(&self.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|err| match err.kind() {
                std::io::ErrorKind::NotFound => ClassifierError::Unavailable {
                    reason: format!("{} not found", self.program),
                },
                _ => ClassifierError::from(err),
            })?;

        let mut stdin = child.stdin.take().ok_or_else(|| ClassifierError::Transport {
            reason: "classifier stdin not available".to_string(),
        })?;

        // Feed stdin while draining stdout so an echoing command cannot fill
        // both pipes and stall
        let (written, output) = std::thread::scope(|scope| {
            let writer = scope.spawn(move || {
                let result = stdin.write_all(prompt.as_bytes());
                // Close stdin to signal EOF
                drop(stdin);
                result
            });
            let output = child.wait_with_output();
            (writer.join(), output)
        });
        let output = output?;

        match written {
            Ok(Ok(())) => {}
            // A command that exits without reading its input still answers
            Ok(Err(err)) if err.kind() == std::io::ErrorKind::BrokenPipe => {
                log::debug!("[CommandClassifier] {} closed stdin early", self.program);
            }
            Ok(Err(err)) => return Err(err.into()),
            Err(_) => {
                return Err(ClassifierError::Transport {
                    reason: "classifier stdin writer panicked".to_string(),
                })
            }
        }

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(ClassifierError::Transport {
                reason: format!(
                    "{} exited with {}: {}",
                    self.program,
                    output.status,
                    stderr.trim()
                ),
            });
        }

        let response = String::from_utf8_lossy(&output.stdout).trim().to_string();
        if response.is_empty() {
            return Err(ClassifierError::EmptyResponse);
        }
        Ok(response)
    }
}

/// Offline classifier that records prompts and answers with a fixed report
#[derive(Debug, Default)]
pub struct DryRunClassifier {
    prompts: Mutex<Vec<String>>,
}

impl DryRunClassifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Prompts received so far
    pub fn prompts(&self) -> Vec<String> {
        self.prompts
            .lock()
            .map(|prompts| prompts.clone())
            .unwrap_or_default()
    }
}

impl ClassificationService for DryRunClassifier {
    fn send(&self, prompt: &str) -> Result<String, ClassifierError> {
        if let Ok(mut prompts) = self.prompts.lock() {
            prompts.push(prompt.to_string());
        }
        Ok(format!(
            r##"{{"emotion": "neutral", "color": "#A9A9A9", "description": "Dry run, prompt of {} bytes not sent."}}"##,
            prompt.len()
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_closure_is_a_service() {
        let service =
            |prompt: &str| -> Result<String, ClassifierError> { Ok(prompt.to_uppercase()) };
        assert_eq!(service.send("abc").unwrap(), "ABC");
    }

    #[test]
    fn test_dry_run_records_prompts() {
        let service = DryRunClassifier::new();
        let response = service.send("prompt").unwrap();
        assert_eq!(service.prompts(), vec!["prompt".to_string()]);

        let report = ClassificationReport::parse(&response);
        assert_eq!(report.emotion, "neutral");
        assert!(report.description.contains("6 bytes"));
    }

    #[test]
    fn test_empty_command_line_rejected() {
        assert!(matches!(
            CommandClassifier::from_command_line("   "),
            Err(ClassifierError::Unavailable { .. })
        ));
    }

    #[test]
    fn test_missing_program_is_unavailable() {
        let service = CommandClassifier::new("definitely-not-a-real-classifier-binary", Vec::new());
        assert!(matches!(
            service.send("x"),
            Err(ClassifierError::Unavailable { .. })
        ));
    }

    #[cfg(unix)]
    #[test]
    fn test_command_round_trip() {
        let service = CommandClassifier::from_command_line("cat").unwrap();
        assert_eq!(service.program(), "cat");
        assert_eq!(service.send(" hello \n").unwrap(), "hello");
    }

    #[cfg(unix)]
    #[test]
    fn test_command_echoes_prompt_larger_than_pipe() {
        let service = CommandClassifier::from_command_line("cat").unwrap();
        let prompt = "feature line 0.123456\n".repeat(64 * 1024);
        let response = service.send(&prompt).unwrap();
        assert_eq!(response.len(), prompt.trim().len());
    }

    #[cfg(unix)]
    #[test]
    fn test_command_failure_is_transport_error() {
        let service = CommandClassifier::from_command_line("false").unwrap();
        assert!(matches!(
            service.send("x"),
            Err(ClassifierError::Transport { .. })
        ));
    }

    #[cfg(unix)]
    #[test]
    fn test_empty_output_is_empty_response() {
        let service = CommandClassifier::from_command_line("true").unwrap();
        assert_eq!(service.send("x"), Err(ClassifierError::EmptyResponse));
    }
}
