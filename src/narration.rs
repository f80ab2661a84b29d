use std::process::{Child, Command, Stdio};

/// Speaks short game messages. Best effort: failures are logged and dropped.
pub trait Narrator: Send {
    fn speak(&mut self, text: &str);
    fn cancel(&mut self);
}

/// Narrator used when no speech program is configured
#[derive(Debug, Default)]
pub struct SilentNarrator;

impl Narrator for SilentNarrator {
    fn speak(&mut self, text: &str) {
        tracing::debug!(text, "narration disabled");
    }

    fn cancel(&mut self) {}
}

/// Runs an external text-to-speech program (`say`, `espeak`, ...) with the
/// text as its last argument. Only one utterance plays at a time.
#[derive(Debug)]
pub struct CommandNarrator {
    program: String,
    args: Vec<String>,
    current: Option<Child>,
}

impl CommandNarrator {
    pub fn new(program: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            args,
            current: None,
        }
    }

    /// Splits a configured command line such as `"espeak -s 150"`
    pub fn from_command_line(line: &str) -> Option<Self> {
        let mut parts = line.split_whitespace().map(str::to_string);
        let program = parts.next()?;
        Some(Self::new(program, parts.collect()))
    }
}

impl Narrator for CommandNarrator {
    fn speak(&mut self, text: &str) {
        self.cancel();
        let spawned = Command::new(&self.program)
            .args(&self.args)
            .arg(text)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn();
        match spawned {
            Ok(child) => self.current = Some(child),
            Err(err) => tracing::warn!(program = %self.program, %err, "narration failed"),
        }
    }

    fn cancel(&mut self) {
        if let Some(mut child) = self.current.take() {
            // already exited is fine
            let _ = child.kill();
            let _ = child.wait();
        }
    }
}

impl Drop for CommandNarrator {
    fn drop(&mut self) {
        self.cancel();
    }
}
