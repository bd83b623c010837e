use std::process::{Command, Stdio};

/// Default external command used by the model-based background remover.
pub const DEFAULT_MODEL_COMMAND: &str = "rembg";

/// Optional external tools, probed once when a pipeline is constructed.
///
/// Components receive this value instead of checking `PATH` on their own.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Capabilities {
    /// The background-removal model command answered `--help`.
    pub model_remover: bool,
    /// `ffmpeg` is on `PATH`.
    pub ffmpeg: bool,
    /// `ffprobe` is on `PATH`.
    pub ffprobe: bool,
}

impl Capabilities {
    /// Probe `PATH` for the default model command and ffmpeg tools.
    pub fn probe() -> Self {
        Self::probe_with_model(DEFAULT_MODEL_COMMAND)
    }

    pub fn probe_with_model(model_command: &str) -> Self {
        Self::probe_for(Some(model_command))
    }

    /// Probe ffmpeg tools, and the model command only when one is given.
    pub fn probe_for(model_command: Option<&str>) -> Self {
        let caps = Self {
            model_remover: model_command.is_some_and(|cmd| command_answers(cmd, "--help")),
            ffmpeg: command_answers("ffmpeg", "-version"),
            ffprobe: command_answers("ffprobe", "-version"),
        };
        tracing::debug!(?caps, ?model_command, "probed capabilities");
        caps
    }

    /// No optional tools; the pure in-process paths only.
    pub fn none() -> Self {
        Self::default()
    }

    /// Video sources need both ffmpeg and ffprobe.
    pub fn video_decode(&self) -> bool {
        self.ffmpeg && self.ffprobe
    }
}

fn command_answers(program: &str, arg: &str) -> bool {
    Command::new(program)
        .arg(arg)
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .map(|s| s.success())
        .unwrap_or(false)
}
