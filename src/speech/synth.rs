//! Text-to-speech via the operating system's speech tool.
//!
//! Shells out to `say` on macOS, `espeak-ng` on Linux, and PowerShell's
//! System.Speech on Windows. Voice listings are parsed into a common
//! shape so the same English-voice heuristic applies everywhere.

use crate::config::SpeechSettings;
use crate::error::{Result, SvarError};
use std::process::Stdio;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::{debug, instrument};

/// The speech tool invoked on this platform.
#[cfg(target_os = "macos")]
pub const SPEECH_TOOL: &str = "say";
#[cfg(target_os = "windows")]
pub const SPEECH_TOOL: &str = "powershell";
#[cfg(not(any(target_os = "macos", target_os = "windows")))]
pub const SPEECH_TOOL: &str = "espeak-ng";

const LIST_VOICES_SCRIPT: &str = "Add-Type -AssemblyName System.Speech; \
    $synth = New-Object System.Speech.Synthesis.SpeechSynthesizer; \
    $synth.GetInstalledVoices() | ForEach-Object { $_.VoiceInfo.Id + '|' + $_.VoiceInfo.Name }";

/// Substrings that mark a voice as English. Checked against both the
/// voice name and its identifier, case-insensitively.
pub const ENGLISH_VOICE_HINTS: &[&str] =
    &["english", "zira", "david", "mark", "hazel", "en-us", "en_us"];

/// A voice installed on the system.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VoiceInfo {
    /// Platform identifier, passed back to the tool to select the voice.
    pub id: String,
    /// Human-readable name.
    pub name: String,
}

/// Whether a voice matches any of the English hints.
pub fn is_english_voice(voice: &VoiceInfo) -> bool {
    let name = voice.name.to_lowercase();
    let id = voice.id.to_lowercase();
    ENGLISH_VOICE_HINTS
        .iter()
        .any(|hint| name.contains(hint) || id.contains(hint))
}

/// Pick the voice to speak with: the first English-matching voice, else
/// the first voice at all, else none.
pub fn select_voice(voices: &[VoiceInfo]) -> Option<&VoiceInfo> {
    voices
        .iter()
        .find(|v| is_english_voice(v))
        .or_else(|| voices.first())
}

/// List the voices installed on this system.
pub async fn list_voices() -> Result<Vec<VoiceInfo>> {
    let result = voices_command()
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .output()
        .await;

    let output = match result {
        Ok(o) => o,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Err(SvarError::ToolNotFound(SPEECH_TOOL.into()));
        }
        Err(e) => {
            return Err(SvarError::Speech(format!(
                "{SPEECH_TOOL} execution failed: {e}"
            )));
        }
    };

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(SvarError::Speech(format!(
            "{SPEECH_TOOL} failed to list voices: {stderr}"
        )));
    }

    let stdout = String::from_utf8_lossy(&output.stdout);
    Ok(parse_voice_listing(&stdout))
}

fn voices_command() -> Command {
    let mut cmd = Command::new(SPEECH_TOOL);
    if cfg!(target_os = "macos") {
        cmd.arg("-v").arg("?");
    } else if cfg!(target_os = "windows") {
        cmd.arg("-NoProfile").arg("-Command").arg(LIST_VOICES_SCRIPT);
    } else {
        cmd.arg("--voices");
    }
    cmd
}

fn parse_voice_listing(output: &str) -> Vec<VoiceInfo> {
    if cfg!(target_os = "macos") {
        parse_say_voices(output)
    } else if cfg!(target_os = "windows") {
        parse_powershell_voices(output)
    } else {
        parse_espeak_voices(output)
    }
}

/// Parse `espeak-ng --voices` output.
///
/// Columns are `Pty Language Age/Gender VoiceName File Other`; the voice
/// name may contain spaces, so everything between the age/gender column
/// and the first path-like token is taken as the name.
fn parse_espeak_voices(output: &str) -> Vec<VoiceInfo> {
    let mut voices = Vec::new();
    for line in output.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with("Pty") {
            continue;
        }
        let tokens: Vec<&str> = line.split_whitespace().collect();
        if tokens.len() < 4 {
            continue;
        }

        let language = tokens[1];
        let file_idx = tokens[3..]
            .iter()
            .position(|t| t.contains('/'))
            .map(|i| i + 3)
            .unwrap_or(tokens.len());
        let name = tokens[3..file_idx].join(" ");
        if name.is_empty() {
            continue;
        }

        voices.push(VoiceInfo {
            id: language.to_string(),
            name,
        });
    }
    voices
}

/// Parse `say -v ?` output: `Name  locale  # sample sentence`.
fn parse_say_voices(output: &str) -> Vec<VoiceInfo> {
    let mut voices = Vec::new();
    for line in output.lines() {
        let head = line.split('#').next().unwrap_or("").trim_end();
        let Some((name_part, locale)) = head.rsplit_once(char::is_whitespace) else {
            continue;
        };
        let name = name_part.trim();
        if name.is_empty() || locale.is_empty() {
            continue;
        }
        voices.push(VoiceInfo {
            id: locale.to_string(),
            name: name.to_string(),
        });
    }
    voices
}

/// Parse the `Id|Name` lines emitted by the PowerShell listing script.
fn parse_powershell_voices(output: &str) -> Vec<VoiceInfo> {
    let mut voices = Vec::new();
    for line in output.lines() {
        let Some((id, name)) = line.trim().split_once('|') else {
            continue;
        };
        if id.is_empty() || name.is_empty() {
            continue;
        }
        voices.push(VoiceInfo {
            id: id.to_string(),
            name: name.to_string(),
        });
    }
    voices
}

/// Speaks text aloud through the platform speech tool.
pub struct Speaker {
    voice: Option<VoiceInfo>,
    rate_wpm: u32,
    volume: f32,
}

impl Speaker {
    pub fn new(voice: Option<VoiceInfo>, rate_wpm: u32, volume: f32) -> Self {
        Self {
            voice,
            rate_wpm,
            volume,
        }
    }

    /// Build a speaker from settings: an explicitly configured voice is
    /// matched against the installed list (or used verbatim), otherwise
    /// the English-voice heuristic picks one.
    pub async fn from_settings(settings: &SpeechSettings) -> Result<Self> {
        let voices = list_voices().await?;
        debug!("Found {} installed voices", voices.len());

        let voice = if settings.voice.is_empty() {
            select_voice(&voices).cloned()
        } else {
            voices
                .iter()
                .find(|v| {
                    v.name.eq_ignore_ascii_case(&settings.voice)
                        || v.id.eq_ignore_ascii_case(&settings.voice)
                })
                .cloned()
                .or_else(|| {
                    Some(VoiceInfo {
                        id: settings.voice.clone(),
                        name: settings.voice.clone(),
                    })
                })
        };

        Ok(Self::new(voice, settings.rate_wpm, settings.volume))
    }

    /// The selected voice, if any.
    pub fn voice(&self) -> Option<&VoiceInfo> {
        self.voice.as_ref()
    }

    /// Human-readable line describing the selected voice, or `None` when
    /// no voices are installed.
    pub fn voice_announcement(&self) -> Option<String> {
        self.voice.as_ref().map(|v| {
            if is_english_voice(v) {
                format!("Using English voice: {}", v.name)
            } else {
                format!("Using default voice: {}", v.name)
            }
        })
    }

    /// Speak the text and return once playback has finished.
    ///
    /// The text goes in over stdin so it never needs shell quoting.
    #[instrument(skip(self, text), fields(chars = text.len()))]
    pub async fn speak(&self, text: &str) -> Result<()> {
        let mut command = self.speak_command();
        command
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::piped());

        let mut child = match command.spawn() {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(SvarError::ToolNotFound(SPEECH_TOOL.into()));
            }
            Err(e) => {
                return Err(SvarError::Speech(format!(
                    "{SPEECH_TOOL} execution failed: {e}"
                )));
            }
        };

        if let Some(mut stdin) = child.stdin.take() {
            stdin
                .write_all(text.as_bytes())
                .await
                .map_err(|e| SvarError::Speech(format!("Failed to send text: {e}")))?;
            stdin
                .shutdown()
                .await
                .map_err(|e| SvarError::Speech(format!("Failed to send text: {e}")))?;
        }

        let output = child
            .wait_with_output()
            .await
            .map_err(|e| SvarError::Speech(format!("{SPEECH_TOOL} did not finish: {e}")))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(SvarError::Speech(format!(
                "{SPEECH_TOOL} exited with {}: {}",
                output.status,
                stderr.trim()
            )));
        }

        Ok(())
    }

    fn speak_command(&self) -> Command {
        let mut cmd = Command::new(SPEECH_TOOL);
        if cfg!(target_os = "macos") {
            // `say` has no volume flag; rate maps directly to words per minute.
            if let Some(voice) = &self.voice {
                cmd.arg("-v").arg(&voice.name);
            }
            cmd.arg("-r").arg(self.rate_wpm.to_string());
        } else if cfg!(target_os = "windows") {
            cmd.arg("-NoProfile")
                .arg("-Command")
                .arg(self.powershell_script());
        } else {
            if let Some(voice) = &self.voice {
                cmd.arg("-v").arg(&voice.id);
            }
            let amplitude = (self.volume.clamp(0.0, 1.0) * 100.0).round() as u32;
            cmd.arg("-s")
                .arg(self.rate_wpm.to_string())
                .arg("-a")
                .arg(amplitude.to_string())
                .arg("--stdin");
        }
        cmd
    }

    /// System.Speech rates run -10..10 around a 200 wpm center; volume
    /// runs 0..100.
    fn powershell_script(&self) -> String {
        let mut parts = vec![
            "Add-Type -AssemblyName System.Speech".to_string(),
            "$synth = New-Object System.Speech.Synthesis.SpeechSynthesizer".to_string(),
        ];
        if let Some(voice) = &self.voice {
            parts.push(format!(
                "$synth.SelectVoice('{}')",
                voice.name.replace('\'', "''")
            ));
        }
        let rate = ((self.rate_wpm as i32 - 200) / 25).clamp(-10, 10);
        let volume = (self.volume.clamp(0.0, 1.0) * 100.0).round() as u32;
        parts.push(format!("$synth.Rate = {rate}"));
        parts.push(format!("$synth.Volume = {volume}"));
        parts.push("$synth.Speak([Console]::In.ReadToEnd())".to_string());
        parts.join("; ")
    }
}
