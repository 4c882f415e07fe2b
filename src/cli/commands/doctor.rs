//! Doctor command - verify system requirements and configuration.

use crate::cli::Output;
use crate::config::Settings;
use crate::ollama::OllamaClient;
use crate::speech;
use console::style;
use std::process::Command;
use std::time::Duration;

const OLLAMA_HINT: &str = "Start it with: ollama serve (install from https://ollama.com)";
const WHISPER_HINT: &str =
    "Voice input needs a Whisper-compatible server at speech.stt_base_url";

/// Check result for a single item.
#[derive(Debug)]
pub struct CheckResult {
    pub name: String,
    pub status: CheckStatus,
    pub message: String,
    pub hint: Option<String>,
}

#[derive(Debug, PartialEq)]
pub enum CheckStatus {
    Ok,
    Warning,
    Error,
}

impl CheckResult {
    fn ok(name: &str, message: &str) -> Self {
        Self {
            name: name.to_string(),
            status: CheckStatus::Ok,
            message: message.to_string(),
            hint: None,
        }
    }

    fn warning(name: &str, message: &str, hint: &str) -> Self {
        Self {
            name: name.to_string(),
            status: CheckStatus::Warning,
            message: message.to_string(),
            hint: Some(hint.to_string()),
        }
    }

    fn error(name: &str, message: &str, hint: &str) -> Self {
        Self {
            name: name.to_string(),
            status: CheckStatus::Error,
            message: message.to_string(),
            hint: Some(hint.to_string()),
        }
    }

    fn print(&self) {
        let icon = match self.status {
            CheckStatus::Ok => style("✓").green(),
            CheckStatus::Warning => style("!").yellow(),
            CheckStatus::Error => style("✗").red(),
        };

        println!("  {} {} - {}", icon, style(&self.name).bold(), self.message);

        if let Some(hint) = &self.hint {
            println!("    {} {}", style("→").dim(), style(hint).dim());
        }
    }
}

/// Run all diagnostic checks.
pub async fn run_doctor(settings: &Settings) -> anyhow::Result<()> {
    Output::header("Svar Doctor");
    println!();
    println!("Checking system requirements and configuration...\n");

    let mut checks = Vec::new();

    println!("{}", style("Local Services").bold());
    let service_checks = check_local_services(settings).await;
    for check in &service_checks {
        check.print();
    }
    checks.extend(service_checks);

    println!();

    println!("{}", style("Speech").bold());
    let speech_checks = check_speech().await;
    for check in &speech_checks {
        check.print();
    }
    checks.extend(speech_checks);

    println!();

    println!("{}", style("Directories").bold());
    let dir_checks = check_directories(settings);
    for check in &dir_checks {
        check.print();
    }
    checks.extend(dir_checks);

    println!();

    println!("{}", style("Configuration").bold());
    let config_check = check_config_file();
    config_check.print();
    checks.push(config_check);

    println!();

    // Summary
    let errors = checks.iter().filter(|c| c.status == CheckStatus::Error).count();
    let warnings = checks.iter().filter(|c| c.status == CheckStatus::Warning).count();

    if errors > 0 {
        Output::error(&format!(
            "{} error(s) found. Please fix them before using Svar.",
            errors
        ));
        std::process::exit(1);
    } else if warnings > 0 {
        Output::warning(&format!("All checks passed with {} warning(s).", warnings));
    } else {
        Output::success("All checks passed! Svar is ready to use.");
    }

    Ok(())
}

/// Check Ollama, its models, and the transcription server.
async fn check_local_services(settings: &Settings) -> Vec<CheckResult> {
    let mut results = Vec::new();

    match OllamaClient::with_timeout(&settings.ollama.base_url, Duration::from_secs(5)) {
        Ok(client) => match client.list_models().await {
            Ok(models) => {
                results.push(CheckResult::ok(
                    "Ollama",
                    &format!(
                        "reachable at {} ({} models)",
                        settings.ollama.base_url,
                        models.len()
                    ),
                ));

                for (label, model) in [
                    ("LLM model", &settings.llm.model),
                    ("Embedding model", &settings.embedding.model),
                ] {
                    if has_model(&models, model) {
                        results.push(CheckResult::ok(label, model));
                    } else {
                        results.push(CheckResult::warning(
                            label,
                            &format!("{} not pulled", model),
                            &format!("Pull it with: ollama pull {}", model),
                        ));
                    }
                }
            }
            Err(_) => {
                results.push(CheckResult::error(
                    "Ollama",
                    &format!("not reachable at {}", settings.ollama.base_url),
                    OLLAMA_HINT,
                ));
            }
        },
        Err(e) => {
            results.push(CheckResult::error(
                "Ollama",
                &format!("client error: {}", e),
                OLLAMA_HINT,
            ));
        }
    }

    results.push(check_whisper_server(settings).await);
    results
}

/// Check the transcription server without failing the doctor run; typed
/// queries work without it.
async fn check_whisper_server(settings: &Settings) -> CheckResult {
    let base = settings.speech.stt_base_url.trim_end_matches('/');
    let url = format!("{}/models", base);

    let client = match reqwest::Client::builder()
        .timeout(Duration::from_secs(5))
        .build()
    {
        Ok(c) => c,
        Err(e) => {
            return CheckResult::warning(
                "Whisper server",
                &format!("client error: {}", e),
                WHISPER_HINT,
            )
        }
    };

    match client.get(&url).send().await {
        Ok(resp) if resp.status().is_success() => {
            CheckResult::ok("Whisper server", &format!("reachable at {}", base))
        }
        Ok(resp) => CheckResult::warning(
            "Whisper server",
            &format!("responded with {}", resp.status()),
            WHISPER_HINT,
        ),
        Err(_) => CheckResult::warning(
            "Whisper server",
            "not reachable (voice input unavailable)",
            WHISPER_HINT,
        ),
    }
}

/// Check the speech tool, installed voices, and microphone.
async fn check_speech() -> Vec<CheckResult> {
    let mut results = Vec::new();

    results.push(check_tool(
        speech::SPEECH_TOOL,
        speech_tool_version_cmd(),
        install_hint_speech(),
    ));

    match speech::list_voices().await {
        Ok(voices) if voices.is_empty() => {
            results.push(CheckResult::warning(
                "Voices",
                "no voices installed",
                install_hint_speech(),
            ));
        }
        Ok(voices) => {
            let selected = speech::select_voice(&voices)
                .map(|v| v.name.clone())
                .unwrap_or_default();
            results.push(CheckResult::ok(
                "Voices",
                &format!("{} installed, would use {}", voices.len(), selected),
            ));
        }
        Err(e) => {
            results.push(CheckResult::warning(
                "Voices",
                &format!("could not list: {}", e),
                install_hint_speech(),
            ));
        }
    }

    let devices = speech::list_input_devices();
    if devices.is_empty() {
        results.push(CheckResult::warning(
            "Microphone",
            "no input devices found",
            "Voice input requires a microphone",
        ));
    } else {
        results.push(CheckResult::ok(
            "Microphone",
            &format!("{} input device(s)", devices.len()),
        ));
    }

    results
}

/// Check if an external tool is available.
fn check_tool(name: &str, version_cmd: &str, hint: &str) -> CheckResult {
    let parts: Vec<&str> = version_cmd.split_whitespace().collect();
    let cmd = parts[0];
    let args = &parts[1..];

    match Command::new(cmd).args(args).output() {
        Ok(output) if output.status.success() => {
            // Try to extract version from first line
            let version = String::from_utf8_lossy(&output.stdout)
                .lines()
                .next()
                .unwrap_or("installed")
                .trim()
                .to_string();

            // Truncate long version strings
            let version_display = if version.len() > 50 {
                format!("{}...", &version[..50])
            } else {
                version
            };

            CheckResult::ok(name, &version_display)
        }
        Ok(_) => CheckResult::error(name, "installed but not working", hint),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            CheckResult::error(name, "not found", hint)
        }
        Err(e) => CheckResult::error(name, &format!("error: {}", e), hint),
    }
}

/// Check data directories.
fn check_directories(settings: &Settings) -> Vec<CheckResult> {
    let mut results = Vec::new();

    let data_dir = settings.data_dir();
    if data_dir.exists() {
        results.push(CheckResult::ok(
            "Data directory",
            &format!("{}", data_dir.display()),
        ));
    } else {
        results.push(CheckResult::warning(
            "Data directory",
            &format!("{} (will be created)", data_dir.display()),
            "Directory will be created on first use",
        ));
    }

    let db_path = settings.database_path();
    if db_path.exists() {
        let size = std::fs::metadata(&db_path)
            .map(|m| format_size(m.len()))
            .unwrap_or_else(|_| "unknown size".to_string());
        results.push(CheckResult::ok(
            "Database",
            &format!("{} ({})", db_path.display(), size),
        ));
    } else {
        results.push(CheckResult::warning(
            "Database",
            &format!("{} (not created yet)", db_path.display()),
            "Database will be created on first ingest",
        ));
    }

    results
}

/// Check if config file exists.
fn check_config_file() -> CheckResult {
    let config_path = Settings::default_config_path();
    if config_path.exists() {
        CheckResult::ok("Config file", &format!("{}", config_path.display()))
    } else {
        CheckResult::warning(
            "Config file",
            "using defaults",
            "Create with: svar config edit",
        )
    }
}

/// Whether a model (with or without tag) appears in an Ollama tag list.
fn has_model(models: &[String], wanted: &str) -> bool {
    models
        .iter()
        .any(|m| m == wanted || m.split(':').next() == Some(wanted))
}

/// Format file size in human-readable format.
fn format_size(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;
    const GB: u64 = MB * 1024;

    if bytes >= GB {
        format!("{:.1} GB", bytes as f64 / GB as f64)
    } else if bytes >= MB {
        format!("{:.1} MB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.1} KB", bytes as f64 / KB as f64)
    } else {
        format!("{} B", bytes)
    }
}

/// Version probe for the platform speech tool.
fn speech_tool_version_cmd() -> &'static str {
    if cfg!(target_os = "macos") {
        "say -v ?"
    } else if cfg!(target_os = "windows") {
        "powershell -NoProfile -Command $PSVersionTable.PSVersion.ToString()"
    } else {
        "espeak-ng --version"
    }
}

/// Platform-specific install hint for the speech tool.
fn install_hint_speech() -> &'static str {
    if cfg!(target_os = "macos") {
        "The say command ships with macOS"
    } else if cfg!(target_os = "windows") {
        "PowerShell ships with Windows"
    } else {
        "Install with: sudo apt install espeak-ng (or your package manager)"
    }
}
