//! Doctor command - verify system requirements and configuration.

use crate::cli::Output;
use crate::config::Settings;
use crate::transcription::API_KEY_ENV;
use console::style;
use std::path::Path;
use std::process::Command;

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
pub fn run_doctor(config_path: &Path, settings: &Settings) -> anyhow::Result<()> {
    Output::header("Earshot Doctor");
    println!();
    println!("Checking system requirements and configuration...\n");

    let mut checks = Vec::new();

    // Check external tools
    println!("{}", style("External Tools").bold());
    let tool_checks = vec![
        check_tool("ffmpeg", "ffmpeg -version", install_hint_ffmpeg(), settings.import.dump_meta),
        check_tool("ffprobe", "ffprobe -version", install_hint_ffmpeg(), settings.import.dump_meta),
    ];
    for check in &tool_checks {
        check.print();
    }
    checks.extend(tool_checks);

    println!();

    // Check API keys
    println!("{}", style("Transcription").bold());
    let api_check = check_api_key(settings);
    api_check.print();
    checks.push(api_check);

    println!();

    // Check directories
    println!("{}", style("Directories").bold());
    let dir_checks = check_directories(settings);
    for check in &dir_checks {
        check.print();
    }
    checks.extend(dir_checks);

    println!();

    // Check configuration
    println!("{}", style("Configuration").bold());
    let config_check = check_config_file(config_path);
    config_check.print();
    checks.push(config_check);

    println!();

    // Summary
    let errors = checks.iter().filter(|c| c.status == CheckStatus::Error).count();
    let warnings = checks.iter().filter(|c| c.status == CheckStatus::Warning).count();

    if errors > 0 {
        Output::error(&format!(
            "{} error(s) found. Please fix them before importing.",
            errors
        ));
        std::process::exit(1);
    } else if warnings > 0 {
        Output::warning(&format!(
            "All checks passed with {} warning(s).",
            warnings
        ));
    } else {
        Output::success("All checks passed! Earshot is ready to use.");
    }

    Ok(())
}

/// Check if an external tool is available. A missing tool is only an error
/// when the current configuration needs it.
fn check_tool(name: &str, version_cmd: &str, hint: &str, required: bool) -> CheckResult {
    let parts: Vec<&str> = version_cmd.split_whitespace().collect();
    let cmd = parts[0];
    let args = &parts[1..];

    let missing = |message: &str| {
        if required {
            CheckResult::error(name, message, hint)
        } else {
            CheckResult::warning(name, message, hint)
        }
    };

    match Command::new(cmd).args(args).output() {
        Ok(output) if output.status.success() => {
            // Try to extract version from first line
            let version = String::from_utf8_lossy(&output.stdout)
                .lines()
                .next()
                .unwrap_or("installed")
                .trim()
                .to_string();

            CheckResult::ok(name, &truncate(&version, 50))
        }
        Ok(_) => missing("installed but not working"),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => missing("not found"),
        Err(e) => missing(&format!("error: {}", e)),
    }
}

/// Check the AssemblyAI key, from the config file or the environment.
fn check_api_key(settings: &Settings) -> CheckResult {
    let name = "AssemblyAI key";
    let hint = format!("Set transcription.api_key or export {}='...'", API_KEY_ENV);

    let configured = settings
        .transcription
        .api_key
        .clone()
        .filter(|k| !k.trim().is_empty())
        .map(|k| (k, "config"))
        .or_else(|| {
            std::env::var(API_KEY_ENV)
                .ok()
                .filter(|k| !k.trim().is_empty())
                .map(|k| (k, API_KEY_ENV))
        });

    match configured {
        Some((key, from)) => CheckResult::ok(name, &format!("configured via {} ({})", from, mask(&key))),
        None if settings.import.transcribe_missing => {
            CheckResult::error(name, "not set but import.transcribe_missing is on", &hint)
        }
        None => CheckResult::warning(name, "not set (only needed for transcription)", &hint),
    }
}

/// Check data directories.
fn check_directories(settings: &Settings) -> Vec<CheckResult> {
    let mut results = Vec::new();

    match settings.media_dir() {
        Ok(dir) => results.push(CheckResult::ok("Media directory", &format!("{}", dir.display()))),
        Err(e) => results.push(CheckResult::error(
            "Media directory",
            &e.to_string(),
            "Set import.media_dir in the config file, or pass --media-dir to import",
        )),
    }

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

    let db_path = settings.sqlite_path();
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
            "Database will be created on first import",
        ));
    }

    let index_path = settings.index_path();
    if index_path.join("meta.json").exists() {
        results.push(CheckResult::ok("Search index", &format!("{}", index_path.display())));
    } else {
        results.push(CheckResult::warning(
            "Search index",
            &format!("{} (not created yet)", index_path.display()),
            "Index will be created on first import",
        ));
    }

    results
}

/// Check if config file exists.
fn check_config_file(config_path: &Path) -> CheckResult {
    if config_path.exists() {
        CheckResult::ok("Config file", &format!("{}", config_path.display()))
    } else {
        CheckResult::warning(
            "Config file",
            "using defaults",
            "Create with: earshot config init",
        )
    }
}

/// Show only the first and last few characters of a secret.
fn mask(key: &str) -> String {
    let chars: Vec<char> = key.chars().collect();
    if chars.len() <= 8 {
        return "****".to_string();
    }
    let head: String = chars[..4].iter().collect();
    let tail: String = chars[chars.len() - 4..].iter().collect();
    format!("{}...{}", head, tail)
}

fn truncate(s: &str, max_chars: usize) -> String {
    if s.chars().count() > max_chars {
        format!("{}...", s.chars().take(max_chars).collect::<String>())
    } else {
        s.to_string()
    }
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

/// Platform-specific install hint for ffmpeg.
fn install_hint_ffmpeg() -> &'static str {
    if cfg!(target_os = "macos") {
        "Install with: brew install ffmpeg"
    } else if cfg!(target_os = "linux") {
        "Install with: sudo apt install ffmpeg (or your package manager)"
    } else {
        "Install from: https://ffmpeg.org/download.html"
    }
}
