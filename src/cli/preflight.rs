//! Pre-flight checks before expensive operations.
//!
//! Validates that required tools and configuration are available
//! before starting operations that would otherwise fail midway.

use crate::config::Settings;
use crate::error::{EarshotError, Result};
use crate::transcription::{is_api_key_configured, API_KEY_ENV};
use std::process::Command;

/// Requirements for different operations.
#[derive(Debug, Clone, Copy)]
pub enum Operation {
    /// Import needs ffprobe/ffmpeg for metadata dumps and an API key when
    /// missing subtitles are transcribed.
    Import,
    /// Transcription requires an API key.
    Transcribe,
    /// Metadata dumps require ffprobe and ffmpeg.
    Meta,
    /// Search and dialog lookups only need the local stores.
    Search,
}

/// Run pre-flight checks for the given operation.
///
/// Returns Ok(()) if all checks pass, or an error describing what's missing.
pub fn check(operation: Operation, settings: &Settings) -> Result<()> {
    match operation {
        Operation::Import => {
            if settings.import.transcribe_missing {
                check_api_key(settings)?;
            }
            if settings.import.dump_meta {
                check_tool("ffprobe")?;
                check_tool("ffmpeg")?;
            }
        }
        Operation::Transcribe => {
            check_api_key(settings)?;
        }
        Operation::Meta => {
            check_tool("ffprobe")?;
            check_tool("ffmpeg")?;
        }
        Operation::Search => {
            // No external requirements for search
        }
    }
    Ok(())
}

/// Check that an AssemblyAI key is in the config or the environment.
fn check_api_key(settings: &Settings) -> Result<()> {
    let in_config = settings
        .transcription
        .api_key
        .as_deref()
        .is_some_and(|k| !k.trim().is_empty());

    if in_config || is_api_key_configured() {
        Ok(())
    } else {
        Err(EarshotError::Config(format!(
            "No AssemblyAI API key. Set transcription.api_key or export {}='...'",
            API_KEY_ENV
        )))
    }
}

/// Check if an external tool is available.
fn check_tool(name: &str) -> Result<()> {
    match Command::new(name).arg("-version").output() {
        Ok(output) if output.status.success() => Ok(()),
        Ok(_) => Err(EarshotError::ToolNotFound(format!(
            "{} is installed but not working correctly",
            name
        ))),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            Err(EarshotError::ToolNotFound(name.to_string()))
        }
        Err(e) => Err(EarshotError::ToolNotFound(format!("{}: {}", name, e))),
    }
}
