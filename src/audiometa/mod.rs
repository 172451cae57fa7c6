//! Media container inspection.
//!
//! Uses ffprobe to list streams and format tags, and ffmpeg to pull an
//! embedded cover image out to a sibling file.

use crate::error::{EarshotError, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;
use tracing::{debug, info, instrument};

/// Codecs that mark a video stream as cover art.
const COVER_CODECS: &[&str] = &["png", "mjpeg"];

/// Parsed `ffprobe -show_format -show_streams` output.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ProbeResult {
    pub streams: Vec<ProbeStream>,
    pub format: ProbeFormat,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ProbeStream {
    pub index: u32,
    pub codec_name: Option<String>,
    pub codec_type: Option<String>,
    pub disposition: BTreeMap<String, i64>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ProbeFormat {
    pub filename: String,
    pub format_name: Option<String>,
    /// Seconds, as ffprobe prints them.
    pub duration: Option<String>,
    pub tags: BTreeMap<String, String>,
}

impl ProbeResult {
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn duration(&self) -> Option<Duration> {
        self.format
            .duration
            .as_deref()
            .and_then(|d| d.trim().parse::<f64>().ok())
            .filter(|d| d.is_finite() && *d >= 0.0)
            .map(Duration::from_secs_f64)
    }

    /// Format tag lookup, ignoring case (`TITLE` and `title` both match).
    pub fn tag(&self, name: &str) -> Option<&str> {
        self.format
            .tags
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// The embedded picture stream, if any.
    pub fn cover_stream(&self) -> Option<&ProbeStream> {
        self.streams.iter().find(|s| s.is_cover())
    }
}

impl ProbeStream {
    pub fn is_cover(&self) -> bool {
        let is_video = self.codec_type.as_deref() == Some("video");
        let attached = self.disposition.get("attached_pic").copied().unwrap_or(0) == 1;
        let image_codec = self
            .codec_name
            .as_deref()
            .is_some_and(|c| COVER_CODECS.contains(&c));

        is_video && (attached || image_codec)
    }
}

/// Files written by [`dump_meta`].
#[derive(Debug, Clone)]
pub struct MetaDump {
    pub probe: ProbeResult,
    pub image_path: Option<PathBuf>,
    pub meta_path: PathBuf,
}

/// `<dir>/<stem><suffix>` next to `media_path`.
pub fn sibling_path(media_path: &Path, suffix: &str) -> PathBuf {
    let stem = media_path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    media_path.with_file_name(format!("{}{}", stem, suffix))
}

/// Inspect a media file with ffprobe.
#[instrument(fields(path = %path.display()))]
pub async fn probe(path: &Path) -> Result<ProbeResult> {
    let result = Command::new("ffprobe")
        .arg("-v").arg("quiet")
        .arg("-print_format").arg("json")
        .arg("-show_format")
        .arg("-show_streams")
        .arg(path)
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .output()
        .await;

    let output = match result {
        Ok(o) => o,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Err(EarshotError::ToolNotFound("ffprobe".into()));
        }
        Err(e) => return Err(EarshotError::Probe(format!("ffprobe execution failed: {e}"))),
    };

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(EarshotError::Probe(format!(
            "ffprobe failed for {}: {}",
            path.display(),
            stderr.trim()
        )));
    }

    let probe = ProbeResult::from_json(&String::from_utf8_lossy(&output.stdout))?;
    debug!("Probed {} streams", probe.streams.len());
    Ok(probe)
}

/// Remove `path` if it exists. Any failure other than absence is an error.
async fn remove_stale(path: &Path) -> Result<()> {
    match tokio::fs::remove_file(path).await {
        Ok(()) => {
            debug!("Removed stale {:?}", path);
            Ok(())
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e.into()),
    }
}

/// Extract stream `stream_index` of `media_path` as a single image at `out`,
/// replacing any existing file.
#[instrument(fields(media = %media_path.display(), out = %out.display()))]
pub async fn dump_image(media_path: &Path, stream_index: u32, out: &Path) -> Result<()> {
    remove_stale(out).await?;

    let result = Command::new("ffmpeg")
        .arg("-i").arg(media_path)
        .arg("-map").arg(format!("0:{}", stream_index))
        .arg("-frames:v").arg("1")
        .arg("-an")
        .arg("-y")
        .arg("-loglevel").arg("error")
        .arg(out)
        .stdout(Stdio::null())
        .stderr(Stdio::piped())
        .output()
        .await;

    match result {
        Ok(o) if o.status.success() => Ok(()),
        Ok(o) => {
            let err = String::from_utf8_lossy(&o.stderr);
            Err(EarshotError::ToolFailed(format!("ffmpeg image extraction failed: {}", err.trim())))
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            Err(EarshotError::ToolNotFound("ffmpeg".into()))
        }
        Err(e) => Err(EarshotError::ToolFailed(format!("ffmpeg error: {e}"))),
    }
}

/// Probe `media_path`, extract its cover to `<stem>.png` and write its
/// format tags to `<stem>.meta.json`.
#[instrument(fields(media = %media_path.display()))]
pub async fn dump_meta(media_path: &Path) -> Result<MetaDump> {
    let probe = probe(media_path).await?;

    let image_path = match probe.cover_stream() {
        Some(stream) => {
            let out = sibling_path(media_path, ".png");
            dump_image(media_path, stream.index, &out).await?;
            Some(out)
        }
        None => None,
    };

    let meta_path = sibling_path(media_path, ".meta.json");
    tokio::fs::write(&meta_path, serde_json::to_vec_pretty(&probe.format.tags)?).await?;

    info!(
        "Dumped metadata for {} (cover: {})",
        media_path.display(),
        image_path.is_some()
    );

    Ok(MetaDump {
        probe,
        image_path,
        meta_path,
    })
}
