//! SubRip parsing.

use super::SrtCue;
use crate::error::{EarshotError, Result};
use regex::{Captures, Regex};
use std::path::Path;
use std::time::Duration;

/// Parser for `.srt` files.
///
/// Accepts a leading BOM, CRLF line endings, either `,` or `.` as the
/// millisecond separator and cues without a sequence number (numbered
/// from the previous cue).
pub struct SrtParser {
    timing: Regex,
}

impl SrtParser {
    pub fn new() -> Self {
        Self {
            timing: Regex::new(
                r"^\s*(\d+):(\d{1,2}):(\d{1,2})[,.](\d{1,3})\s*-->\s*(\d+):(\d{1,2}):(\d{1,2})[,.](\d{1,3})",
            )
            .expect("static SRT timing pattern"),
        }
    }

    /// Read and parse a subtitle file.
    pub async fn parse_file(&self, path: &Path) -> Result<Vec<SrtCue>> {
        let content = match tokio::fs::read_to_string(path).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::InvalidData => {
                return Err(EarshotError::malformed(path, "not valid UTF-8"));
            }
            Err(e) => return Err(e.into()),
        };
        self.parse(&content)
            .map_err(|reason| EarshotError::malformed(path, reason))
    }

    /// Parse SubRip content into cues, in file order.
    pub fn parse(&self, content: &str) -> std::result::Result<Vec<SrtCue>, String> {
        let content = content.trim_start_matches('\u{feff}').replace("\r\n", "\n");

        let mut cues: Vec<SrtCue> = Vec::new();
        let mut block: Vec<&str> = Vec::new();

        for line in content.lines().chain(std::iter::once("")) {
            if line.trim().is_empty() {
                if !block.is_empty() {
                    let previous = cues.last().map(|c| c.index);
                    cues.push(self.parse_block(&block, previous)?);
                    block.clear();
                }
                continue;
            }
            block.push(line.trim_end());
        }

        Ok(cues)
    }

    fn parse_block(&self, block: &[&str], previous: Option<i32>) -> std::result::Result<SrtCue, String> {
        let (index, rest) = match block[0].trim().parse::<i32>() {
            Ok(index) => (index, &block[1..]),
            Err(_) if self.timing.is_match(block[0]) => {
                let index = match previous {
                    Some(p) => p
                        .checked_add(1)
                        .ok_or_else(|| format!("cue after {} has no number to continue from", p))?,
                    None => 1,
                };
                (index, block)
            }
            Err(_) => return Err(format!("expected cue number, found '{}'", block[0].trim())),
        };

        let timing_line = rest
            .first()
            .ok_or_else(|| format!("cue {} has no timing line", index))?;
        let caps = self
            .timing
            .captures(timing_line)
            .ok_or_else(|| format!("cue {} has an invalid timing line '{}'", index, timing_line.trim()))?;

        let start = timestamp(&caps, 1)?;
        let end = timestamp(&caps, 5)?;
        if end < start {
            return Err(format!("cue {} ends before it starts", index));
        }

        Ok(SrtCue::new(index, start, end, rest[1..].join("\n")))
    }
}

impl Default for SrtParser {
    fn default() -> Self {
        Self::new()
    }
}

/// Read an `h:m:s,ms` group starting at capture `first`.
fn timestamp(caps: &Captures<'_>, first: usize) -> std::result::Result<Duration, String> {
    let num = |i: usize| -> std::result::Result<u64, String> {
        caps[first + i]
            .parse::<u64>()
            .map_err(|e| format!("invalid timestamp component '{}': {}", &caps[first + i], e))
    };
    let fraction = &caps[first + 3];
    // "5" is half a second, not five milliseconds
    let ms = num(3)? * 10u64.pow(3 - fraction.len() as u32);

    // minutes and seconds are at most two digits; only the hours can overflow
    let rest = num(1)? * 60_000 + num(2)? * 1000 + ms;

    num(0)?
        .checked_mul(3_600_000)
        .and_then(|h| h.checked_add(rest))
        .map(Duration::from_millis)
        .ok_or_else(|| format!("timestamp '{}' is out of range", caps[0].trim()))
}
