//! CLI output formatting utilities.

use crate::dialogue::DialogueLine;
use crate::search::DialogDocument;
use crate::subtitle::format_srt_timestamp;
use console::style;
use indicatif::{ProgressBar, ProgressStyle};
use std::time::Duration;

/// Output helper for CLI formatting.
pub struct Output;

impl Output {
    /// Print an info message.
    pub fn info(msg: &str) {
        println!("{} {}", style(">>").cyan().bold(), msg);
    }

    /// Print a success message.
    pub fn success(msg: &str) {
        println!("{} {}", style(">>").green().bold(), msg);
    }

    /// Print a warning message.
    pub fn warning(msg: &str) {
        eprintln!("{} {}", style(">>").yellow().bold(), msg);
    }

    /// Print an error message.
    pub fn error(msg: &str) {
        eprintln!("{} {}", style(">>").red().bold(), msg);
    }

    /// Print a header.
    pub fn header(msg: &str) {
        println!("\n{}", style(msg).bold().underlined());
    }

    /// Print a key-value pair.
    pub fn kv(key: &str, value: &str) {
        println!("  {}: {}", style(key).dim(), value);
    }

    /// Print a list item.
    pub fn list_item(msg: &str) {
        println!("  {} {}", style("*").cyan(), msg);
    }

    /// Print one search hit.
    pub fn search_result(doc: &DialogDocument) {
        println!(
            "\n{} {} #{} @ {}",
            style(">>").green(),
            style(&doc.media_id).bold(),
            doc.pos,
            style(timestamp_range(doc.start(), doc.end())).cyan(),
        );
        println!("   {}", content_preview(&doc.content, 200));
        println!("   {}", style(&doc.media_file_name).dim());
    }

    /// Print one dialogue line. Context lines are dimmed.
    pub fn dialogue_line(line: &DialogueLine, is_context: bool) {
        let pos = format!("{:>5}", line.pos);
        let time = timestamp_range(line.start_timestamp, line.end_timestamp);
        let content = line.content.replace('\n', " ");
        if is_context {
            println!("{} {} {}", style(pos).dim(), style(time).dim(), style(content).dim());
        } else {
            println!("{} {} {}", style(pos).bold(), style(time).cyan(), content);
        }
    }

    /// Create a spinner.
    pub fn spinner(msg: &str) -> ProgressBar {
        let pb = ProgressBar::new_spinner();
        pb.set_style(ProgressStyle::with_template("{spinner:.green} {msg}").unwrap_or_else(|_| ProgressStyle::default_spinner()));
        pb.set_message(msg.to_string());
        pb.enable_steady_tick(Duration::from_millis(100));
        pb
    }
}

/// `00:00:01,000 - 00:00:02,500`
fn timestamp_range(start: Duration, end: Duration) -> String {
    format!("{} - {}", format_srt_timestamp(start), format_srt_timestamp(end))
}

/// Truncate content with ellipsis, on a character boundary.
fn content_preview(content: &str, max_chars: usize) -> String {
    let content = content.replace('\n', " ");
    if content.chars().count() <= max_chars {
        content
    } else {
        let cut: String = content.chars().take(max_chars).collect();
        format!("{}...", cut)
    }
}
