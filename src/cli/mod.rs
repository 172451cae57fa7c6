//! CLI module for Earshot.

pub mod commands;
mod output;
pub mod preflight;

pub use output::Output;

use clap::{Parser, Subcommand};

/// Earshot - Dialogue search for episodic audio and video
///
/// Keeps a searchable, position-addressable index of every line spoken in a
/// directory of episodes, built from subtitles or from transcription.
#[derive(Parser, Debug)]
#[command(name = "earshot")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Increase verbosity (-v for info, -vv for debug, -vvv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Path to configuration file
    #[arg(short, long, global = true, env = "EARSHOT_CONFIG")]
    pub config: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Check system requirements and configuration
    Doctor,

    /// Import new and changed episodes from the media directory
    Import {
        /// Keep running and re-scan every poll interval
        #[arg(short, long)]
        watch: bool,

        /// Media directory (overrides import.media_dir)
        #[arg(short, long)]
        media_dir: Option<String>,
    },

    /// Search dialogue (e.g. `"pub quiz" publication:xfm series:>=2 offset:20`)
    Search {
        /// Search query
        query: String,

        /// Maximum number of results (defaults to index.default_limit)
        #[arg(short, long)]
        limit: Option<usize>,
    },

    /// Print a range of dialogue lines from one episode
    Dialog {
        /// Media ID, e.g. xfm-S01E02
        media_id: String,

        /// First position (inclusive)
        start: i32,

        /// Last position (inclusive)
        end: i32,

        /// Also show the line before and after the range
        #[arg(short = 'x', long)]
        context: bool,
    },

    /// List recorded source files and imported episodes
    Manifest,

    /// Transcribe a media file to SubRip without indexing it
    Transcribe {
        /// Path to an audio or video file
        media: String,

        /// Output file (defaults to <stem>.srt next to the media)
        #[arg(short, long)]
        output: Option<String>,
    },

    /// Inspect embedded media metadata
    Meta {
        #[command(subcommand)]
        action: MetaAction,
    },

    /// Manage configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand, Debug)]
pub enum MetaAction {
    /// Write cover art and tags next to a media file
    Dump {
        /// Path to an audio or video file
        media: String,
    },
}

#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Show current configuration
    Show,

    /// Write the current configuration to the config file
    Init {
        /// Overwrite an existing file
        #[arg(short, long)]
        force: bool,
    },

    /// Show configuration file path
    Path,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_is_well_formed() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_dialog_with_context() {
        let cli = Cli::parse_from(["earshot", "-v", "dialog", "xfm-S01E02", "3", "7", "--context"]);
        assert_eq!(cli.verbose, 1);
        match cli.command {
            Commands::Dialog {
                media_id,
                start,
                end,
                context,
            } => {
                assert_eq!(media_id, "xfm-S01E02");
                assert_eq!((start, end), (3, 7));
                assert!(context);
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_parse_meta_dump() {
        let cli = Cli::parse_from(["earshot", "meta", "dump", "/media/xfm-S01E01.mp3"]);
        assert!(matches!(
            cli.command,
            Commands::Meta { action: MetaAction::Dump { .. } }
        ));
    }
}
