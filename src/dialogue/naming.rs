//! Media file naming convention.

use super::MediaInfo;
use regex::Regex;
use std::path::Path;

/// Extracts publication, series and episode from names like
/// `xfm-S01E02.mp3` (the `S`/`E` markers are case-insensitive).
pub struct MediaNameParser {
    pattern: Regex,
}

impl MediaNameParser {
    pub fn new() -> Self {
        Self {
            pattern: Regex::new(r"(?i)^(?P<publication>.+?)-s(?P<series>\d{1,4})e(?P<episode>\d{1,4})$")
                .expect("static media name pattern"),
        }
    }

    /// Parse the file stem of `media_path`. Returns `None` for names that
    /// do not follow the convention.
    pub fn parse(&self, media_path: &Path) -> Option<MediaInfo> {
        let stem = media_path.file_stem()?.to_str()?;
        let file_name = media_path.file_name()?.to_str()?;
        let caps = self.pattern.captures(stem)?;

        Some(MediaInfo::new(
            &caps["publication"],
            caps["series"].parse().ok()?,
            caps["episode"].parse().ok()?,
            file_name,
        ))
    }
}

impl Default for MediaNameParser {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_standard_name() {
        let info = MediaNameParser::new()
            .parse(Path::new("/media/xfm-S01E02.mp3"))
            .unwrap();
        assert_eq!(info.publication, "xfm");
        assert_eq!(info.series, 1);
        assert_eq!(info.episode, 2);
        assert_eq!(info.media_file_name, "xfm-S01E02.mp3");
        assert_eq!(info.media_id(), "xfm-S01E02");
    }

    #[test]
    fn test_parse_hyphenated_publication_and_lowercase_markers() {
        let info = MediaNameParser::new()
            .parse(Path::new("the-office-s2e10.mkv"))
            .unwrap();
        assert_eq!(info.publication, "the-office");
        assert_eq!(info.media_id(), "the-office-S02E10");
    }

    #[test]
    fn test_reject_unconventional_names() {
        let parser = MediaNameParser::new();
        assert!(parser.parse(Path::new("episode one.mp3")).is_none());
        assert!(parser.parse(Path::new("-S01E01.mp3")).is_none());
        assert!(parser.parse(Path::new("show-S01.mp3")).is_none());
    }
}
