//! Search document schema.
//!
//! [`DIALOG_SCHEMA`] lists every indexed field with its kind and a typed
//! getter/setter pair on [`DialogDocument`]. The index builds its Tantivy
//! schema from it and encodes/decodes documents through it, so adding a
//! field means adding one entry here.

use crate::dialogue::{DialogueLine, MediaInfo};
use crate::searchterms::FieldKind;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// A dialogue line as stored in the search index, denormalized with the
/// episode it belongs to. Timestamps are milliseconds.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DialogDocument {
    pub id: String,
    pub pos: i64,
    pub media_id: String,
    pub publication: String,
    pub series: i64,
    pub episode: i64,
    pub start_timestamp: i64,
    pub end_timestamp: i64,
    pub media_file_name: String,
    pub content: String,
}

impl DialogDocument {
    pub fn from_line(info: &MediaInfo, line: &DialogueLine) -> Self {
        let media_id = info.media_id();
        Self {
            id: line.id(&media_id),
            pos: i64::from(line.pos),
            media_id,
            publication: info.publication.clone(),
            series: i64::from(info.series),
            episode: i64::from(info.episode),
            start_timestamp: duration_millis(line.start_timestamp),
            end_timestamp: duration_millis(line.end_timestamp),
            media_file_name: line.media_file_name.clone(),
            content: line.content.clone(),
        }
    }

    pub fn start(&self) -> Duration {
        Duration::from_millis(self.start_timestamp.max(0) as u64)
    }

    pub fn end(&self) -> Duration {
        Duration::from_millis(self.end_timestamp.max(0) as u64)
    }
}

pub(crate) fn duration_millis(d: Duration) -> i64 {
    i64::try_from(d.as_millis()).unwrap_or(i64::MAX)
}

/// Typed access to one document field.
#[derive(Clone, Copy)]
pub enum Accessor {
    Keyword {
        get: fn(&DialogDocument) -> &str,
        set: fn(&mut DialogDocument, String),
    },
    Numeric {
        get: fn(&DialogDocument) -> i64,
        set: fn(&mut DialogDocument, i64),
    },
    Text {
        get: fn(&DialogDocument) -> &str,
        set: fn(&mut DialogDocument, String),
    },
}

impl Accessor {
    pub fn kind(&self) -> FieldKind {
        match self {
            Accessor::Keyword { .. } => FieldKind::Keyword,
            Accessor::Numeric { .. } => FieldKind::Numeric,
            Accessor::Text { .. } => FieldKind::Text,
        }
    }
}

/// One entry of the document schema.
#[derive(Clone, Copy)]
pub struct FieldSpec {
    pub name: &'static str,
    pub accessor: Accessor,
}

impl FieldSpec {
    pub fn kind(&self) -> FieldKind {
        self.accessor.kind()
    }
}

pub const ID_FIELD: &str = "_id";
pub const MEDIA_ID_FIELD: &str = "media_id";

pub const DIALOG_SCHEMA: &[FieldSpec] = &[
    FieldSpec {
        name: ID_FIELD,
        accessor: Accessor::Keyword { get: get_id, set: set_id },
    },
    FieldSpec {
        name: "pos",
        accessor: Accessor::Numeric { get: get_pos, set: set_pos },
    },
    FieldSpec {
        name: MEDIA_ID_FIELD,
        accessor: Accessor::Keyword { get: get_media_id, set: set_media_id },
    },
    FieldSpec {
        name: "publication",
        accessor: Accessor::Keyword { get: get_publication, set: set_publication },
    },
    FieldSpec {
        name: "series",
        accessor: Accessor::Numeric { get: get_series, set: set_series },
    },
    FieldSpec {
        name: "episode",
        accessor: Accessor::Numeric { get: get_episode, set: set_episode },
    },
    FieldSpec {
        name: "start_timestamp",
        accessor: Accessor::Numeric { get: get_start, set: set_start },
    },
    FieldSpec {
        name: "end_timestamp",
        accessor: Accessor::Numeric { get: get_end, set: set_end },
    },
    FieldSpec {
        name: "media_file_name",
        accessor: Accessor::Text { get: get_media_file_name, set: set_media_file_name },
    },
    FieldSpec {
        name: "content",
        accessor: Accessor::Text { get: get_content, set: set_content },
    },
];

/// Look up a field of [`DIALOG_SCHEMA`] by name.
pub fn schema_field(name: &str) -> Option<&'static FieldSpec> {
    DIALOG_SCHEMA.iter().find(|spec| spec.name == name)
}

fn get_id(d: &DialogDocument) -> &str {
    &d.id
}
fn set_id(d: &mut DialogDocument, v: String) {
    d.id = v;
}
fn get_pos(d: &DialogDocument) -> i64 {
    d.pos
}
fn set_pos(d: &mut DialogDocument, v: i64) {
    d.pos = v;
}
fn get_media_id(d: &DialogDocument) -> &str {
    &d.media_id
}
fn set_media_id(d: &mut DialogDocument, v: String) {
    d.media_id = v;
}
fn get_publication(d: &DialogDocument) -> &str {
    &d.publication
}
fn set_publication(d: &mut DialogDocument, v: String) {
    d.publication = v;
}
fn get_series(d: &DialogDocument) -> i64 {
    d.series
}
fn set_series(d: &mut DialogDocument, v: i64) {
    d.series = v;
}
fn get_episode(d: &DialogDocument) -> i64 {
    d.episode
}
fn set_episode(d: &mut DialogDocument, v: i64) {
    d.episode = v;
}
fn get_start(d: &DialogDocument) -> i64 {
    d.start_timestamp
}
fn set_start(d: &mut DialogDocument, v: i64) {
    d.start_timestamp = v;
}
fn get_end(d: &DialogDocument) -> i64 {
    d.end_timestamp
}
fn set_end(d: &mut DialogDocument, v: i64) {
    d.end_timestamp = v;
}
fn get_media_file_name(d: &DialogDocument) -> &str {
    &d.media_file_name
}
fn set_media_file_name(d: &mut DialogDocument, v: String) {
    d.media_file_name = v;
}
fn get_content(d: &DialogDocument) -> &str {
    &d.content
}
fn set_content(d: &mut DialogDocument, v: String) {
    d.content = v;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::searchterms::SearchField;

    #[test]
    fn test_query_fields_match_schema_kinds() {
        for field in SearchField::ALL {
            if field.kind() == FieldKind::Pragma {
                assert!(schema_field(field.name()).is_none());
                continue;
            }
            let spec = schema_field(field.name())
                .unwrap_or_else(|| panic!("{} missing from schema", field.name()));
            assert_eq!(spec.kind(), field.kind(), "kind of {}", field.name());
        }
    }

    #[test]
    fn test_accessors_round_trip() {
        let info = MediaInfo::new("xfm", 1, 3, "xfm-S01E03.mp3");
        let line = DialogueLine {
            pos: 4,
            start_timestamp: Duration::from_millis(1200),
            end_timestamp: Duration::from_millis(2500),
            content: "Are you having a laugh?".to_string(),
            media_file_name: "xfm-S01E03.mp3".to_string(),
        };
        let original = DialogDocument::from_line(&info, &line);
        assert_eq!(original.id, "xfm-S01E03-4");

        let mut copy = DialogDocument::default();
        for spec in DIALOG_SCHEMA {
            match spec.accessor {
                Accessor::Keyword { get, set } | Accessor::Text { get, set } => {
                    set(&mut copy, get(&original).to_string())
                }
                Accessor::Numeric { get, set } => set(&mut copy, get(&original)),
            }
        }
        assert_eq!(copy, original);
        assert_eq!(copy.start(), Duration::from_millis(1200));
    }
}
