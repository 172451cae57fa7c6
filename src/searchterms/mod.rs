//! Search query terms.
//!
//! A query string such as `publication:xfm series:>=2 "hello there" offset:25`
//! is compiled into an ordered list of [`Term`]s. Field names come from a
//! fixed set; each field has a kind that decides how its value is parsed and
//! later matched by the index.

mod parser;

pub use parser::{ParseError, QueryParser};

use std::fmt;

/// How a field's value is interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    /// Matched exactly, untokenized.
    Keyword,
    /// Signed integer, supports range operators.
    Numeric,
    /// Tokenized full text.
    Text,
    /// Consumed by the caller, never sent to the index.
    Pragma,
}

/// The recognized query fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SearchField {
    Publication,
    Series,
    Episode,
    MediaId,
    Pos,
    Content,
    MediaFileName,
    StartTimestamp,
    EndTimestamp,
    Offset,
}

impl SearchField {
    pub const ALL: [SearchField; 10] = [
        SearchField::Publication,
        SearchField::Series,
        SearchField::Episode,
        SearchField::MediaId,
        SearchField::Pos,
        SearchField::Content,
        SearchField::MediaFileName,
        SearchField::StartTimestamp,
        SearchField::EndTimestamp,
        SearchField::Offset,
    ];

    /// Field name as written in queries and in the index schema.
    pub fn name(self) -> &'static str {
        match self {
            SearchField::Publication => "publication",
            SearchField::Series => "series",
            SearchField::Episode => "episode",
            SearchField::MediaId => "media_id",
            SearchField::Pos => "pos",
            SearchField::Content => "content",
            SearchField::MediaFileName => "media_file_name",
            SearchField::StartTimestamp => "start_timestamp",
            SearchField::EndTimestamp => "end_timestamp",
            SearchField::Offset => "offset",
        }
    }

    pub fn kind(self) -> FieldKind {
        match self {
            SearchField::Publication | SearchField::MediaId => FieldKind::Keyword,
            SearchField::Series
            | SearchField::Episode
            | SearchField::Pos
            | SearchField::StartTimestamp
            | SearchField::EndTimestamp => FieldKind::Numeric,
            SearchField::Content | SearchField::MediaFileName => FieldKind::Text,
            SearchField::Offset => FieldKind::Pragma,
        }
    }

    /// Case-insensitive lookup by name.
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|f| f.name().eq_ignore_ascii_case(name))
    }
}

impl fmt::Display for SearchField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Comparison operator of a field predicate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Op {
    Eq,
    Gt,
    Ge,
    Lt,
    Le,
}

impl Op {
    pub fn symbol(self) -> &'static str {
        match self {
            Op::Eq => "",
            Op::Gt => ">",
            Op::Ge => ">=",
            Op::Lt => "<",
            Op::Le => "<=",
        }
    }
}

/// A parsed predicate value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TermValue {
    Int(i64),
    Str(String),
}

impl fmt::Display for TermValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TermValue::Int(v) => write!(f, "{}", v),
            TermValue::Str(s) if s.contains(char::is_whitespace) => write!(f, "\"{}\"", s),
            TermValue::Str(s) => f.write_str(s),
        }
    }
}

/// One unit of a parsed query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Term {
    /// A bare word, matched against dialogue content.
    Text(String),
    /// A quoted phrase, matched as consecutive words.
    Phrase(String),
    /// `field:value` or `field:<op>value`.
    Field {
        field: SearchField,
        op: Op,
        value: TermValue,
    },
}

impl Term {
    pub fn is_pragma(&self) -> bool {
        matches!(self, Term::Field { field, .. } if field.kind() == FieldKind::Pragma)
    }
}

impl fmt::Display for Term {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Term::Text(t) => f.write_str(t),
            Term::Phrase(p) => write!(f, "\"{}\"", p),
            Term::Field { field, op, value } => write!(f, "{}:{}{}", field, op.symbol(), value),
        }
    }
}

/// Remove the first `offset` pragma from `terms` and interpret it.
///
/// A negative or non-numeric offset is dropped and reported as absent.
pub fn extract_offset(terms: Vec<Term>) -> (Vec<Term>, Option<usize>) {
    let mut offset = None;
    let mut found = false;
    let mut remaining = Vec::with_capacity(terms.len());

    for term in terms {
        match term {
            Term::Field {
                field: SearchField::Offset,
                value,
                ..
            } if !found => {
                found = true;
                offset = match value {
                    TermValue::Int(v) => usize::try_from(v).ok(),
                    TermValue::Str(s) => s.trim().parse::<usize>().ok(),
                };
            }
            other => remaining.push(other),
        }
    }

    (remaining, offset)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(input: &str) -> Vec<Term> {
        QueryParser::new().parse(input).unwrap()
    }

    #[test]
    fn test_extract_offset() {
        let (terms, offset) = extract_offset(parse("hello offset:5 world"));
        assert_eq!(
            terms,
            vec![Term::Text("hello".into()), Term::Text("world".into())]
        );
        assert_eq!(offset, Some(5));
    }

    #[test]
    fn test_negative_offset_is_absent() {
        let (terms, offset) = extract_offset(parse("offset:-1"));
        assert!(terms.is_empty());
        assert_eq!(offset, None);

        let (_, offset) = extract_offset(parse("offset:abc"));
        assert_eq!(offset, None);
    }

    #[test]
    fn test_only_first_offset_extracted() {
        let (terms, offset) = extract_offset(parse("offset:2 offset:9"));
        assert_eq!(offset, Some(2));
        assert_eq!(terms.len(), 1);
        assert!(terms[0].is_pragma());
    }

    #[test]
    fn test_field_lookup() {
        assert_eq!(SearchField::from_name("Media_ID"), Some(SearchField::MediaId));
        assert_eq!(SearchField::from_name("speaker"), None);
        assert_eq!(SearchField::StartTimestamp.kind(), FieldKind::Numeric);
    }

    #[test]
    fn test_display() {
        let terms = parse(r#"series:>=2 publication:"the show" "hi there""#);
        let rendered: Vec<String> = terms.iter().map(|t| t.to_string()).collect();
        assert_eq!(
            rendered,
            vec!["series:>=2", "publication:\"the show\"", "\"hi there\""]
        );
    }
}
