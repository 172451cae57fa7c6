use super::{FieldKind, Op, SearchField, Term, TermValue};
use std::iter::Peekable;
use std::str::CharIndices;
use thiserror::Error;

/// Errors raised while compiling a query string.
///
/// Anything not listed here (unknown field names, stray punctuation) is
/// treated as free text instead.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    #[error("unterminated quote starting at byte {0}")]
    UnterminatedQuote(usize),

    #[error("field '{0}' has no value")]
    MissingValue(String),

    #[error("field '{field}' expects an integer, got '{value}'")]
    InvalidNumber { field: String, value: String },

    #[error("operator '{op}' only applies to numeric fields, not '{field}'")]
    RangeOnNonNumeric { field: String, op: String },
}

/// Left-to-right query tokenizer.
///
/// Parsing is a pure function of the input: the same string always yields
/// the same terms in the same order.
#[derive(Debug, Clone, Default)]
pub struct QueryParser;

impl QueryParser {
    pub fn new() -> Self {
        Self
    }

    /// Compile `input` into terms. Blank input yields no terms.
    pub fn parse(&self, input: &str) -> Result<Vec<Term>, ParseError> {
        let mut terms = Vec::new();
        let mut chars = input.char_indices().peekable();

        loop {
            while chars.next_if(|(_, c)| c.is_whitespace()).is_some() {}

            let Some(&(start, first)) = chars.peek() else {
                break;
            };

            if first == '"' {
                chars.next();
                let phrase = collapse_whitespace(&read_until_quote(&mut chars, start)?);
                if !phrase.is_empty() {
                    terms.push(Term::Phrase(phrase));
                }
                continue;
            }

            let token = read_token(&mut chars)?;
            if let Some(term) = classify(&token)? {
                terms.push(term);
            }
        }

        Ok(terms)
    }
}

/// Consume up to and including the closing quote. The opening quote has
/// already been consumed; `start` is its byte offset.
fn read_until_quote(chars: &mut Peekable<CharIndices<'_>>, start: usize) -> Result<String, ParseError> {
    let mut out = String::new();
    for (_, c) in chars.by_ref() {
        if c == '"' {
            return Ok(out);
        }
        out.push(c);
    }
    Err(ParseError::UnterminatedQuote(start))
}

/// Read a whitespace-delimited token. Quoted sections inside a field token
/// (`publication:"the show"`) keep their whitespace and their quote marks;
/// anywhere else a quote is an ordinary character.
fn read_token(chars: &mut Peekable<CharIndices<'_>>) -> Result<String, ParseError> {
    let mut token = String::new();
    let mut open_quote: Option<usize> = None;

    while let Some(&(i, c)) = chars.peek() {
        if c.is_whitespace() && open_quote.is_none() {
            break;
        }
        if c == '"' && is_field_token(&token) {
            open_quote = match open_quote {
                Some(_) => None,
                None => Some(i),
            };
        }
        token.push(c);
        chars.next();
    }

    match open_quote {
        Some(start) => Err(ParseError::UnterminatedQuote(start)),
        None => Ok(token),
    }
}

/// Whether `token` starts with a recognized `field:` prefix.
fn is_field_token(token: &str) -> bool {
    token
        .split_once(':')
        .is_some_and(|(name, _)| SearchField::from_name(name).is_some())
}

fn classify(token: &str) -> Result<Option<Term>, ParseError> {
    let field = token
        .split_once(':')
        .and_then(|(name, rest)| SearchField::from_name(name).map(|f| (f, rest)));

    let Some((field, rest)) = field else {
        let text = collapse_whitespace(&token.replace('"', " "));
        return Ok((!text.is_empty()).then_some(Term::Text(text)));
    };

    let (op, raw) = split_operator(rest);
    let value = collapse_whitespace(&raw.replace('"', ""));
    let kind = field.kind();

    // Pragmas are interpreted later; an unusable value just means "absent".
    if kind == FieldKind::Pragma {
        return Ok(Some(Term::Field {
            field,
            op,
            value: TermValue::Str(value),
        }));
    }
    if value.is_empty() {
        return Err(ParseError::MissingValue(field.name().to_string()));
    }

    if op != Op::Eq && kind != FieldKind::Numeric {
        return Err(ParseError::RangeOnNonNumeric {
            field: field.name().to_string(),
            op: op.symbol().to_string(),
        });
    }

    let value = match kind {
        FieldKind::Numeric => TermValue::Int(value.parse().map_err(|_| ParseError::InvalidNumber {
            field: field.name().to_string(),
            value: value.clone(),
        })?),
        FieldKind::Keyword | FieldKind::Text | FieldKind::Pragma => TermValue::Str(value),
    };

    Ok(Some(Term::Field { field, op, value }))
}

fn split_operator(rest: &str) -> (Op, &str) {
    // Two-character operators first.
    for (prefix, op) in [(">=", Op::Ge), ("<=", Op::Le), (">", Op::Gt), ("<", Op::Lt)] {
        if let Some(value) = rest.strip_prefix(prefix) {
            return (op, value);
        }
    }
    (Op::Eq, rest)
}

fn collapse_whitespace(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}
