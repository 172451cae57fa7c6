//! Tantivy-backed search index.

use super::document::{Accessor, DialogDocument, FieldSpec, DIALOG_SCHEMA, MEDIA_ID_FIELD};
use super::SearchIndex;
use crate::dialogue::MediaItem;
use crate::error::{EarshotError, Result};
use crate::searchterms::{FieldKind, Op, SearchField, Term, TermValue};
use async_trait::async_trait;
use std::ops::Bound;
use std::path::Path;
use std::sync::Mutex;
use tantivy::collector::TopDocs;
use tantivy::directory::MmapDirectory;
use tantivy::query::{BooleanQuery, Occur, PhraseQuery, Query, RangeQuery, TermQuery};
use tantivy::schema::{Field, IndexRecordOption, Schema, Value, FAST, INDEXED, STORED, STRING, TEXT};
use tantivy::tokenizer::TokenStream;
use tantivy::{Index, IndexReader, IndexWriter, ReloadPolicy, TantivyDocument, TantivyError, Term as IndexTerm};
use tracing::{debug, info, instrument, warn};

/// Smallest heap Tantivy accepts for a single indexing thread.
const MIN_WRITER_HEAP: usize = 15_000_000;

/// Search index stored in a Tantivy directory.
pub struct TantivyIndex {
    index: Index,
    reader: IndexReader,
    writer: Mutex<IndexWriter>,
    /// Schema entries paired with their Tantivy fields, in schema order.
    fields: Vec<(&'static FieldSpec, Field)>,
    media_id: Field,
    content: Field,
}

impl TantivyIndex {
    /// Open the index in `dir`, creating it if needed.
    #[instrument(skip_all)]
    pub fn open(dir: &Path, writer_heap_bytes: usize) -> Result<Self> {
        std::fs::create_dir_all(dir)?;

        let directory = MmapDirectory::open(dir).map_err(TantivyError::from)?;
        let index = Index::open_or_create(directory, build_schema())?;

        info!("Opened search index at {:?}", dir);
        Self::from_index(index, writer_heap_bytes)
    }

    /// Create an in-memory index (useful for testing).
    pub fn in_memory() -> Result<Self> {
        Self::from_index(Index::create_in_ram(build_schema()), MIN_WRITER_HEAP)
    }

    fn from_index(index: Index, writer_heap_bytes: usize) -> Result<Self> {
        let schema = index.schema();
        let fields = DIALOG_SCHEMA
            .iter()
            .map(|spec| Ok((spec, schema.get_field(spec.name)?)))
            .collect::<Result<Vec<_>>>()?;

        let media_id = schema.get_field(MEDIA_ID_FIELD)?;
        let content = schema.get_field(SearchField::Content.name())?;

        let writer = index.writer_with_num_threads(1, writer_heap_bytes.max(MIN_WRITER_HEAP))?;
        let reader = index
            .reader_builder()
            .reload_policy(ReloadPolicy::Manual)
            .try_into()?;

        Ok(Self {
            index,
            reader,
            writer: Mutex::new(writer),
            fields,
            media_id,
            content,
        })
    }

    fn field(&self, name: &str) -> Result<(&'static FieldSpec, Field)> {
        self.fields
            .iter()
            .find(|(spec, _)| spec.name == name)
            .copied()
            .ok_or_else(|| EarshotError::Storage(format!("Field '{}' is not in the index schema", name)))
    }

    fn encode(&self, doc: &DialogDocument) -> TantivyDocument {
        let mut out = TantivyDocument::default();
        for (spec, field) in &self.fields {
            match spec.accessor {
                Accessor::Keyword { get, .. } | Accessor::Text { get, .. } => {
                    out.add_text(*field, get(doc))
                }
                Accessor::Numeric { get, .. } => out.add_i64(*field, get(doc)),
            }
        }
        out
    }

    fn decode(&self, doc: &TantivyDocument) -> Result<DialogDocument> {
        let mut out = DialogDocument::default();
        for (spec, field) in &self.fields {
            let value = doc.get_first(*field);
            match spec.accessor {
                Accessor::Keyword { set, .. } | Accessor::Text { set, .. } => {
                    let v = value.and_then(|v| v.as_str()).ok_or_else(|| missing(spec))?;
                    set(&mut out, v.to_string());
                }
                Accessor::Numeric { set, .. } => {
                    let v = value.and_then(|v| v.as_i64()).ok_or_else(|| missing(spec))?;
                    set(&mut out, v);
                }
            }
        }
        Ok(out)
    }

    /// Run the analyzer of `field` over `text`.
    fn tokenize(&self, field: Field, text: &str) -> Result<Vec<IndexTerm>> {
        let mut analyzer = self.index.tokenizer_for_field(field)?;
        let mut stream = analyzer.token_stream(text);
        let mut terms = Vec::new();
        while stream.advance() {
            terms.push(IndexTerm::from_field_text(field, &stream.token().text));
        }
        Ok(terms)
    }

    /// Match `text` as consecutive words of a tokenized field.
    fn text_query(&self, field: Field, text: &str) -> Result<Option<Box<dyn Query>>> {
        let mut terms = self.tokenize(field, text)?;
        let query: Box<dyn Query> = match terms.len() {
            0 => return Ok(None),
            1 => Box::new(TermQuery::new(terms.remove(0), IndexRecordOption::WithFreqs)),
            _ => Box::new(PhraseQuery::new(terms)),
        };
        Ok(Some(query))
    }

    /// All words of `text` must occur, in any order.
    fn words_query(&self, field: Field, text: &str) -> Result<Option<Box<dyn Query>>> {
        let clauses: Vec<(Occur, Box<dyn Query>)> = self
            .tokenize(field, text)?
            .into_iter()
            .map(|t| {
                let q: Box<dyn Query> = Box::new(TermQuery::new(t, IndexRecordOption::WithFreqs));
                (Occur::Must, q)
            })
            .collect();

        Ok(match clauses.len() {
            0 => None,
            _ => Some(Box::new(BooleanQuery::new(clauses))),
        })
    }

    fn field_query(&self, field: SearchField, op: Op, value: &TermValue) -> Result<Option<Box<dyn Query>>> {
        if field.kind() == FieldKind::Pragma {
            return Ok(None);
        }
        let (spec, index_field) = self.field(field.name())?;

        match (spec.kind(), value) {
            (FieldKind::Keyword, TermValue::Str(s)) => Ok(Some(Box::new(TermQuery::new(
                IndexTerm::from_field_text(index_field, s),
                IndexRecordOption::Basic,
            )))),
            (FieldKind::Text, TermValue::Str(s)) => self.text_query(index_field, s),
            (FieldKind::Numeric, TermValue::Int(v)) => {
                let v = *v;
                let query: Box<dyn Query> = match op {
                    Op::Eq => Box::new(TermQuery::new(
                        IndexTerm::from_field_i64(index_field, v),
                        IndexRecordOption::Basic,
                    )),
                    Op::Gt => range(spec, Bound::Excluded(v), Bound::Unbounded),
                    Op::Ge => range(spec, Bound::Included(v), Bound::Unbounded),
                    Op::Lt => range(spec, Bound::Unbounded, Bound::Excluded(v)),
                    Op::Le => range(spec, Bound::Unbounded, Bound::Included(v)),
                };
                Ok(Some(query))
            }
            (kind, value) => Err(EarshotError::InvalidInput(format!(
                "Value {} does not fit {:?} field '{}'",
                value, kind, spec.name
            ))),
        }
    }

    /// Compile terms into one conjunction. `None` when nothing is searchable.
    fn compile(&self, terms: &[Term]) -> Result<Option<BooleanQuery>> {
        let mut clauses: Vec<(Occur, Box<dyn Query>)> = Vec::new();

        for term in terms {
            let query = match term {
                Term::Text(text) => self.words_query(self.content, text)?,
                Term::Phrase(phrase) => self.text_query(self.content, phrase)?,
                Term::Field { field, op, value } => self.field_query(*field, *op, value)?,
            };
            if let Some(query) = query {
                clauses.push((Occur::Must, query));
            }
        }

        Ok((!clauses.is_empty()).then(|| BooleanQuery::new(clauses)))
    }

    fn write_media(&self, writer: &mut IndexWriter, item: &MediaItem, media_id: &str) -> Result<usize> {
        writer.delete_term(IndexTerm::from_field_text(self.media_id, media_id));
        for line in &item.dialogue {
            writer.add_document(self.encode(&DialogDocument::from_line(&item.info, line)))?;
        }
        writer.commit()?;
        Ok(item.dialogue.len())
    }
}

fn build_schema() -> Schema {
    let mut builder = Schema::builder();
    for spec in DIALOG_SCHEMA {
        match spec.kind() {
            FieldKind::Keyword => {
                builder.add_text_field(spec.name, STRING | STORED);
            }
            FieldKind::Text => {
                builder.add_text_field(spec.name, TEXT | STORED);
            }
            FieldKind::Numeric => {
                builder.add_i64_field(spec.name, INDEXED | STORED | FAST);
            }
            FieldKind::Pragma => {}
        }
    }
    builder.build()
}

fn range(spec: &FieldSpec, lower: Bound<i64>, upper: Bound<i64>) -> Box<dyn Query> {
    Box::new(RangeQuery::new_i64_bounds(spec.name.to_string(), lower, upper))
}

fn missing(spec: &FieldSpec) -> EarshotError {
    EarshotError::Storage(format!("Indexed document has no value for '{}'", spec.name))
}

fn lock_error<T>(e: std::sync::PoisonError<T>) -> EarshotError {
    EarshotError::Storage(format!("Failed to acquire index writer lock: {}", e))
}

#[async_trait]
impl SearchIndex for TantivyIndex {
    #[instrument(skip(self, item), fields(media_id = %item.media_id(), lines = item.dialogue.len()))]
    async fn replace_media(&self, item: &MediaItem) -> Result<usize> {
        let media_id = item.media_id();
        let mut writer = self.writer.lock().map_err(lock_error)?;

        let written = match self.write_media(&mut writer, item, &media_id) {
            Ok(written) => written,
            Err(e) => {
                if let Err(rollback) = writer.rollback() {
                    warn!("Index rollback for {} failed: {}", media_id, rollback);
                }
                return Err(e);
            }
        };
        drop(writer);

        self.reader.reload()?;
        debug!("Indexed {} documents for {}", written, media_id);
        Ok(written)
    }

    #[instrument(skip(self, terms), fields(terms = terms.len()))]
    async fn search(&self, terms: &[Term], offset: usize, limit: usize) -> Result<Vec<DialogDocument>> {
        if limit == 0 {
            return Ok(Vec::new());
        }
        let Some(query) = self.compile(terms)? else {
            return Ok(Vec::new());
        };

        let searcher = self.reader.searcher();
        let top_docs = searcher.search(&query, &TopDocs::with_limit(limit).and_offset(offset))?;

        let mut results = Vec::with_capacity(top_docs.len());
        for (_score, address) in top_docs {
            let doc: TantivyDocument = searcher.doc(address)?;
            results.push(self.decode(&doc)?);
        }

        debug!("Search returned {} documents", results.len());
        Ok(results)
    }

    async fn media_documents(&self, media_id: &str) -> Result<Vec<DialogDocument>> {
        let searcher = self.reader.searcher();
        let limit = usize::try_from(searcher.num_docs()).unwrap_or(usize::MAX).max(1);
        let query = TermQuery::new(
            IndexTerm::from_field_text(self.media_id, media_id),
            IndexRecordOption::Basic,
        );

        let mut docs = Vec::new();
        for (_score, address) in searcher.search(&query, &TopDocs::with_limit(limit))? {
            let doc: TantivyDocument = searcher.doc(address)?;
            docs.push(self.decode(&doc)?);
        }
        docs.sort_by_key(|d| d.pos);
        Ok(docs)
    }

    async fn document_count(&self) -> Result<u64> {
        Ok(self.reader.searcher().num_docs())
    }
}
