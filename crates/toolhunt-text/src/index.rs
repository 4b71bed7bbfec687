use anyhow::{anyhow, Result};
use tantivy::collector::TopDocs;
use tantivy::query::{BooleanQuery, Occur, Query, TermQuery};
use tantivy::schema::{Field, IndexRecordOption, Value};
use tantivy::tokenizer::TokenStream;
use tantivy::{doc, Index, IndexReader, IndexWriter, ReloadPolicy, TantivyDocument, Term};
use tracing::debug;

use toolhunt_core::traits::TextIndexer;
use toolhunt_core::types::{DocId, Document, ScoredCandidate};
use toolhunt_core::Error;

use crate::tantivy_utils::{build_schema, register_tokenizer, DOC_ID_FIELD, TEXT_FIELD, TOKENIZER_NAME};

const WRITER_MEMORY_BUDGET: usize = 50_000_000;

/// BM25 lexical index over a document store, held in RAM.
pub struct TantivyIndexer {
	index: Index,
	doc_id_field: Field,
	text_field: Field,
}

impl TantivyIndexer {
	pub fn new() -> Result<Self> {
		let schema = build_schema();
		let index = Index::create_in_ram(schema.clone());
		register_tokenizer(&index);
		let doc_id_field = schema.get_field(DOC_ID_FIELD)?;
		let text_field = schema.get_field(TEXT_FIELD)?;
		Ok(Self { index, doc_id_field, text_field })
	}

	fn reader(&self) -> Result<IndexReader> {
		self.index
			.reader_builder()
			.reload_policy(ReloadPolicy::Manual)
			.try_into()
			.map_err(|e| anyhow::Error::new(Error::IndexUnavailable(format!("lexical index reader: {}", e))))
	}

	/// Query terms as the index analyzer sees them, first occurrence kept.
	///
	/// Query syntax (`-`, `:`, quotes, `AND`) is plain text here, so every
	/// indexable word contributes an independent OR clause.
	fn query_terms(&self, query: &str) -> Result<Vec<String>> {
		let mut analyzer = self
			.index
			.tokenizers()
			.get(TOKENIZER_NAME)
			.ok_or_else(|| anyhow::Error::new(Error::IndexUnavailable(format!("tokenizer '{}' is not registered", TOKENIZER_NAME))))?;
		let mut stream = analyzer.token_stream(query);
		let mut terms: Vec<String> = Vec::new();
		while stream.advance() {
			let text = &stream.token().text;
			if !terms.iter().any(|t| t == text) { terms.push(text.clone()); }
		}
		Ok(terms)
	}
}

impl TextIndexer for TantivyIndexer {
	/// Replaces the indexed corpus. A single writer thread keeps one segment,
	/// so scoring and tie order do not depend on thread scheduling.
	fn index(&self, docs: &[Document]) -> Result<()> {
		let mut index_writer: IndexWriter = self.index.writer_with_num_threads(1, WRITER_MEMORY_BUDGET)?;
		index_writer.delete_all_documents()?;
		for d in docs {
			index_writer.add_document(doc!(
				self.doc_id_field => d.id as u64,
				self.text_field => d.text.clone(),
			))?;
		}
		index_writer.commit()?;
		debug!(docs = docs.len(), "lexical index committed");
		Ok(())
	}

	fn search(&self, query: &str, k: usize) -> Result<Vec<ScoredCandidate>> {
		if k == 0 || query.trim().is_empty() { return Ok(Vec::new()); }
		let terms = self.query_terms(query)?;
		if terms.is_empty() { return Ok(Vec::new()); }
		let clauses: Vec<(Occur, Box<dyn Query>)> = terms
			.iter()
			.map(|t| {
				let term = Term::from_field_text(self.text_field, t);
				(Occur::Should, Box::new(TermQuery::new(term, IndexRecordOption::WithFreqs)) as Box<dyn Query>)
			})
			.collect();
		let q = BooleanQuery::new(clauses);
		let searcher = self.reader()?.searcher();
		let top_docs = searcher.search(&q, &TopDocs::with_limit(k))?;
		let mut hits = Vec::with_capacity(top_docs.len());
		for (score, addr) in top_docs {
			let doc: TantivyDocument = searcher.doc(addr)?;
			let id = doc.get_first(self.doc_id_field).and_then(|v| v.as_u64()).ok_or_else(|| anyhow!("stored doc_id missing at {:?}", addr))?;
			hits.push(ScoredCandidate::lexical(id as DocId, score));
		}
		hits.sort_by(|a, b| b.score.total_cmp(&a.score).then(a.doc_id.cmp(&b.doc_id)));
		Ok(hits)
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	fn docs(texts: &[&str]) -> Vec<Document> {
		texts.iter().enumerate().map(|(id, t)| Document { id, text: t.to_string() }).collect()
	}

	#[test]
	fn stop_words_alone_match_nothing() {
		let idx = TantivyIndexer::new().unwrap();
		idx.index(&docs(&["nmap network scanner"])).unwrap();
		assert!(idx.search("on a the", 10).unwrap().is_empty());
	}

	#[test]
	fn reindex_replaces_previous_corpus() {
		let idx = TantivyIndexer::new().unwrap();
		idx.index(&docs(&["nmap network scanner"])).unwrap();
		idx.index(&docs(&["wireshark packet analyzer"])).unwrap();
		assert!(idx.search("nmap", 10).unwrap().is_empty());
		let hits = idx.search("packet", 10).unwrap();
		assert_eq!(hits.len(), 1);
		assert_eq!(hits[0].doc_id, 0);
	}

	#[test]
	fn syntax_characters_are_plain_separators() {
		let idx = TantivyIndexer::new().unwrap();
		idx.index(&docs(&["burp suite web proxy", "sqlmap sql injection tool"])).unwrap();
		let hits = idx.search("sql: \"injection (tool", 10).unwrap();
		assert_eq!(hits.len(), 1);
		assert_eq!(hits[0].doc_id, 1);
		assert!(idx.search("c++ AND", 10).unwrap().is_empty());
	}

	#[test]
	fn repeated_query_words_score_like_one() {
		let idx = TantivyIndexer::new().unwrap();
		idx.index(&docs(&["nmap network scanner", "wireshark packet analyzer"])).unwrap();
		let once = idx.search("scanner", 10).unwrap();
		let twice = idx.search("scanner scanner", 10).unwrap();
		assert_eq!(once, twice);
	}
}
