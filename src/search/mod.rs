/// Search indexing module
///
/// Derives a tokenized search document per transcript and keeps it in sync
/// with the store: single-transcript indexing, batched bulk indexing with
/// static backpressure, full reindexing and aggregate statistics.
mod indexing;
mod tokenizer;

#[cfg(test)]
mod tests;

pub use indexing::SearchIndexingService;
pub use tokenizer::{build_search_content, tokenize, TokenizerOptions};
