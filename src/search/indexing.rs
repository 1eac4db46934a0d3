use crate::config::IndexingConfig;
use crate::database::TranscriptStore;
use crate::error::ServiceResult;
use crate::search::tokenizer::{build_search_content, tokenize, TokenizerOptions};
use crate::types::{IndexStats, SearchIndexUpsert};
use chrono::Utc;
use futures::future::join_all;
use rand::Rng;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::sleep;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Builds and maintains the derived search index for transcripts.
///
/// Bulk operations process transcripts in fixed-size concurrent batches with
/// a small delay between batches, keeping load on the store bounded.
pub struct SearchIndexingService {
    store: Arc<dyn TranscriptStore>,
    config: IndexingConfig,
}

impl SearchIndexingService {
    /// Create an indexing service over a transcript store
    pub fn new(store: Arc<dyn TranscriptStore>, config: IndexingConfig) -> Self {
        SearchIndexingService { store, config }
    }

    /// Index one transcript. Returns false when the transcript does not
    /// exist; absence is expected, not an error.
    pub async fn index_transcript(&self, id: Uuid) -> ServiceResult<bool> {
        let Some(transcript) = self.store.find_transcript(id).await? else {
            debug!("Transcript {} not found, nothing to index", id);
            return Ok(false);
        };

        let content = build_search_content(
            &transcript.title,
            &transcript.description,
            &transcript.utterances,
        );
        let options = TokenizerOptions::from(&self.config);
        let tokens = tokenize(&content, &options);
        let token_count = tokens.len();

        let entry = SearchIndexUpsert {
            transcript_id: id,
            content,
            tokens,
            language: transcript.language.clone(),
            updated_at: Utc::now(),
        };

        self.store.upsert_search_index(&entry).await?;
        debug!("Indexed transcript {} ({} tokens)", id, token_count);
        Ok(true)
    }

    /// Index a list of transcripts in concurrent batches.
    ///
    /// Per-item failures are logged and skipped; the run always covers every
    /// id. Returns the number of transcripts successfully indexed.
    pub async fn batch_index_transcripts(
        &self,
        ids: &[Uuid],
        batch_size: Option<usize>,
    ) -> usize {
        if ids.is_empty() {
            return 0;
        }

        let batch_size = batch_size.unwrap_or(self.config.batch_size).max(1);
        let total_batches = ids.len().div_ceil(batch_size);
        let mut indexed = 0usize;

        for (batch_no, chunk) in ids.chunks(batch_size).enumerate() {
            let results = join_all(chunk.iter().map(|id| self.index_transcript(*id))).await;

            for (id, result) in chunk.iter().zip(results) {
                match result {
                    Ok(true) => indexed += 1,
                    Ok(false) => debug!("Skipped missing transcript {}", id),
                    Err(e) => warn!("Failed to index transcript {}: {}", id, e),
                }
            }

            debug!("Indexed batch {}/{}", batch_no + 1, total_batches);

            if batch_no + 1 < total_batches {
                sleep(self.batch_delay()).await;
            }
        }

        info!(
            "Batch indexing complete: {}/{} transcripts indexed",
            indexed,
            ids.len()
        );
        indexed
    }

    /// Index every completed transcript that has no search index row yet
    pub async fn index_all_unindexed_transcripts(&self) -> ServiceResult<usize> {
        let ids = self.store.list_unindexed_transcript_ids().await?;
        if ids.is_empty() {
            info!("No unindexed transcripts found");
            return Ok(0);
        }

        info!("Indexing {} unindexed transcripts", ids.len());
        Ok(self.batch_index_transcripts(&ids, None).await)
    }

    /// Rebuild the index for every completed transcript, e.g. after a
    /// tokenization change
    pub async fn reindex_all_transcripts(&self, batch_size: Option<usize>) -> ServiceResult<usize> {
        let ids = self.store.list_completed_transcript_ids().await?;
        info!("Reindexing all {} completed transcripts", ids.len());
        Ok(self.batch_index_transcripts(&ids, batch_size).await)
    }

    /// Remove the search index row for a transcript. An already-absent row
    /// counts as success.
    pub async fn remove_index(&self, id: Uuid) -> ServiceResult<bool> {
        let existed = self.store.delete_search_index(id).await?;
        if existed {
            debug!("Removed search index for transcript {}", id);
        } else {
            debug!("Search index for transcript {} was already absent", id);
        }
        Ok(true)
    }

    /// Aggregate index statistics, recomputed from the store on every call
    pub async fn get_index_stats(&self) -> ServiceResult<IndexStats> {
        self.store.index_stats().await
    }

    /// Inter-batch delay with 10% jitter
    fn batch_delay(&self) -> Duration {
        let base = self.config.batch_delay_ms;
        let jitter_range = base / 10;
        let jitter = if jitter_range > 0 {
            rand::thread_rng().gen_range(0..=jitter_range * 2)
        } else {
            0
        };
        Duration::from_millis(base - jitter_range + jitter)
    }
}
