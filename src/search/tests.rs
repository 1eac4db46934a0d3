use super::*;
use crate::config::IndexingConfig;
use crate::database::TranscriptStore;
use crate::error::{ServiceError, ServiceResult};
use crate::types::{
    IndexStats, LanguageCount, SearchIndexEntry, SearchIndexUpsert, Transcript,
    TranscriptMetadata, TranscriptStatus, TranscriptUpdate, Utterance,
};
use async_trait::async_trait;
use chrono::Utc;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex as StdMutex};
use std::time::Duration;
use uuid::Uuid;

/// In-memory transcript store double with injectable upsert failures
struct MemoryStore {
    transcripts: StdMutex<HashMap<Uuid, Transcript>>,
    indexes: StdMutex<HashMap<Uuid, SearchIndexEntry>>,
    failing_ids: StdMutex<HashSet<Uuid>>,
    find_calls: AtomicUsize,
}

impl MemoryStore {
    fn new() -> Arc<Self> {
        Arc::new(MemoryStore {
            transcripts: StdMutex::new(HashMap::new()),
            indexes: StdMutex::new(HashMap::new()),
            failing_ids: StdMutex::new(HashSet::new()),
            find_calls: AtomicUsize::new(0),
        })
    }

    fn add_transcript(&self, transcript: Transcript) -> Uuid {
        let id = transcript.id;
        self.transcripts.lock().unwrap().insert(id, transcript);
        id
    }

    fn fail_upserts_for(&self, id: Uuid) {
        self.failing_ids.lock().unwrap().insert(id);
    }

    fn index_count(&self) -> usize {
        self.indexes.lock().unwrap().len()
    }

    fn index_for(&self, id: Uuid) -> Option<SearchIndexEntry> {
        self.indexes.lock().unwrap().get(&id).cloned()
    }
}

#[async_trait]
impl TranscriptStore for MemoryStore {
    async fn find_transcript(&self, id: Uuid) -> ServiceResult<Option<Transcript>> {
        self.find_calls.fetch_add(1, Ordering::Relaxed);
        Ok(self.transcripts.lock().unwrap().get(&id).cloned())
    }

    async fn update_transcript(&self, id: Uuid, update: TranscriptUpdate) -> ServiceResult<()> {
        let mut transcripts = self.transcripts.lock().unwrap();
        let transcript = transcripts.get_mut(&id).ok_or_else(|| {
            ServiceError::DatabaseError(format!("Transcript {} not found", id))
        })?;

        if let Some(summary) = update.summary {
            transcript.summary = Some(summary);
        }
        if let Some(status) = update.status {
            transcript.status = status;
        }
        if let Some(metadata) = update.metadata {
            transcript.metadata = metadata;
        }
        transcript.updated_at = Utc::now();
        Ok(())
    }

    async fn upsert_search_index(&self, entry: &SearchIndexUpsert) -> ServiceResult<()> {
        if self.failing_ids.lock().unwrap().contains(&entry.transcript_id) {
            return Err(ServiceError::DatabaseError(
                "simulated upsert failure".to_string(),
            ));
        }

        self.indexes.lock().unwrap().insert(
            entry.transcript_id,
            SearchIndexEntry {
                transcript_id: entry.transcript_id,
                content: entry.content.clone(),
                tokens: entry.tokens.clone(),
                language: entry.language.clone(),
                updated_at: entry.updated_at,
            },
        );
        Ok(())
    }

    async fn delete_search_index(&self, transcript_id: Uuid) -> ServiceResult<bool> {
        Ok(self.indexes.lock().unwrap().remove(&transcript_id).is_some())
    }

    async fn list_completed_transcript_ids(&self) -> ServiceResult<Vec<Uuid>> {
        let mut ids: Vec<Uuid> = self
            .transcripts
            .lock()
            .unwrap()
            .values()
            .filter(|t| t.status == TranscriptStatus::Completed)
            .map(|t| t.id)
            .collect();
        ids.sort();
        Ok(ids)
    }

    async fn list_unindexed_transcript_ids(&self) -> ServiceResult<Vec<Uuid>> {
        let indexes = self.indexes.lock().unwrap();
        let mut ids: Vec<Uuid> = self
            .transcripts
            .lock()
            .unwrap()
            .values()
            .filter(|t| t.status == TranscriptStatus::Completed && !indexes.contains_key(&t.id))
            .map(|t| t.id)
            .collect();
        ids.sort();
        Ok(ids)
    }

    async fn index_stats(&self) -> ServiceResult<IndexStats> {
        let indexes = self.indexes.lock().unwrap();
        let total_indexes = indexes.len() as u64;

        let mut by_language: HashMap<String, u64> = HashMap::new();
        let mut token_total = 0usize;
        let mut last_indexed = None;

        for entry in indexes.values() {
            *by_language.entry(entry.language.clone()).or_default() += 1;
            token_total += entry.tokens.len();
            if last_indexed.map(|t| entry.updated_at > t).unwrap_or(true) {
                last_indexed = Some(entry.updated_at);
            }
        }

        let average_token_count = if total_indexes > 0 {
            token_total as f64 / total_indexes as f64
        } else {
            0.0
        };

        let unindexed_count = self
            .transcripts
            .lock()
            .unwrap()
            .values()
            .filter(|t| t.status == TranscriptStatus::Completed && !indexes.contains_key(&t.id))
            .count() as u64;

        Ok(IndexStats {
            total_indexes,
            indexes_by_language: by_language
                .into_iter()
                .map(|(language, count)| LanguageCount { language, count })
                .collect(),
            average_token_count,
            last_indexed,
            unindexed_count,
        })
    }

    async fn ping(&self) -> ServiceResult<()> {
        Ok(())
    }
}

fn make_transcript(title: &str) -> Transcript {
    Transcript {
        id: Uuid::new_v4(),
        video_id: Uuid::new_v4().to_string(),
        title: title.to_string(),
        description: "An in-depth walkthrough".to_string(),
        duration_secs: 300.0,
        summary: None,
        language: "en".to_string(),
        utterances: vec![
            Utterance {
                start_secs: 0.0,
                end_secs: 4.0,
                text: "welcome everyone to the channel".to_string(),
                speaker: None,
            },
            Utterance {
                start_secs: 4.0,
                end_secs: 9.0,
                text: "today we cover memory safety".to_string(),
                speaker: None,
            },
        ],
        metadata: TranscriptMetadata::default(),
        status: TranscriptStatus::Completed,
        created_at: Utc::now(),
        updated_at: Utc::now(),
    }
}

fn test_config() -> IndexingConfig {
    IndexingConfig {
        batch_size: 10,
        batch_delay_ms: 1,
        min_word_length: 3,
        max_tokens: 1000,
        remove_stop_words: true,
    }
}

fn indexer_over(store: Arc<MemoryStore>) -> SearchIndexingService {
    SearchIndexingService::new(store, test_config())
}

#[tokio::test]
async fn test_index_missing_transcript_returns_false() {
    let store = MemoryStore::new();
    let indexer = indexer_over(store.clone());

    let indexed = indexer.index_transcript(Uuid::new_v4()).await.unwrap();

    assert!(!indexed);
    assert_eq!(store.index_count(), 0);
}

#[tokio::test]
async fn test_index_builds_tokenized_entry() {
    let store = MemoryStore::new();
    let indexer = indexer_over(store.clone());
    let id = store.add_transcript(make_transcript("Rust Memory Safety"));

    assert!(indexer.index_transcript(id).await.unwrap());

    let entry = store.index_for(id).unwrap();
    assert_eq!(entry.language, "en");
    assert!(entry.tokens.contains(&"rust".to_string()));
    assert!(entry.tokens.contains(&"memory".to_string()));
    assert!(entry.tokens.contains(&"welcome".to_string()));
    // Stop words never reach the index
    assert!(!entry.tokens.contains(&"the".to_string()));
    // Title appears three times in the content for weighting
    assert_eq!(entry.content.matches("Rust Memory Safety").count(), 3);
}

#[tokio::test]
async fn test_reindexing_is_idempotent_and_advances_updated_at() {
    let store = MemoryStore::new();
    let indexer = indexer_over(store.clone());
    let id = store.add_transcript(make_transcript("Rust Memory Safety"));

    assert!(indexer.index_transcript(id).await.unwrap());
    let first = store.index_for(id).unwrap();

    tokio::time::sleep(Duration::from_millis(10)).await;

    assert!(indexer.index_transcript(id).await.unwrap());
    let second = store.index_for(id).unwrap();

    // Still a single row, refreshed in place
    assert_eq!(store.index_count(), 1);
    assert_eq!(first.tokens, second.tokens);
    assert!(second.updated_at > first.updated_at);
}

#[tokio::test]
async fn test_batch_indexing_survives_per_item_failures() {
    let store = MemoryStore::new();
    let indexer = indexer_over(store.clone());

    let ids: Vec<Uuid> = (0..25)
        .map(|i| store.add_transcript(make_transcript(&format!("Video {}", i))))
        .collect();

    // Three poisoned ids spread across the three batches
    store.fail_upserts_for(ids[2]);
    store.fail_upserts_for(ids[11]);
    store.fail_upserts_for(ids[24]);

    let indexed = indexer.batch_index_transcripts(&ids, Some(10)).await;

    assert_eq!(indexed, 22);
    assert_eq!(store.index_count(), 22);
    // Every id was attempted; failures did not abort the run
    assert_eq!(store.find_calls.load(Ordering::Relaxed), 25);
}

#[tokio::test]
async fn test_batch_indexing_skips_missing_transcripts() {
    let store = MemoryStore::new();
    let indexer = indexer_over(store.clone());

    let mut ids: Vec<Uuid> = (0..3)
        .map(|i| store.add_transcript(make_transcript(&format!("Video {}", i))))
        .collect();
    ids.push(Uuid::new_v4());
    ids.push(Uuid::new_v4());

    let indexed = indexer.batch_index_transcripts(&ids, None).await;

    assert_eq!(indexed, 3);
}

#[tokio::test]
async fn test_index_all_unindexed_only_touches_missing_rows() {
    let store = MemoryStore::new();
    let indexer = indexer_over(store.clone());

    let indexed_id = store.add_transcript(make_transcript("Already Indexed"));
    store.add_transcript(make_transcript("Fresh One"));
    store.add_transcript(make_transcript("Fresh Two"));
    assert!(indexer.index_transcript(indexed_id).await.unwrap());

    let count = indexer.index_all_unindexed_transcripts().await.unwrap();

    assert_eq!(count, 2);
    assert_eq!(store.index_count(), 3);
}

#[tokio::test]
async fn test_reindex_all_covers_every_completed_transcript() {
    let store = MemoryStore::new();
    let indexer = indexer_over(store.clone());

    for i in 0..4 {
        store.add_transcript(make_transcript(&format!("Video {}", i)));
    }
    let mut pending = make_transcript("Still Processing");
    pending.status = TranscriptStatus::Processing;
    store.add_transcript(pending);

    let count = indexer.reindex_all_transcripts(Some(2)).await.unwrap();

    assert_eq!(count, 4);
    assert_eq!(store.index_count(), 4);
}

#[tokio::test]
async fn test_remove_index_treats_absent_row_as_success() {
    let store = MemoryStore::new();
    let indexer = indexer_over(store.clone());
    let id = store.add_transcript(make_transcript("Video"));

    assert!(indexer.index_transcript(id).await.unwrap());
    assert!(indexer.remove_index(id).await.unwrap());
    assert_eq!(store.index_count(), 0);

    // Second removal: the row is gone, still success
    assert!(indexer.remove_index(id).await.unwrap());
}

#[tokio::test]
async fn test_index_stats_are_derived_from_the_store() {
    let store = MemoryStore::new();
    let indexer = indexer_over(store.clone());

    let mut spanish = make_transcript("Video Uno");
    spanish.language = "es".to_string();
    let es_id = store.add_transcript(spanish);
    let en_id = store.add_transcript(make_transcript("Video One"));
    store.add_transcript(make_transcript("Unindexed"));

    assert!(indexer.index_transcript(es_id).await.unwrap());
    assert!(indexer.index_transcript(en_id).await.unwrap());

    let stats = indexer.get_index_stats().await.unwrap();

    assert_eq!(stats.total_indexes, 2);
    assert_eq!(stats.unindexed_count, 1);
    assert!(stats.average_token_count > 0.0);
    assert!(stats.last_indexed.is_some());
    assert_eq!(stats.indexes_by_language.len(), 2);

    let es = stats
        .indexes_by_language
        .iter()
        .find(|l| l.language == "es")
        .unwrap();
    assert_eq!(es.count, 1);
}
