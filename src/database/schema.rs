/// Database schema definitions
///
/// SQL definitions for the transcripts table and the derived search index
/// rows. Utterances and metadata travel as JSONB and are decoded into typed
/// structs exactly once, at the row boundary.

/// Database schema manager
pub struct DatabaseSchema;

impl DatabaseSchema {
    /// Get the SQL for creating the transcripts table
    pub fn create_transcripts_table_sql() -> &'static str {
        "
        CREATE TABLE IF NOT EXISTS transcripts (
            id UUID PRIMARY KEY,
            video_id VARCHAR(255) UNIQUE NOT NULL,
            title TEXT NOT NULL,
            description TEXT NOT NULL DEFAULT '',
            duration_secs DOUBLE PRECISION NOT NULL DEFAULT 0,
            summary TEXT,
            language VARCHAR(10) NOT NULL DEFAULT 'en',
            utterances JSONB NOT NULL DEFAULT '[]',
            metadata JSONB NOT NULL DEFAULT '{}',
            status TEXT NOT NULL DEFAULT 'pending',
            created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
            updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
        )
        "
    }

    /// Get the SQL for creating the search index table
    pub fn create_search_indexes_table_sql() -> &'static str {
        "
        CREATE TABLE IF NOT EXISTS search_indexes (
            transcript_id UUID PRIMARY KEY REFERENCES transcripts(id) ON DELETE CASCADE,
            content TEXT NOT NULL,
            tokens TEXT[] NOT NULL DEFAULT '{}',
            language VARCHAR(10) NOT NULL DEFAULT 'en',
            updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
        )
        "
    }

    /// Get SQL for creating standard indexes
    pub fn create_indexes_sql() -> Vec<&'static str> {
        vec![
            "CREATE INDEX IF NOT EXISTS idx_transcripts_video_id ON transcripts(video_id)",
            "CREATE INDEX IF NOT EXISTS idx_transcripts_status ON transcripts(status)",
            "CREATE INDEX IF NOT EXISTS idx_transcripts_language ON transcripts(language)",
            "CREATE INDEX IF NOT EXISTS idx_search_indexes_language ON search_indexes(language)",
            "CREATE INDEX IF NOT EXISTS idx_search_indexes_tokens ON search_indexes USING GIN(tokens)",
        ]
    }
}
