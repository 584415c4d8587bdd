//! SQLite-based similarity index.
//!
//! Metadata filters run in SQL; cosine similarity is computed in Rust over
//! the filtered rows.

use super::{
    cosine_similarity, select_embedding, ChunkFilter, IndexedChunk, IndexedEpisode, ScoredChunk,
    SimilarityIndex,
};
use crate::chunking::Chunk;
use crate::error::{PodsiftError, Result};
use crate::transcript::{EpisodeInfo, EpisodeMetrics, TranscriptLine};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rusqlite::types::{Type, Value};
use rusqlite::{params, params_from_iter, Connection, Row};
use std::path::Path;
use std::sync::{Mutex, MutexGuard};
use tracing::{debug, info, instrument};
use uuid::Uuid;

const SCHEMA: &str = r#"
    CREATE TABLE IF NOT EXISTS chunks (
        chunk_id TEXT PRIMARY KEY,
        episode_id TEXT NOT NULL,
        chunk_index INTEGER NOT NULL,
        start_time REAL NOT NULL,
        end_time REAL NOT NULL,
        original_start_time REAL NOT NULL,
        original_end_time REAL NOT NULL,
        text TEXT NOT NULL,
        text_with_speaker TEXT NOT NULL,
        speaker TEXT NOT NULL,
        episode_name TEXT NOT NULL,
        release_date TEXT,
        guest_name TEXT,
        episode_description TEXT,
        metrics_json TEXT NOT NULL,
        embedding BLOB NOT NULL,
        speaker_embedding BLOB,
        indexed_at TEXT NOT NULL
    );

    CREATE INDEX IF NOT EXISTS idx_chunks_episode_start ON chunks(episode_id, start_time);

    CREATE TABLE IF NOT EXISTS episode_lines (
        episode_id TEXT PRIMARY KEY,
        lines_json TEXT NOT NULL,
        line_count INTEGER NOT NULL,
        stored_at TEXT NOT NULL
    );
"#;

const CHUNK_COLUMNS: &str = "chunk_id, episode_id, chunk_index, start_time, end_time, \
     original_start_time, original_end_time, text, text_with_speaker, speaker, \
     episode_name, release_date, guest_name, episode_description, metrics_json, embedding, \
     speaker_embedding";

/// SQLite-based vector store.
pub struct SqliteVectorStore {
    conn: Mutex<Connection>,
}

impl SqliteVectorStore {
    /// Open (or create) the store at `path`.
    #[instrument(skip_all)]
    pub fn new(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let conn = Connection::open(path)?;
        conn.execute_batch("PRAGMA journal_mode=WAL;")?;
        conn.execute_batch(SCHEMA)?;

        info!("Initialized SQLite vector store at {:?}", path);

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Create an in-memory SQLite vector store (useful for testing).
    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch(SCHEMA)?;

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| PodsiftError::VectorStore(format!("Failed to acquire lock: {}", e)))
    }

    /// Serialize embedding to bytes.
    fn embedding_to_bytes(embedding: &[f32]) -> Vec<u8> {
        embedding.iter().flat_map(|f| f.to_le_bytes()).collect()
    }

    /// Deserialize embedding from bytes.
    fn bytes_to_embedding(bytes: &[u8]) -> Vec<f32> {
        bytes
            .chunks_exact(4)
            .map(|chunk| {
                let arr: [u8; 4] = chunk.try_into().unwrap_or_default();
                f32::from_le_bytes(arr)
            })
            .collect()
    }

    /// `WHERE` clause and its bound values for `filter`.
    fn where_clause(filter: &ChunkFilter) -> (String, Vec<Value>) {
        let mut conditions = Vec::new();
        let mut values = Vec::new();

        if let Some(episode_id) = &filter.episode_id {
            conditions.push("episode_id = ?");
            values.push(Value::Text(episode_id.clone()));
        }
        if let Some(range) = &filter.start_time {
            if let Some(gte) = range.gte {
                conditions.push("start_time >= ?");
                values.push(Value::Real(gte));
            }
            if let Some(lte) = range.lte {
                conditions.push("start_time <= ?");
                values.push(Value::Real(lte));
            }
        }

        if conditions.is_empty() {
            (String::new(), values)
        } else {
            (format!("WHERE {}", conditions.join(" AND ")), values)
        }
    }

    /// Map a row selected with [`CHUNK_COLUMNS`] to a chunk and its text and
    /// speaker embeddings.
    fn row_to_chunk(row: &Row<'_>) -> rusqlite::Result<(Chunk, Vec<f32>, Option<Vec<f32>>)> {
        let id_str: String = row.get(0)?;
        let chunk_id = Uuid::parse_str(&id_str)
            .map_err(|e| rusqlite::Error::FromSqlConversionFailure(0, Type::Text, Box::new(e)))?;
        let metrics_json: String = row.get(14)?;
        let metrics: EpisodeMetrics = serde_json::from_str(&metrics_json)
            .map_err(|e| rusqlite::Error::FromSqlConversionFailure(14, Type::Text, Box::new(e)))?;
        let embedding_bytes: Vec<u8> = row.get(15)?;
        let speaker_bytes: Option<Vec<u8>> = row.get(16)?;

        let chunk = Chunk {
            chunk_id,
            episode: EpisodeInfo {
                episode_id: row.get(1)?,
                episode_name: row.get(10)?,
                release_date: row.get(11)?,
                guest_name: row.get(12)?,
                episode_description: row.get(13)?,
            },
            chunk_index: row.get(2)?,
            start_time: row.get(3)?,
            end_time: row.get(4)?,
            original_start_time: row.get(5)?,
            original_end_time: row.get(6)?,
            text: row.get(7)?,
            text_with_speaker: row.get(8)?,
            speaker: row.get(9)?,
            metrics,
        };

        Ok((
            chunk,
            Self::bytes_to_embedding(&embedding_bytes),
            speaker_bytes.as_deref().map(Self::bytes_to_embedding),
        ))
    }

    fn parse_timestamp(s: &str) -> DateTime<Utc> {
        DateTime::parse_from_rfc3339(s)
            .map(|dt| dt.with_timezone(&Utc))
            .unwrap_or_else(|_| Utc::now())
    }
}

#[async_trait]
impl SimilarityIndex for SqliteVectorStore {
    #[instrument(skip(self, chunks), fields(count = chunks.len()))]
    async fn upsert_batch(&self, chunks: &[IndexedChunk]) -> Result<usize> {
        let conn = self.lock()?;
        let tx = conn.unchecked_transaction()?;

        for indexed in chunks {
            let chunk = &indexed.chunk;
            let metrics_json = serde_json::to_string(&chunk.metrics)?;

            tx.execute(
                r#"
                INSERT OR REPLACE INTO chunks
                (chunk_id, episode_id, chunk_index, start_time, end_time,
                 original_start_time, original_end_time, text, text_with_speaker, speaker,
                 episode_name, release_date, guest_name, episode_description,
                 metrics_json, embedding, speaker_embedding, indexed_at)
                VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?17, ?18)
                "#,
                params![
                    chunk.chunk_id.to_string(),
                    chunk.episode.episode_id,
                    chunk.chunk_index,
                    chunk.start_time,
                    chunk.end_time,
                    chunk.original_start_time,
                    chunk.original_end_time,
                    chunk.text,
                    chunk.text_with_speaker,
                    chunk.speaker,
                    chunk.episode.episode_name,
                    chunk.episode.release_date,
                    chunk.episode.guest_name,
                    chunk.episode.episode_description,
                    metrics_json,
                    Self::embedding_to_bytes(&indexed.embedding),
                    indexed
                        .speaker_embedding
                        .as_deref()
                        .map(Self::embedding_to_bytes),
                    indexed.indexed_at.to_rfc3339(),
                ],
            )?;
        }

        tx.commit()?;
        info!("Batch upserted {} chunks", chunks.len());
        Ok(chunks.len())
    }

    #[instrument(skip(self, embedding))]
    async fn query(
        &self,
        embedding: &[f32],
        filter: &ChunkFilter,
        top_k: usize,
    ) -> Result<Vec<ScoredChunk>> {
        let conn = self.lock()?;
        let (where_sql, values) = Self::where_clause(filter);

        let mut stmt = conn.prepare(&format!("SELECT {} FROM chunks {}", CHUNK_COLUMNS, where_sql))?;
        let rows = stmt.query_map(params_from_iter(values), Self::row_to_chunk)?;

        let mut results = Vec::new();
        for row in rows {
            let (chunk, text, speaker) = row?;
            let stored = select_embedding(filter.variant, &text, speaker.as_deref());
            results.push(ScoredChunk {
                score: cosine_similarity(embedding, stored),
                chunk,
            });
        }

        results.sort_by(|a, b| b.score.total_cmp(&a.score));
        results.truncate(top_k);

        debug!("Found {} matching chunks", results.len());
        Ok(results)
    }

    #[instrument(skip(self))]
    async fn fetch(&self, filter: &ChunkFilter, limit: usize) -> Result<Vec<Chunk>> {
        let conn = self.lock()?;
        let (where_sql, mut values) = Self::where_clause(filter);
        values.push(Value::Integer(i64::try_from(limit).unwrap_or(i64::MAX)));

        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM chunks {} ORDER BY start_time, chunk_index LIMIT ?",
            CHUNK_COLUMNS, where_sql
        ))?;
        let chunks = stmt
            .query_map(params_from_iter(values), |row| {
                Self::row_to_chunk(row).map(|(chunk, _, _)| chunk)
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        Ok(chunks)
    }

    #[instrument(skip(self))]
    async fn delete_episode(&self, episode_id: &str) -> Result<usize> {
        let conn = self.lock()?;
        let deleted = conn.execute("DELETE FROM chunks WHERE episode_id = ?1", params![episode_id])?;

        info!("Deleted {} chunks for episode {}", deleted, episode_id);
        Ok(deleted)
    }

    #[instrument(skip(self))]
    async fn list_episodes(&self) -> Result<Vec<IndexedEpisode>> {
        let conn = self.lock()?;

        let mut stmt = conn.prepare(
            r#"
            SELECT episode_id, MIN(episode_name), MIN(guest_name), MIN(release_date),
                   COUNT(*) AS chunk_count, MAX(end_time), MAX(indexed_at) AS indexed_at
            FROM chunks
            GROUP BY episode_id
            ORDER BY indexed_at DESC
            "#,
        )?;

        let episodes = stmt
            .query_map([], |row| {
                let indexed_at_str: String = row.get(6)?;
                Ok(IndexedEpisode {
                    episode_id: row.get(0)?,
                    episode_name: row.get(1)?,
                    guest_name: row.get(2)?,
                    release_date: row.get(3)?,
                    chunk_count: row.get(4)?,
                    total_duration_seconds: row.get(5)?,
                    indexed_at: Self::parse_timestamp(&indexed_at_str),
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        Ok(episodes)
    }

    async fn is_episode_indexed(&self, episode_id: &str) -> Result<bool> {
        let conn = self.lock()?;
        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM chunks WHERE episode_id = ?1",
            params![episode_id],
            |row| row.get(0),
        )?;
        Ok(count > 0)
    }

    async fn chunk_count(&self) -> Result<usize> {
        let conn = self.lock()?;
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM chunks", [], |row| row.get(0))?;
        Ok(count as usize)
    }

    #[instrument(skip(self, lines), fields(count = lines.len()))]
    async fn store_lines(&self, episode_id: &str, lines: &[TranscriptLine]) -> Result<()> {
        let conn = self.lock()?;
        let lines_json = serde_json::to_string(lines)?;

        conn.execute(
            r#"
            INSERT OR REPLACE INTO episode_lines (episode_id, lines_json, line_count, stored_at)
            VALUES (?1, ?2, ?3, ?4)
            "#,
            params![episode_id, lines_json, lines.len() as i64, Utc::now().to_rfc3339()],
        )?;

        debug!("Stored {} lines for episode {}", lines.len(), episode_id);
        Ok(())
    }

    async fn get_lines(&self, episode_id: &str) -> Result<Option<Vec<TranscriptLine>>> {
        let conn = self.lock()?;

        let result = conn.query_row(
            "SELECT lines_json FROM episode_lines WHERE episode_id = ?1",
            params![episode_id],
            |row| row.get::<_, String>(0),
        );

        match result {
            Ok(json) => Ok(Some(serde_json::from_str(&json)?)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    async fn list_stored_episodes(&self) -> Result<Vec<String>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare("SELECT episode_id FROM episode_lines ORDER BY episode_id")?;
        let ids = stmt
            .query_map([], |row| row.get(0))?
            .collect::<rusqlite::Result<Vec<String>>>()?;
        Ok(ids)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embedding::EmbeddingVariant;
    use crate::vector_store::test_support::{chunk, indexed};

    #[tokio::test]
    async fn test_sqlite_vector_store() {
        let store = SqliteVectorStore::in_memory().unwrap();

        let mut first = chunk("ep1", 0, 30.0, "This is test content");
        first.metrics.views = Some(1200);
        let second = chunk("ep1", 1, 100.0, "More content");

        store
            .upsert_batch(&[
                indexed(first.clone(), vec![1.0, 0.0, 0.0]),
                indexed(second, vec![0.0, 1.0, 0.0]),
            ])
            .await
            .unwrap();

        let episodes = store.list_episodes().await.unwrap();
        assert_eq!(episodes.len(), 1);
        assert_eq!(episodes[0].episode_id, "ep1");
        assert_eq!(episodes[0].chunk_count, 2);
        assert_eq!(episodes[0].guest_name.as_deref(), Some("Jane Doe"));

        let results = store
            .query(&[1.0, 0.0, 0.0], &ChunkFilter::any(), 10)
            .await
            .unwrap();
        assert_eq!(results.len(), 2);
        assert!((results[0].score - 1.0).abs() < 0.001);
        assert_eq!(results[0].chunk, first);

        let deleted = store.delete_episode("ep1").await.unwrap();
        assert_eq!(deleted, 2);
        assert!(store.list_episodes().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_filtered_query_and_fetch() {
        let store = SqliteVectorStore::in_memory().unwrap();
        store
            .upsert_batch(&[
                indexed(chunk("ep1", 0, 10.0, "a"), vec![1.0, 0.0]),
                indexed(chunk("ep1", 1, 40.0, "b"), vec![0.9, 0.1]),
                indexed(chunk("ep1", 2, 75.0, "c"), vec![0.8, 0.2]),
                indexed(chunk("ep2", 0, 20.0, "d"), vec![1.0, 0.0]),
            ])
            .await
            .unwrap();

        let window = ChunkFilter::episode("ep1").between(Some(10.0), Some(70.0));
        let results = store.query(&[1.0, 0.0], &window, 100).await.unwrap();
        let mut texts: Vec<&str> = results.iter().map(|r| r.chunk.text.as_str()).collect();
        texts.sort();
        assert_eq!(texts, vec!["a", "b"]);

        let fetched = store.fetch(&ChunkFilter::episode("ep1"), 2).await.unwrap();
        let texts: Vec<&str> = fetched.iter().map(|c| c.text.as_str()).collect();
        assert_eq!(texts, vec!["a", "b"]);

        assert_eq!(store.chunk_count().await.unwrap(), 4);
    }

    #[tokio::test]
    async fn test_speaker_embeddings_round_trip() {
        let store = SqliteVectorStore::in_memory().unwrap();
        store
            .upsert_batch(&[
                indexed(chunk("ep1", 0, 10.0, "plain"), vec![1.0, 0.0]),
                indexed(chunk("ep1", 1, 20.0, "labelled"), vec![0.0, 1.0])
                    .with_speaker_embedding(vec![1.0, 0.0]),
            ])
            .await
            .unwrap();

        let text = store.query(&[1.0, 0.0], &ChunkFilter::any(), 10).await.unwrap();
        assert_eq!(text[0].chunk.text, "plain");
        assert!(text[1].score.abs() < 0.001);

        let speaker = ChunkFilter::any().scored_by(EmbeddingVariant::Speaker);
        let results = store.query(&[1.0, 0.0], &speaker, 10).await.unwrap();
        assert!(results.iter().all(|r| (r.score - 1.0).abs() < 0.001));
    }

    #[tokio::test]
    async fn test_line_storage() {
        let store = SqliteVectorStore::in_memory().unwrap();
        assert!(store.get_lines("ep1").await.unwrap().is_none());

        let line: TranscriptLine = serde_json::from_str(
            r#"{"episode_id":"ep1","episode_name":"One","speaker":"Host",
                "line_text":"Hello there.","start_time_seconds":0.0,"end_time_seconds":2.0}"#,
        )
        .unwrap();
        store.store_lines("ep1", &[line.clone()]).await.unwrap();

        let lines = store.get_lines("ep1").await.unwrap().unwrap();
        assert_eq!(lines.len(), 1);
        assert_eq!(lines[0].line_text, "Hello there.");
        assert_eq!(store.list_stored_episodes().await.unwrap(), vec!["ep1"]);
    }
}
