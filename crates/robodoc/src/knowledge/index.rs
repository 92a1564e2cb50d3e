//! Tariff knowledge index: build, persist, load and query

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::OnceCell;

use crate::config::KnowledgeConfig;
use crate::error::{Error, Result};
use crate::providers::EmbeddingProvider;

use super::chunker::split_paragraphs;
use super::flat::FlatIndex;

/// File holding the flat index structure
pub const INDEX_FILE: &str = "tariff_index.bin";
/// File holding the ordered chunk texts
pub const CHUNKS_FILE: &str = "tariff_chunks.bin";

const ARTIFACT_VERSION: u32 = 1;

/// One paragraph of the tariff schedule with its embedding
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KnowledgeChunk {
    /// Position in the source document
    pub ordinal: usize,
    pub text: String,
    pub embedding: Vec<f32>,
}

#[derive(Serialize, Deserialize)]
struct PersistedIndex {
    version: u32,
    embedding_model: String,
    source_sha256: String,
    index: FlatIndex,
}

/// Built index plus its parallel chunk list
#[derive(Debug, Clone)]
pub struct IndexArtifact {
    index: FlatIndex,
    chunks: Vec<String>,
    embedding_model: String,
    source_sha256: String,
}

impl IndexArtifact {
    /// Chunk and embed `source_text` into a new artifact
    pub async fn build(source_text: &str, embedder: &dyn EmbeddingProvider) -> Result<Self> {
        let chunks = split_paragraphs(source_text);
        if chunks.is_empty() {
            return Err(Error::knowledge_base("Tariff schedule contains no text"));
        }

        tracing::info!(
            "Embedding {} tariff chunks with {}...",
            chunks.len(),
            embedder.name()
        );

        let embeddings = embedder
            .embed_batch(&chunks)
            .await
            .map_err(|e| Error::knowledge_base(format!("Failed to embed tariff schedule: {}", e)))?;

        if embeddings.len() != chunks.len() {
            return Err(Error::knowledge_base(format!(
                "Embedder returned {} vectors for {} chunks",
                embeddings.len(),
                chunks.len()
            )));
        }

        let dimensions = embeddings.first().map(Vec::len).unwrap_or_default();
        if dimensions == 0 {
            return Err(Error::knowledge_base("Embedder returned empty vectors"));
        }

        let mut index = FlatIndex::new(dimensions);
        for embedding in &embeddings {
            index.add(embedding)?;
        }

        Ok(Self {
            index,
            chunks,
            embedding_model: embedder.name().to_string(),
            source_sha256: sha256_hex(source_text),
        })
    }

    pub fn len(&self) -> usize {
        self.chunks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }

    pub fn dimensions(&self) -> usize {
        self.index.dimensions()
    }

    /// The `k` chunks nearest to `query_embedding`, closest first
    pub fn search(&self, query_embedding: &[f32], k: usize) -> Result<Vec<KnowledgeChunk>> {
        self.index
            .search(query_embedding, k)?
            .into_iter()
            .map(|(ordinal, _)| self.chunk(ordinal))
            .collect()
    }

    fn chunk(&self, ordinal: usize) -> Result<KnowledgeChunk> {
        match (self.chunks.get(ordinal), self.index.vector(ordinal)) {
            (Some(text), Some(vector)) => Ok(KnowledgeChunk {
                ordinal,
                text: text.clone(),
                embedding: vector.to_vec(),
            }),
            _ => Err(Error::knowledge_base(format!("Chunk {} missing from artifact", ordinal))),
        }
    }

    /// Whether a complete artifact exists in `dir`
    ///
    /// The index file is written last, so its presence marks a complete pair.
    pub fn exists(dir: &Path) -> bool {
        dir.join(INDEX_FILE).is_file()
    }

    /// Persist the chunk list and the index to `dir`
    pub fn save(&self, dir: &Path) -> Result<()> {
        std::fs::create_dir_all(dir)?;

        let chunks = bincode::serde::encode_to_vec(&self.chunks, bincode::config::standard())
            .map_err(|e| Error::knowledge_base(format!("Failed to encode chunk list: {}", e)))?;

        let persisted = PersistedIndex {
            version: ARTIFACT_VERSION,
            embedding_model: self.embedding_model.clone(),
            source_sha256: self.source_sha256.clone(),
            index: self.index.clone(),
        };
        let index = bincode::serde::encode_to_vec(&persisted, bincode::config::standard())
            .map_err(|e| Error::knowledge_base(format!("Failed to encode index: {}", e)))?;

        write_atomic(dir, CHUNKS_FILE, &chunks)?;
        write_atomic(dir, INDEX_FILE, &index)?;
        Ok(())
    }

    /// Load a persisted artifact from `dir`
    pub fn load(dir: &Path) -> Result<Self> {
        let index_bytes = std::fs::read(dir.join(INDEX_FILE))
            .map_err(|e| Error::knowledge_base(format!("Failed to read {}: {}", INDEX_FILE, e)))?;
        let chunk_bytes = std::fs::read(dir.join(CHUNKS_FILE))
            .map_err(|e| Error::knowledge_base(format!("Failed to read {}: {}", CHUNKS_FILE, e)))?;

        let (persisted, _): (PersistedIndex, usize) =
            bincode::serde::decode_from_slice(&index_bytes, bincode::config::standard())
                .map_err(|e| Error::knowledge_base(format!("Corrupt index file: {}", e)))?;
        let (chunks, _): (Vec<String>, usize) =
            bincode::serde::decode_from_slice(&chunk_bytes, bincode::config::standard())
                .map_err(|e| Error::knowledge_base(format!("Corrupt chunk list: {}", e)))?;

        if persisted.version != ARTIFACT_VERSION {
            return Err(Error::knowledge_base(format!(
                "Unsupported index version {} (expected {})",
                persisted.version, ARTIFACT_VERSION
            )));
        }
        if !persisted.index.is_well_formed() {
            return Err(Error::knowledge_base(format!(
                "Index data does not split into {}-dimensional vectors",
                persisted.index.dimensions()
            )));
        }
        if persisted.index.len() != chunks.len() {
            return Err(Error::knowledge_base(format!(
                "Index holds {} vectors but chunk list has {} entries",
                persisted.index.len(),
                chunks.len()
            )));
        }

        Ok(Self {
            index: persisted.index,
            chunks,
            embedding_model: persisted.embedding_model,
            source_sha256: persisted.source_sha256,
        })
    }

    /// Delete a persisted artifact so the next start rebuilds it
    pub fn remove(dir: &Path) -> Result<()> {
        for name in [INDEX_FILE, CHUNKS_FILE] {
            let path = dir.join(name);
            if path.exists() {
                std::fs::remove_file(&path)?;
            }
        }
        Ok(())
    }
}

/// Nearest-neighbor lookup over the tariff schedule
///
/// The artifact is loaded from disk, or built from the tariff source when
/// absent, on first use. Concurrent first callers share one build.
pub struct KnowledgeIndex {
    tariff_source: PathBuf,
    index_dir: PathBuf,
    embedder: Arc<dyn EmbeddingProvider>,
    artifact: OnceCell<Arc<IndexArtifact>>,
}

impl KnowledgeIndex {
    pub fn new(config: &KnowledgeConfig, embedder: Arc<dyn EmbeddingProvider>) -> Self {
        Self {
            tariff_source: config.tariff_source.clone(),
            index_dir: config.index_dir.clone(),
            embedder,
            artifact: OnceCell::new(),
        }
    }

    /// Wrap an already built artifact
    pub fn from_artifact(artifact: IndexArtifact, embedder: Arc<dyn EmbeddingProvider>) -> Self {
        Self {
            tariff_source: PathBuf::new(),
            index_dir: PathBuf::new(),
            embedder,
            artifact: OnceCell::new_with(Some(Arc::new(artifact))),
        }
    }

    /// Load or build the artifact now instead of on the first query
    pub async fn ensure_ready(&self) -> Result<()> {
        self.artifact().await.map(|_| ())
    }

    pub fn is_ready(&self) -> bool {
        self.artifact.initialized()
    }

    /// Chunks most relevant to `text`, closest match first
    pub async fn query(&self, text: &str, k: usize) -> Result<Vec<KnowledgeChunk>> {
        let artifact = self.artifact().await?;
        let query_embedding = self
            .embedder
            .embed(text)
            .await
            .map_err(|e| Error::knowledge_base(format!("Failed to embed query: {}", e)))?;
        artifact.search(&query_embedding, k)
    }

    /// Delete the persisted artifact
    ///
    /// The loaded artifact keeps serving queries; the next process start
    /// rebuilds from the tariff source.
    pub async fn invalidate(&self) -> Result<()> {
        if self.index_dir.as_os_str().is_empty() {
            return Ok(());
        }
        let dir = self.index_dir.clone();
        tokio::task::spawn_blocking(move || IndexArtifact::remove(&dir))
            .await
            .map_err(|e| Error::Internal(format!("Task join error: {}", e)))??;
        tracing::info!("Removed tariff index artifact from {}", self.index_dir.display());
        Ok(())
    }

    async fn artifact(&self) -> Result<&Arc<IndexArtifact>> {
        self.artifact
            .get_or_try_init(|| async { self.load_or_build().await.map(Arc::new) })
            .await
    }

    async fn load_or_build(&self) -> Result<IndexArtifact> {
        if IndexArtifact::exists(&self.index_dir) {
            let dir = self.index_dir.clone();
            let artifact = tokio::task::spawn_blocking(move || IndexArtifact::load(&dir))
                .await
                .map_err(|e| Error::Internal(format!("Task join error: {}", e)))??;

            self.warn_if_source_changed(&artifact).await;
            tracing::info!(
                "Loaded tariff index: {} chunks, {} dimensions",
                artifact.len(),
                artifact.dimensions()
            );
            return Ok(artifact);
        }

        tracing::info!(
            "No tariff index at {}, building from {}",
            self.index_dir.display(),
            self.tariff_source.display()
        );

        let source = tokio::fs::read_to_string(&self.tariff_source).await.map_err(|e| {
            Error::knowledge_base(format!(
                "Tariff schedule not found at {}: {}",
                self.tariff_source.display(),
                e
            ))
        })?;

        let artifact = IndexArtifact::build(&source, self.embedder.as_ref()).await?;

        let dir = self.index_dir.clone();
        let to_save = artifact.clone();
        tokio::task::spawn_blocking(move || to_save.save(&dir))
            .await
            .map_err(|e| Error::Internal(format!("Task join error: {}", e)))??;

        tracing::info!(
            "Built tariff index: {} chunks persisted to {}",
            artifact.len(),
            self.index_dir.display()
        );
        Ok(artifact)
    }

    async fn warn_if_source_changed(&self, artifact: &IndexArtifact) {
        if let Ok(source) = tokio::fs::read_to_string(&self.tariff_source).await {
            if sha256_hex(&source) != artifact.source_sha256 {
                tracing::warn!(
                    "Tariff schedule changed since the index was built; delete {} to rebuild",
                    self.index_dir.display()
                );
            }
        }
        if artifact.embedding_model != self.embedder.name() {
            tracing::warn!(
                "Index was built with '{}' but queries use '{}'",
                artifact.embedding_model,
                self.embedder.name()
            );
        }
    }
}

/// Write `bytes` to `dir/name` via a temp file and rename
fn write_atomic(dir: &Path, name: &str, bytes: &[u8]) -> Result<()> {
    let mut tmp = tempfile::NamedTempFile::new_in(dir)?;
    tmp.write_all(bytes)?;
    tmp.as_file().sync_all()?;
    tmp.persist(dir.join(name))
        .map_err(|e| Error::knowledge_base(format!("Failed to persist {}: {}", name, e.error)))?;
    Ok(())
}

fn sha256_hex(text: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(text.as_bytes());
    hex::encode(hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::HashEmbedder;

    const SCHEDULE: &str = "\
Chapter 85: Electrical machinery and equipment and parts thereof

8517.13 Smartphones and mobile telephones for cellular networks

8504.40 Static converters, battery chargers for phones

Chapter 64: Footwear, gaiters and the like

6403.99 Leather shoes with rubber soles

Chapter 73: Articles of iron or steel

7318.15 Steel screws and bolts, threaded";

    fn config(dir: &Path) -> KnowledgeConfig {
        KnowledgeConfig {
            tariff_source: dir.join("tariff_schedule.txt"),
            index_dir: dir.join("index"),
            top_k: 3,
        }
    }

    #[tokio::test]
    async fn test_build_splits_and_embeds() {
        let embedder = HashEmbedder::new(64);
        let artifact = IndexArtifact::build(SCHEDULE, &embedder).await.unwrap();
        assert_eq!(artifact.len(), 7);
        assert_eq!(artifact.chunks[0], "Chapter 85: Electrical machinery and equipment and parts thereof");
        assert_eq!(artifact.chunks[4], "6403.99 Leather shoes with rubber soles");
        assert_eq!(artifact.chunks[6], "7318.15 Steel screws and bolts, threaded");
        assert_eq!(artifact.dimensions(), 64);
    }

    #[tokio::test]
    async fn test_query_returns_closest_first() {
        let embedder = Arc::new(HashEmbedder::new(256));
        let artifact = IndexArtifact::build(SCHEDULE, embedder.as_ref()).await.unwrap();
        let index = KnowledgeIndex::from_artifact(artifact, embedder);

        let results = index.query("leather shoes with rubber soles", 3).await.unwrap();
        assert_eq!(results.len(), 3);
        assert!(results[0].text.starts_with("6403.99"));
    }

    #[tokio::test]
    async fn test_query_is_deterministic() {
        let embedder = Arc::new(HashEmbedder::new(64));
        let artifact = IndexArtifact::build(SCHEDULE, embedder.as_ref()).await.unwrap();
        let index = KnowledgeIndex::from_artifact(artifact, embedder);

        let first = index.query("mobile phones", 4).await.unwrap();
        let second = index.query("mobile phones", 4).await.unwrap();
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn test_persist_and_reload_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let embedder = Arc::new(HashEmbedder::new(32));
        let built = IndexArtifact::build(SCHEDULE, embedder.as_ref()).await.unwrap();

        built.save(dir.path()).unwrap();
        assert!(IndexArtifact::exists(dir.path()));
        let loaded = IndexArtifact::load(dir.path()).unwrap();

        let query = embedder.embed("steel screws").await.unwrap();
        for k in [1, 3, 20] {
            assert_eq!(built.search(&query, k).unwrap(), loaded.search(&query, k).unwrap());
        }
    }

    #[tokio::test]
    async fn test_lazy_build_persists_artifact() {
        let dir = tempfile::tempdir().unwrap();
        let config = config(dir.path());
        std::fs::write(&config.tariff_source, SCHEDULE).unwrap();

        let index = KnowledgeIndex::new(&config, Arc::new(HashEmbedder::new(32)));
        assert!(!index.is_ready());
        let results = index.query("smartphones", 2).await.unwrap();
        assert_eq!(results.len(), 2);
        assert!(index.is_ready());
        assert!(IndexArtifact::exists(&config.index_dir));

        // A fresh index loads the artifact without touching the source
        std::fs::remove_file(&config.tariff_source).unwrap();
        let reloaded = KnowledgeIndex::new(&config, Arc::new(HashEmbedder::new(32)));
        assert_eq!(reloaded.query("smartphones", 2).await.unwrap(), results);

        reloaded.invalidate().await.unwrap();
        assert!(!IndexArtifact::exists(&config.index_dir));
        assert_eq!(reloaded.query("smartphones", 2).await.unwrap(), results);
        let rebuilt = KnowledgeIndex::new(&config, Arc::new(HashEmbedder::new(32)));
        assert!(matches!(rebuilt.ensure_ready().await, Err(Error::KnowledgeBase(_))));
    }

    #[tokio::test]
    async fn test_missing_source_is_knowledge_base_error() {
        let dir = tempfile::tempdir().unwrap();
        let index = KnowledgeIndex::new(&config(dir.path()), Arc::new(HashEmbedder::new(32)));
        let err = index.query("anything", 1).await.unwrap_err();
        assert!(matches!(err, Error::KnowledgeBase(_)));
        assert!(!index.is_ready());
    }

    #[tokio::test]
    async fn test_concurrent_first_queries_build_once() {
        let dir = tempfile::tempdir().unwrap();
        let config = config(dir.path());
        std::fs::write(&config.tariff_source, SCHEDULE).unwrap();

        let embedder = Arc::new(HashEmbedder::new(32));
        let index = Arc::new(KnowledgeIndex::new(&config, embedder.clone()));

        let queries = (0..8).map(|_| {
            let index = Arc::clone(&index);
            tokio::spawn(async move { index.query("battery chargers", 1).await })
        });
        let results = futures::future::join_all(queries).await;

        for result in results {
            assert_eq!(result.unwrap().unwrap().len(), 1);
        }
        assert_eq!(embedder.batch_calls(), 1);
    }

    #[tokio::test]
    async fn test_remove_forces_rebuild() {
        let dir = tempfile::tempdir().unwrap();
        let embedder = HashEmbedder::new(16);
        let artifact = IndexArtifact::build(SCHEDULE, &embedder).await.unwrap();
        artifact.save(dir.path()).unwrap();

        IndexArtifact::remove(dir.path()).unwrap();
        assert!(!IndexArtifact::exists(dir.path()));
        assert!(!dir.path().join(CHUNKS_FILE).exists());
    }

    #[tokio::test]
    async fn test_empty_schedule_fails() {
        let embedder = HashEmbedder::new(16);
        let err = IndexArtifact::build("\n\n   \n", &embedder).await.unwrap_err();
        assert!(matches!(err, Error::KnowledgeBase(_)));
    }
}
