//! Tariff schedule knowledge base
//!
//! The tariff schedule is split into paragraph chunks, embedded once and
//! stored as a flat vector index on disk. Queries return the chunks nearest
//! to a product description.

mod chunker;
mod flat;
mod index;

pub use chunker::split_paragraphs;
pub use flat::{squared_euclidean, FlatIndex};
pub use index::{IndexArtifact, KnowledgeChunk, KnowledgeIndex, CHUNKS_FILE, INDEX_FILE};
