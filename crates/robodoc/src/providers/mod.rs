//! Provider abstractions for the pipeline's external capabilities
//!
//! Every oracle, the embedding model, text extraction and the document store
//! sit behind a trait so the orchestrator can be driven by the Ollama-backed
//! adapters in production and by scripted doubles in tests.

pub mod classification;
pub mod document_store;
pub mod embedding;
pub mod extraction;
pub mod ollama;
pub mod supervisor;
pub mod text;

pub use classification::ClassificationProvider;
pub use document_store::DocumentStore;
pub use embedding::EmbeddingProvider;
pub use extraction::ExtractionProvider;
pub use ollama::{OllamaClassifier, OllamaEmbedder, OllamaExtractor};
pub use supervisor::{ConfidenceGateSupervisor, SupervisorProvider};
pub use text::{PdfTextExtractor, TextExtractor};
