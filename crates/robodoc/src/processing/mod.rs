//! Document processing pipeline
//!
//! Each uploaded document is driven through the stages on its own task.
//! Stage results are persisted as they are produced and the first fatal or
//! business-blocking outcome ends processing.

mod classifier;
mod orchestrator;
mod source;
mod stage;

pub use classifier::TariffClassifier;
pub use orchestrator::DocumentPipeline;
pub use source::SourceFile;
pub use stage::{bounded, Stage, StageOutcome};
