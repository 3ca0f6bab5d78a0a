pub mod aggregator;
pub mod batch_store;
pub mod benchmark;
pub mod classifier;
pub mod freshness;
pub mod orchestrator;
pub mod performance;
pub mod pipeline;
pub mod quotes;
pub mod validator;

pub use batch_store::{BatchStore, BatchSummary};
pub use orchestrator::{next_boundary, RecomputeOrchestrator};
pub use pipeline::{SentimentEngine, WeightingPolicy};
pub use quotes::{HttpQuoteClient, QuoteSupplier, StaticQuoteSupplier};
