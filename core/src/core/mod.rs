pub mod control;
pub mod keys;
pub mod shared;
pub mod value;

// Re-export key types for easier access from other vigil modules (and lib.rs)
pub use control::{CandidateOutcome, CommandOutcome, DispatchSummary, Processed};
pub use keys::{DefinitionKey, KeyGenerator, ProcessInstanceKey, ScopeKey, SubscriptionKey};
pub use shared::Shared;
pub use value::{VariableChange, VariableEvent, Variables};
