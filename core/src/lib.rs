// vigil/src/lib.rs

//! Vigil: a deterministic conditional-event evaluation and triggering engine
//! for BPMN-style process runtimes.
//!
//! Vigil decides, for every variable write in a running process instance,
//! which waiting conditional catch points become satisfied and what firing
//! them does to the element tree:
//!  - A live scope tree with variable shadowing along the parent chain.
//!  - Boundary, event-subprocess start and intermediate catch conditions,
//!    interrupting or not, with variable name and event filters.
//!  - Top-down evaluation: outer interrupting catches pre-empt inner ones.
//!  - Root-level conditional start events.
//!  - An append-only record log, asynchronous exporters and replay from the
//!    command journal with byte-identical output.

pub mod config;
pub mod core;
pub mod definition;
pub mod engine;
pub mod error;
pub mod expression;
pub mod log;
pub mod scope;
pub mod subscription;

// --- Re-exports for the Public API ---

pub use crate::config::EngineConfig;
pub use crate::core::control::{CandidateOutcome, CommandOutcome, DispatchSummary, Processed};
pub use crate::core::keys::{DefinitionKey, KeyGenerator, ProcessInstanceKey, ScopeKey, SubscriptionKey};
pub use crate::core::shared::Shared;
pub use crate::core::value::{VariableChange, VariableEvent, Variables};

pub use crate::definition::{ConditionalStartEvent, ProcessDefinition, ProcessModel};

// The engine and the commands it is driven by
pub use crate::engine::{
  ActivateElement, CollectingFailureSink, Command, ConditionalStartCommand, Engine, EvaluationFailure, FailureSink,
  TracingFailureSink, TriggerCommand, VariableBatch,
};

pub use crate::error::{RejectionType, VigilError, VigilResult};
pub use crate::expression::{ConditionEvaluator, EvalError, ExpressionEvaluator, VariableResolver};

pub use crate::log::{
  ElementCommand, ElementIntent, Exporter, ExporterDirector, Record, RecordLog, RecordType, RecordValue,
  RecordingExporter, SubscriptionIntent,
};

pub use crate::scope::{ElementState, ScopeKind, ScopeStore};
pub use crate::subscription::{CatchKind, ConditionalCatchPoint, ConditionalSubscription, SubscriptionRegistry};

/*
    Typical flow:
    1. Deploy a `ProcessModel` (optional; ad-hoc roots work without one).
    2. Create a process instance and activate elements, passing the conditional
       catch points each element owns.
    3. Apply variable batches; the engine evaluates every subscription that can
       see the write and fires the satisfied ones.
    4. Drive the returned element commands (ACTIVATE_FLOW, ...) in the host and
       export the record log.
*/
