//! regsync-pipeline: staged sync execution for regsync.
//!
//! A sync run walks a fixed stage sequence (fetch releases, fetch
//! manifests, validate, render, commit), recording every transition into
//! the run ledger. [`SyncGate`] re-derives a pass/fail verdict from the
//! recorded events, including the invariant that a commit only ever touches
//! the declared target file.

pub mod gate;
pub mod pipeline;
pub mod spec;
pub mod stage;

pub use gate::{GateVerdict, SyncGate};
pub use pipeline::{PipelineResult, SyncOutcome, SyncPipeline};
pub use spec::SyncSpec;
pub use stage::{StageOutcome, StageStatus, SyncOptions, SyncStage};
