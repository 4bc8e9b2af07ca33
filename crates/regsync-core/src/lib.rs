//! regsync core library.
//!
//! Domain model and shared services for keeping generated Modbus register
//! tables in sync with upstream releases: register catalogs and manifest
//! validation, code generation, register-word decoding, git integration,
//! the run ledger, and observability hooks.

pub mod codegen;
pub mod decode;
pub mod domain;
pub mod git;
pub mod ledger;
pub mod obs;
pub mod tables;
pub mod telemetry;

pub use domain::{
    compile_manifest, CatalogEntry, CellRegisterDef, Manifest, RegisterCatalog, RegisterDef,
    RegisterKind, RegsyncError, Result, ValidationError, VersionedCellMap, VersionedRegisterMap,
};

pub use codegen::{render_into, render_module, splice, CodegenOptions, Rendered};
pub use decode::{decode_words, plan_cell_field, plan_field, DecodeError, FieldAccess, RegisterValue};
pub use git::{capture_head_sha, commit_paths, head_commit_paths, is_git_repo};
pub use ledger::fs::FsRunLedger;
pub use ledger::memory::MemoryRunLedger;
pub use ledger::{
    LedgerError, LedgerResult, RunEvent, RunId, RunLedger, RunMetadata, RunRecord, RunStatus,
    RunSummary,
};
pub use obs::{
    emit_commit_created, emit_gate_evaluated, emit_stage_finished, emit_stage_started,
    emit_sync_finished, emit_sync_started, RunSpan,
};
pub use telemetry::init_tracing;

/// regsync version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
