//! Domain model: register maps, upstream manifests, validation, errors.

pub mod error;
pub mod manifest;
pub mod register;
pub mod validation;

pub use error::{RegsyncError, Result, ValidationError};
pub use manifest::{compile_manifest, CatalogEntry, Manifest};
pub use register::{
    CellRegisterDef, RegisterCatalog, RegisterDef, RegisterKind, VersionedCellMap,
    VersionedRegisterMap,
};
