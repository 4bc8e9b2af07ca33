//! regsync-provision: Venus OS device provisioning.
//!
//! Expands a [`ProvisionPlan`] into its fixed command sequence (package
//! index update, package installs, archive extraction to the install root,
//! second-stage installer) and executes it sequentially, stopping at the
//! first failure.

pub mod error;
pub mod plan;
pub mod runner;

pub use error::{ProvisionError, Result};
pub use plan::{ProvisionPlan, ProvisionStep, StepKind};
pub use runner::{is_opkg_available, ProvisionReport, Provisioner, StepResult};
