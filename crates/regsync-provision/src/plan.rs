//! Provisioning plan: the fixed command sequence a device install runs.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// What a provisioning step does.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum StepKind {
    /// Refresh the package index (`opkg update`).
    UpdateIndex,

    /// Install one package (`opkg install <pkg>`).
    InstallPackage,

    /// Extract the bundled archive to the install root.
    ExtractArchive,

    /// Invoke the second-stage installer script.
    RunInstaller,
}

/// One planned step: a kind plus the exact command to run.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ProvisionStep {
    pub kind: StepKind,

    /// Command to execute (first element is the executable).
    pub command: Vec<String>,
}

impl ProvisionStep {
    /// Render the command for display.
    pub fn display(&self) -> String {
        self.command.join(" ")
    }
}

/// Provisioning plan for a Venus OS device.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProvisionPlan {
    /// Packages installed via opkg, in order.
    pub packages: Vec<String>,

    /// Bundled archive extracted onto the device.
    pub archive: PathBuf,

    /// Directory the archive is extracted into.
    pub install_root: PathBuf,

    /// Second-stage installer invoked after extraction.
    pub installer: PathBuf,
}

impl Default for ProvisionPlan {
    fn default() -> Self {
        Self {
            packages: vec!["python3-misc".to_string(), "python3-pip".to_string()],
            archive: PathBuf::from("./venus-data.tar.gz"),
            install_root: PathBuf::from("/data"),
            installer: PathBuf::from("/data/etc/dbus-serialbattery/reinstall-local.sh"),
        }
    }
}

impl ProvisionPlan {
    /// Expand the plan into its fixed step sequence:
    /// index update, one install per package, archive extraction, installer.
    pub fn steps(&self) -> Vec<ProvisionStep> {
        let mut steps = vec![ProvisionStep {
            kind: StepKind::UpdateIndex,
            command: vec!["opkg".to_string(), "update".to_string()],
        }];

        for package in &self.packages {
            steps.push(ProvisionStep {
                kind: StepKind::InstallPackage,
                command: vec!["opkg".to_string(), "install".to_string(), package.clone()],
            });
        }

        steps.push(ProvisionStep {
            kind: StepKind::ExtractArchive,
            command: vec![
                "tar".to_string(),
                "-zxf".to_string(),
                self.archive.to_string_lossy().into_owned(),
                "-C".to_string(),
                self.install_root.to_string_lossy().into_owned(),
            ],
        });

        steps.push(ProvisionStep {
            kind: StepKind::RunInstaller,
            command: vec![
                "sh".to_string(),
                self.installer.to_string_lossy().into_owned(),
            ],
        });

        steps
    }
}
