//! Typed view of the upstream `data.yaml` release manifest.
//!
//! One manifest describes the register layout for a single Modbus protocol
//! version. Registers are keyed by stable identifier; the optional
//! `cell_registers` block describes the repeated per-cell frame.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::domain::error::{RegsyncError, Result, ValidationError};
use crate::domain::register::{
    CellRegisterDef, RegisterDef, RegisterKind, VersionedCellMap, VersionedRegisterMap,
};
use crate::domain::validation;

/// Root of an upstream `data.yaml` manifest.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Manifest {
    /// Modbus protocol version this manifest describes (strict semver).
    pub modbus_version: String,

    /// Absolute-addressed registers, keyed by stable identifier.
    pub registers: BTreeMap<String, ManifestRegister>,

    /// Optional per-cell register frame.
    #[serde(default)]
    pub cell_registers: Option<ManifestCellBlock>,
}

/// One absolute-addressed register in a manifest.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ManifestRegister {
    pub name: String,
    pub address: u16,
    #[serde(default = "default_array_size")]
    pub array_size: u16,
    #[serde(rename = "type")]
    pub kind: RegisterKind,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub unit: Option<String>,
    #[serde(default)]
    pub hardware_support_register: Option<u16>,
}

/// The per-cell frame block of a manifest.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ManifestCellBlock {
    /// Absolute word address of cell 0's frame.
    pub offset: u16,

    /// Words per cell frame.
    pub length: u16,

    /// Frame-relative registers, keyed by stable identifier.
    pub registers: BTreeMap<String, ManifestCellRegister>,
}

/// One frame-relative register in a manifest.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ManifestCellRegister {
    pub name: String,
    pub offset: u16,
    #[serde(default = "default_array_size")]
    pub array_size: u16,
    #[serde(rename = "type")]
    pub kind: RegisterKind,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub unit: Option<String>,
    #[serde(default)]
    pub hardware_support_register: Option<u16>,
}

fn default_array_size() -> u16 {
    1
}

/// A validated catalog entry compiled from one manifest.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatalogEntry {
    pub map: VersionedRegisterMap,
    pub cells: Option<VersionedCellMap>,
}

impl Manifest {
    /// Parse a manifest from YAML text.
    pub fn from_yaml(text: &str) -> Result<Self> {
        Ok(serde_yaml::from_str(text)?)
    }

    /// Convert into domain maps and run semantic validation.
    pub fn compile(self) -> Result<CatalogEntry> {
        let version = semver::Version::parse(&self.modbus_version).map_err(|e| {
            RegsyncError::from(ValidationError::InvalidVersion {
                value: self.modbus_version.clone(),
                reason: e.to_string(),
            })
        })?;

        let mut registers: Vec<RegisterDef> = self
            .registers
            .into_iter()
            .map(|(key, r)| RegisterDef {
                key,
                name: r.name,
                address: r.address,
                array_size: r.array_size,
                kind: r.kind,
                description: r.description,
                unit: r.unit,
                hardware_support_register: r.hardware_support_register,
            })
            .collect();
        registers.sort_by_key(|r| r.address);

        let map = VersionedRegisterMap {
            version: version.clone(),
            registers,
        };

        let cells = self.cell_registers.map(|block| {
            let mut registers: Vec<CellRegisterDef> = block
                .registers
                .into_iter()
                .map(|(key, r)| CellRegisterDef {
                    key,
                    name: r.name,
                    offset: r.offset,
                    array_size: r.array_size,
                    kind: r.kind,
                    description: r.description,
                    unit: r.unit,
                    hardware_support_register: r.hardware_support_register,
                })
                .collect();
            registers.sort_by_key(|r| r.offset);
            VersionedCellMap {
                version,
                base: block.offset,
                stride: block.length,
                registers,
            }
        });

        validation::validate_entry(&map, cells.as_ref())?;

        Ok(CatalogEntry { map, cells })
    }
}

/// Parse and validate a manifest in one step.
pub fn compile_manifest(text: &str) -> Result<CatalogEntry> {
    Manifest::from_yaml(text)?.compile()
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"
modbus_version: "2.0.0"
registers:
  Manufacturer_ID:
    name: Manufacturer ID
    address: 0
    array_size: 1
    type: uint16
    description: Unique identifier of the manufacturer.
  Modbus_Version:
    name: Modbus Version
    address: 1
    array_size: 16
    type: char
    description: Modbus protocol version, as a string in semantic versioning format.
  Battery_Voltage:
    name: Battery Voltage
    address: 36
    type: float32
    description: Total voltage of the battery pack.
    unit: V
  Battery_Current:
    name: Battery Current
    address: 38
    type: float32
    unit: A
    hardware_support_register: 0
cell_registers:
  offset: 76
  length: 3
  registers:
    Cell_Voltage:
      name: Cell Voltage
      offset: 0
      type: float32
      unit: V
    Cell_Balance_Status:
      name: Cell Balance Status
      offset: 2
      type: bool
"#;

    #[test]
    fn test_parse_and_compile_sample() {
        let entry = compile_manifest(SAMPLE).expect("compile");

        assert_eq!(entry.map.version, semver::Version::new(2, 0, 0));
        assert_eq!(entry.map.registers.len(), 4);

        // Address-sorted regardless of YAML key order.
        let addresses: Vec<u16> = entry.map.registers.iter().map(|r| r.address).collect();
        assert_eq!(addresses, vec![0, 1, 36, 38]);

        let current = entry.map.find("Battery_Current").unwrap();
        assert_eq!(current.hardware_support_register, Some(0));
        assert_eq!(current.unit.as_deref(), Some("A"));

        let cells = entry.cells.expect("cell block");
        assert_eq!(cells.base, 76);
        assert_eq!(cells.stride, 3);
        assert_eq!(cells.registers.len(), 2);
    }

    #[test]
    fn test_array_size_defaults_to_one() {
        let entry = compile_manifest(SAMPLE).unwrap();
        assert_eq!(entry.map.find("Battery_Voltage").unwrap().array_size, 1);
    }

    #[test]
    fn test_bad_version_rejected() {
        let text = SAMPLE.replace("\"2.0.0\"", "\"2.0\"");
        let err = compile_manifest(&text).unwrap_err();
        assert!(err.to_string().contains("2.0"));
    }

    #[test]
    fn test_unknown_type_rejected() {
        let text = SAMPLE.replace("type: uint16", "type: uint12");
        assert!(compile_manifest(&text).is_err());
    }

    #[test]
    fn test_manifest_without_cell_block() {
        let text = SAMPLE.split("cell_registers:").next().unwrap().to_string();
        let entry = compile_manifest(&text).unwrap();
        assert!(entry.cells.is_none());
    }

    #[test]
    fn test_overlapping_manifest_rejected() {
        // Move Battery_Current onto Battery_Voltage's second word.
        let text = SAMPLE.replace("address: 38", "address: 37");
        let err = compile_manifest(&text).unwrap_err();
        assert!(err.to_string().contains("overlap"));
    }
}
