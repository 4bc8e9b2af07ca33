//! Const-friendly table types referenced by generated register modules.
//!
//! The code generator emits `static` tables built from these types so the
//! generated file compiles without allocation or lazy initialization.
//! [`RegisterMapEntry::to_map`] and [`CellMapEntry::to_map`] convert back
//! into the owned domain model for runtime use.

use crate::domain::register::{
    CellRegisterDef, RegisterDef, RegisterKind, VersionedCellMap, VersionedRegisterMap,
};

/// One protocol version's register table in `static` form.
#[derive(Debug, Clone, Copy)]
pub struct RegisterMapEntry {
    /// Protocol version as a semver string literal.
    pub version: &'static str,
    pub registers: &'static [RegisterEntry],
}

/// One register in `static` form.
#[derive(Debug, Clone, Copy)]
pub struct RegisterEntry {
    pub key: &'static str,
    pub name: &'static str,
    pub address: u16,
    pub array_size: u16,
    pub kind: RegisterKind,
    pub description: &'static str,
    pub unit: Option<&'static str>,
    pub hardware_support_register: Option<u16>,
}

/// One protocol version's cell frame in `static` form.
#[derive(Debug, Clone, Copy)]
pub struct CellMapEntry {
    /// Protocol version as a semver string literal.
    pub version: &'static str,
    pub base: u16,
    pub stride: u16,
    pub registers: &'static [CellRegisterEntry],
}

/// One cell register in `static` form.
#[derive(Debug, Clone, Copy)]
pub struct CellRegisterEntry {
    pub key: &'static str,
    pub name: &'static str,
    pub offset: u16,
    pub array_size: u16,
    pub kind: RegisterKind,
    pub description: &'static str,
    pub unit: Option<&'static str>,
    pub hardware_support_register: Option<u16>,
}

impl RegisterMapEntry {
    /// Convert into the owned domain map.
    pub fn to_map(&self) -> Result<VersionedRegisterMap, semver::Error> {
        Ok(VersionedRegisterMap {
            version: semver::Version::parse(self.version)?,
            registers: self
                .registers
                .iter()
                .map(|r| RegisterDef {
                    key: r.key.to_string(),
                    name: r.name.to_string(),
                    address: r.address,
                    array_size: r.array_size,
                    kind: r.kind,
                    description: r.description.to_string(),
                    unit: r.unit.map(str::to_string),
                    hardware_support_register: r.hardware_support_register,
                })
                .collect(),
        })
    }
}

impl CellMapEntry {
    /// Convert into the owned domain map.
    pub fn to_map(&self) -> Result<VersionedCellMap, semver::Error> {
        Ok(VersionedCellMap {
            version: semver::Version::parse(self.version)?,
            base: self.base,
            stride: self.stride,
            registers: self
                .registers
                .iter()
                .map(|r| CellRegisterDef {
                    key: r.key.to_string(),
                    name: r.name.to_string(),
                    offset: r.offset,
                    array_size: r.array_size,
                    kind: r.kind,
                    description: r.description.to_string(),
                    unit: r.unit.map(str::to_string),
                    hardware_support_register: r.hardware_support_register,
                })
                .collect(),
        })
    }
}
