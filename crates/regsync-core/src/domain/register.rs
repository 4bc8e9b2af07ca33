//! Register definitions and versioned register maps.
//!
//! Upstream publishes one register map per Modbus protocol version. A map is
//! a list of absolute-addressed registers; cell registers are defined once
//! and repeated per cell at `base + cell * stride + offset`.

use semver::Version;
use serde::{Deserialize, Serialize};

/// Value kind of a Modbus register.
///
/// Determines how many 16-bit words an element occupies and how the raw
/// words are decoded.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum RegisterKind {
    Int8,
    Uint8,
    Char,
    Int16,
    Uint16,
    Int32,
    Uint32,
    Int64,
    Uint64,
    Float32,
    Float64,
    Bool,
}

impl RegisterKind {
    /// Wire name as used in upstream manifests (`"uint16"`, `"float32"`, ...).
    pub fn as_str(&self) -> &'static str {
        match self {
            RegisterKind::Int8 => "int8",
            RegisterKind::Uint8 => "uint8",
            RegisterKind::Char => "char",
            RegisterKind::Int16 => "int16",
            RegisterKind::Uint16 => "uint16",
            RegisterKind::Int32 => "int32",
            RegisterKind::Uint32 => "uint32",
            RegisterKind::Int64 => "int64",
            RegisterKind::Uint64 => "uint64",
            RegisterKind::Float32 => "float32",
            RegisterKind::Float64 => "float64",
            RegisterKind::Bool => "bool",
        }
    }

    /// Variant path for code generation (`"RegisterKind::Uint16"`).
    pub fn variant_path(&self) -> &'static str {
        match self {
            RegisterKind::Int8 => "RegisterKind::Int8",
            RegisterKind::Uint8 => "RegisterKind::Uint8",
            RegisterKind::Char => "RegisterKind::Char",
            RegisterKind::Int16 => "RegisterKind::Int16",
            RegisterKind::Uint16 => "RegisterKind::Uint16",
            RegisterKind::Int32 => "RegisterKind::Int32",
            RegisterKind::Uint32 => "RegisterKind::Uint32",
            RegisterKind::Int64 => "RegisterKind::Int64",
            RegisterKind::Uint64 => "RegisterKind::Uint64",
            RegisterKind::Float32 => "RegisterKind::Float32",
            RegisterKind::Float64 => "RegisterKind::Float64",
            RegisterKind::Bool => "RegisterKind::Bool",
        }
    }

    /// Words occupied by a single element of this kind.
    ///
    /// `char` is the exception: two characters pack into one word, so its
    /// span depends on the array size (see [`RegisterKind::span_words`]).
    pub fn words_per_element(&self) -> u16 {
        match self {
            RegisterKind::Int8
            | RegisterKind::Uint8
            | RegisterKind::Char
            | RegisterKind::Int16
            | RegisterKind::Uint16
            | RegisterKind::Bool => 1,
            RegisterKind::Int32 | RegisterKind::Uint32 | RegisterKind::Float32 => 2,
            RegisterKind::Int64 | RegisterKind::Uint64 | RegisterKind::Float64 => 4,
        }
    }

    /// Total words occupied by `array_size` elements of this kind.
    pub fn span_words(&self, array_size: u16) -> u16 {
        match self {
            RegisterKind::Char => array_size.div_ceil(2),
            _ => self.words_per_element() * array_size,
        }
    }
}

impl std::fmt::Display for RegisterKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single register at an absolute word address.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RegisterDef {
    /// Stable identifier (e.g. `Battery_SOC`). Unique within a map.
    pub key: String,

    /// Human-readable name.
    pub name: String,

    /// Absolute word address.
    pub address: u16,

    /// Element count; character count for `char` registers.
    pub array_size: u16,

    /// Value kind.
    pub kind: RegisterKind,

    /// Upstream documentation string.
    pub description: String,

    /// Physical unit, if any (`"V"`, `"A"`, `"%"`, ...).
    pub unit: Option<String>,

    /// Index into the hardware capability bitmap, for registers that only
    /// some hardware revisions populate.
    pub hardware_support_register: Option<u16>,
}

impl RegisterDef {
    /// Words occupied by this register.
    pub fn span(&self) -> u16 {
        self.kind.span_words(self.array_size)
    }

    /// One past the last word address (widened to avoid u16 overflow at the
    /// top of the address space).
    pub fn end(&self) -> u32 {
        u32::from(self.address) + u32::from(self.span())
    }
}

/// A register defined relative to a per-cell frame.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CellRegisterDef {
    /// Stable identifier (e.g. `Cell_Voltage`). Unique within a map.
    pub key: String,

    /// Human-readable name.
    pub name: String,

    /// Word offset inside the cell frame.
    pub offset: u16,

    /// Element count; character count for `char` registers.
    pub array_size: u16,

    /// Value kind.
    pub kind: RegisterKind,

    /// Upstream documentation string.
    pub description: String,

    /// Physical unit, if any.
    pub unit: Option<String>,

    /// Index into the hardware capability bitmap.
    pub hardware_support_register: Option<u16>,
}

impl CellRegisterDef {
    /// Words occupied by this register.
    pub fn span(&self) -> u16 {
        self.kind.span_words(self.array_size)
    }

    /// One past the last offset inside the cell frame.
    pub fn end(&self) -> u32 {
        u32::from(self.offset) + u32::from(self.span())
    }
}

/// All absolute-addressed registers for one protocol version.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct VersionedRegisterMap {
    /// Modbus protocol version this map describes.
    pub version: Version,

    /// Registers, ordered by ascending address.
    pub registers: Vec<RegisterDef>,
}

impl VersionedRegisterMap {
    /// Look up a register by key.
    pub fn find(&self, key: &str) -> Option<&RegisterDef> {
        self.registers.iter().find(|r| r.key == key)
    }

    /// One past the highest word any register occupies (0 for an empty map).
    pub fn max_end(&self) -> u32 {
        self.registers.iter().map(RegisterDef::end).max().unwrap_or(0)
    }
}

/// Per-cell register frame for one protocol version.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct VersionedCellMap {
    /// Modbus protocol version this frame describes.
    pub version: Version,

    /// Absolute word address of cell 0's frame.
    pub base: u16,

    /// Words per cell frame.
    pub stride: u16,

    /// Registers inside a frame, ordered by ascending offset.
    pub registers: Vec<CellRegisterDef>,
}

impl VersionedCellMap {
    /// Look up a cell register by key.
    pub fn find(&self, key: &str) -> Option<&CellRegisterDef> {
        self.registers.iter().find(|r| r.key == key)
    }

    /// Absolute word address of `key` for the given cell index.
    pub fn cell_address(&self, cell: u16, key: &str) -> Option<u16> {
        let reg = self.find(key)?;
        Some(self.base + cell * self.stride + reg.offset)
    }
}

/// All known register maps, newest protocol version first.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct RegisterCatalog {
    /// Absolute register maps, descending by version.
    pub maps: Vec<VersionedRegisterMap>,

    /// Cell register frames, descending by version.
    pub cell_maps: Vec<VersionedCellMap>,
}

impl RegisterCatalog {
    /// Build a catalog, sorting both lists newest-first.
    pub fn new(
        mut maps: Vec<VersionedRegisterMap>,
        mut cell_maps: Vec<VersionedCellMap>,
    ) -> Self {
        maps.sort_by(|a, b| b.version.cmp(&a.version));
        cell_maps.sort_by(|a, b| b.version.cmp(&a.version));
        Self { maps, cell_maps }
    }

    /// Whether the catalog holds no maps at all.
    pub fn is_empty(&self) -> bool {
        self.maps.is_empty() && self.cell_maps.is_empty()
    }

    /// Protocol versions with an absolute register map, newest first.
    pub fn versions(&self) -> Vec<&Version> {
        self.maps.iter().map(|m| &m.version).collect()
    }

    /// Resolve the register map for a device-reported protocol version.
    ///
    /// Exact match wins. Otherwise the newest map with the same major
    /// version that does not exceed the request is used, so a device
    /// reporting `2.0.1` still maps to the `2.0.0` table.
    pub fn resolve(&self, version: &Version) -> Option<&VersionedRegisterMap> {
        if let Some(exact) = self.maps.iter().find(|m| &m.version == version) {
            return Some(exact);
        }
        self.maps
            .iter()
            .find(|m| m.version.major == version.major && m.version <= *version)
    }

    /// Resolve the cell frame for a device-reported protocol version.
    pub fn resolve_cells(&self, version: &Version) -> Option<&VersionedCellMap> {
        if let Some(exact) = self.cell_maps.iter().find(|m| &m.version == version) {
            return Some(exact);
        }
        self.cell_maps
            .iter()
            .find(|m| m.version.major == version.major && m.version <= *version)
    }
}
