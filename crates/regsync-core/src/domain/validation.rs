//! Semantic validation of register maps.
//!
//! Parsing catches structural problems; the checks here catch layout
//! problems a structurally valid manifest can still carry: overlapping
//! registers, cell registers that spill out of their frame, a cell block
//! that collides with the static map.

use crate::domain::error::ValidationError;
use crate::domain::register::{
    RegisterCatalog, RegisterKind, VersionedCellMap, VersionedRegisterMap,
};

/// Validate one protocol version's register map and optional cell frame.
pub fn validate_entry(
    map: &VersionedRegisterMap,
    cells: Option<&VersionedCellMap>,
) -> Result<(), ValidationError> {
    validate_map(map)?;
    if let Some(cells) = cells {
        validate_cell_map(cells, map.max_end())?;
    }
    Ok(())
}

/// Validate the absolute-addressed register map.
pub fn validate_map(map: &VersionedRegisterMap) -> Result<(), ValidationError> {
    if map.registers.is_empty() {
        return Err(ValidationError::EmptyRegisters);
    }

    for reg in &map.registers {
        if reg.array_size == 0 {
            return Err(ValidationError::ZeroSize {
                key: reg.key.clone(),
            });
        }
        if reg.kind == RegisterKind::Char && reg.array_size % 2 != 0 {
            return Err(ValidationError::OddCharSize {
                key: reg.key.clone(),
                array_size: reg.array_size,
            });
        }
    }

    // Registers are address-sorted by the manifest conversion, so overlap
    // only needs to check each neighbor pair.
    for pair in map.registers.windows(2) {
        let (a, b) = (&pair[0], &pair[1]);
        if a.end() > u32::from(b.address) {
            return Err(ValidationError::Overlap {
                first: a.key.clone(),
                second: b.key.clone(),
                address: b.address,
            });
        }
    }

    Ok(())
}

/// Validate a per-cell register frame against the static map's extent.
pub fn validate_cell_map(
    cells: &VersionedCellMap,
    static_end: u32,
) -> Result<(), ValidationError> {
    if cells.registers.is_empty() {
        return Err(ValidationError::EmptyRegisters);
    }
    if u32::from(cells.base) < static_end {
        return Err(ValidationError::CellBaseCollision {
            base: cells.base,
            static_end,
        });
    }

    for reg in &cells.registers {
        if reg.array_size == 0 {
            return Err(ValidationError::ZeroSize {
                key: reg.key.clone(),
            });
        }
        if reg.end() > u32::from(cells.stride) {
            return Err(ValidationError::CellRegisterOutOfFrame {
                key: reg.key.clone(),
                end: reg.end(),
                stride: cells.stride,
            });
        }
    }

    for pair in cells.registers.windows(2) {
        let (a, b) = (&pair[0], &pair[1]);
        if a.end() > u32::from(b.offset) {
            return Err(ValidationError::CellOverlap {
                first: a.key.clone(),
                second: b.key.clone(),
            });
        }
    }

    Ok(())
}

/// Reject catalogs carrying the same protocol version twice.
///
/// Silent last-write-wins would make the generated tables depend on release
/// iteration order.
pub fn validate_catalog(catalog: &RegisterCatalog) -> Result<(), ValidationError> {
    for pair in catalog.maps.windows(2) {
        if pair[0].version == pair[1].version {
            return Err(ValidationError::DuplicateVersion {
                version: pair[0].version.to_string(),
            });
        }
    }
    for pair in catalog.cell_maps.windows(2) {
        if pair[0].version == pair[1].version {
            return Err(ValidationError::DuplicateVersion {
                version: pair[0].version.to_string(),
            });
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::register::{CellRegisterDef, RegisterDef, RegisterKind};
    use semver::Version;

    fn reg(key: &str, address: u16, array_size: u16, kind: RegisterKind) -> RegisterDef {
        RegisterDef {
            key: key.to_string(),
            name: key.to_string(),
            address,
            array_size,
            kind,
            description: String::new(),
            unit: None,
            hardware_support_register: None,
        }
    }

    fn cell_reg(key: &str, offset: u16, kind: RegisterKind) -> CellRegisterDef {
        CellRegisterDef {
            key: key.to_string(),
            name: key.to_string(),
            offset,
            array_size: 1,
            kind,
            description: String::new(),
            unit: None,
            hardware_support_register: None,
        }
    }

    fn map(registers: Vec<RegisterDef>) -> VersionedRegisterMap {
        VersionedRegisterMap {
            version: Version::new(2, 0, 0),
            registers,
        }
    }

    #[test]
    fn test_valid_map_passes() {
        let m = map(vec![
            reg("Manufacturer_ID", 0, 1, RegisterKind::Uint16),
            reg("Modbus_Version", 1, 16, RegisterKind::Char),
            reg("Hardware_Name", 9, 16, RegisterKind::Char),
        ]);
        assert!(validate_map(&m).is_ok());
    }

    #[test]
    fn test_empty_map_rejected() {
        let m = map(vec![]);
        assert!(matches!(
            validate_map(&m),
            Err(ValidationError::EmptyRegisters)
        ));
    }

    #[test]
    fn test_overlap_rejected() {
        // float32 at 36 spans words 36..38; a register at 37 overlaps.
        let m = map(vec![
            reg("Battery_Voltage", 36, 1, RegisterKind::Float32),
            reg("Intruder", 37, 1, RegisterKind::Uint16),
        ]);
        match validate_map(&m) {
            Err(ValidationError::Overlap { first, second, .. }) => {
                assert_eq!(first, "Battery_Voltage");
                assert_eq!(second, "Intruder");
            }
            other => panic!("expected overlap, got {other:?}"),
        }
    }

    #[test]
    fn test_odd_char_size_rejected() {
        let m = map(vec![reg("Serial_Number", 21, 11, RegisterKind::Char)]);
        assert!(matches!(
            validate_map(&m),
            Err(ValidationError::OddCharSize { .. })
        ));
    }

    #[test]
    fn test_zero_size_rejected() {
        let m = map(vec![reg("Broken", 0, 0, RegisterKind::Uint16)]);
        assert!(matches!(
            validate_map(&m),
            Err(ValidationError::ZeroSize { .. })
        ));
    }

    #[test]
    fn test_cell_register_must_fit_frame() {
        let cells = VersionedCellMap {
            version: Version::new(2, 0, 0),
            base: 76,
            stride: 3,
            registers: vec![
                cell_reg("Cell_Voltage", 0, RegisterKind::Float32),
                cell_reg("Overflow", 2, RegisterKind::Float32),
            ],
        };
        assert!(matches!(
            validate_cell_map(&cells, 76),
            Err(ValidationError::CellRegisterOutOfFrame { .. })
        ));
    }

    #[test]
    fn test_cell_base_collision_rejected() {
        let cells = VersionedCellMap {
            version: Version::new(2, 0, 0),
            base: 70,
            stride: 3,
            registers: vec![cell_reg("Cell_Voltage", 0, RegisterKind::Float32)],
        };
        assert!(matches!(
            validate_cell_map(&cells, 76),
            Err(ValidationError::CellBaseCollision { .. })
        ));
    }

    #[test]
    fn test_valid_cell_frame_passes() {
        let cells = VersionedCellMap {
            version: Version::new(2, 0, 0),
            base: 76,
            stride: 3,
            registers: vec![
                cell_reg("Cell_Voltage", 0, RegisterKind::Float32),
                cell_reg("Cell_Balance_Status", 2, RegisterKind::Bool),
            ],
        };
        assert!(validate_cell_map(&cells, 76).is_ok());
    }

    #[test]
    fn test_duplicate_version_rejected() {
        let catalog = RegisterCatalog::new(
            vec![
                map(vec![reg("A", 0, 1, RegisterKind::Uint16)]),
                map(vec![reg("B", 0, 1, RegisterKind::Uint16)]),
            ],
            vec![],
        );
        assert!(matches!(
            validate_catalog(&catalog),
            Err(ValidationError::DuplicateVersion { .. })
        ));
    }
}
