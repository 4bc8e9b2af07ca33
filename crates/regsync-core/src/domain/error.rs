//! Domain-level error taxonomy for regsync.

/// Errors produced by manifest semantic validation.
#[derive(Debug, thiserror::Error)]
pub enum ValidationError {
    #[error("invalid modbus version {value:?}: {reason}")]
    InvalidVersion { value: String, reason: String },

    #[error("manifest defines no registers")]
    EmptyRegisters,

    #[error("register {key} has array_size 0")]
    ZeroSize { key: String },

    #[error("char register {key} has odd array_size {array_size} (two characters pack per word)")]
    OddCharSize { key: String, array_size: u16 },

    #[error("registers {first} and {second} overlap at word {address}")]
    Overlap {
        first: String,
        second: String,
        address: u16,
    },

    #[error("cell register {key} ends at offset {end} but the cell frame is {stride} words")]
    CellRegisterOutOfFrame { key: String, end: u32, stride: u16 },

    #[error("cell registers {first} and {second} overlap inside the cell frame")]
    CellOverlap { first: String, second: String },

    #[error("cell frame base {base} collides with static registers ending at word {static_end}")]
    CellBaseCollision { base: u16, static_end: u32 },

    #[error("duplicate register map for modbus version {version}")]
    DuplicateVersion { version: String },
}

/// regsync domain errors.
#[derive(Debug, thiserror::Error)]
pub enum RegsyncError {
    #[error("invalid manifest: {0}")]
    Validation(#[from] ValidationError),

    #[error("manifest parse error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("codegen error: {0}")]
    Codegen(String),

    #[error("generation markers not found in {path}")]
    MarkersMissing { path: String },

    #[error("register not found: {0}")]
    RegisterNotFound(String),

    #[error("no register map for modbus version {0}")]
    VersionUnresolved(semver::Version),

    #[error("decode error: {0}")]
    Decode(#[from] crate::decode::DecodeError),

    #[error("git error: {0}")]
    GitError(String),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for regsync domain operations.
pub type Result<T> = std::result::Result<T, RegsyncError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_error_display() {
        let err = ValidationError::Overlap {
            first: "Battery_Voltage".to_string(),
            second: "Battery_Current".to_string(),
            address: 37,
        };
        let msg = err.to_string();
        assert!(msg.contains("Battery_Voltage"));
        assert!(msg.contains("37"));
    }

    #[test]
    fn test_regsync_error_display() {
        let err = RegsyncError::RegisterNotFound("Battery_SOC".to_string());
        assert!(err.to_string().contains("Battery_SOC"));

        let err = RegsyncError::MarkersMissing {
            path: "bms/registers.rs".to_string(),
        };
        assert!(err.to_string().contains("bms/registers.rs"));
    }

    #[test]
    fn test_validation_error_converts() {
        let err: RegsyncError = ValidationError::EmptyRegisters.into();
        assert!(err.to_string().contains("invalid manifest"));
    }
}
