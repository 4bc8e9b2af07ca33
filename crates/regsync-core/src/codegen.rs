//! Generation of the register-table module and marker splicing.
//!
//! Rendering is deterministic: maps are emitted newest version first,
//! registers by ascending address, one entry per line. The generated block
//! sits between begin/end markers so it can be replaced wholesale inside a
//! hand-maintained file.

use regex::Regex;
use sha2::{Digest, Sha256};

use crate::domain::error::{RegsyncError, Result};
use crate::domain::register::RegisterCatalog;

/// First line of the generated region.
pub const GENERATED_BEGIN: &str = "// regsync:begin generated";

/// Last line of the generated region.
pub const GENERATED_END: &str = "// regsync:end generated";

/// Code generation options.
#[derive(Debug, Clone)]
pub struct CodegenOptions {
    /// `use` lines emitted at the top of the generated region.
    pub use_lines: Vec<String>,
}

impl Default for CodegenOptions {
    fn default() -> Self {
        Self {
            use_lines: vec![
                "use regsync_core::tables::{CellMapEntry, CellRegisterEntry, RegisterEntry, RegisterMapEntry};".to_string(),
                "use regsync_core::RegisterKind;".to_string(),
            ],
        }
    }
}

/// Result of rendering into a target file.
#[derive(Debug, Clone)]
pub struct Rendered {
    /// Full new file content.
    pub text: String,

    /// SHA-256 hex digest of the new content.
    pub digest: String,

    /// Whether the content differs from the existing file.
    pub changed: bool,
}

/// Render the generated region (markers included) for a catalog.
pub fn render_module(catalog: &RegisterCatalog, opts: &CodegenOptions) -> String {
    let mut out = String::new();
    out.push_str(GENERATED_BEGIN);
    out.push('\n');
    out.push_str("// Generated from upstream release manifests. Do not edit by hand.\n");
    for line in &opts.use_lines {
        out.push_str(line);
        out.push('\n');
    }
    out.push('\n');

    out.push_str("pub static IROCK_MODBUS_REGISTERS: &[RegisterMapEntry] = &[\n");
    for map in &catalog.maps {
        out.push_str("    RegisterMapEntry {\n");
        out.push_str(&format!("        version: {},\n", rust_str(&map.version.to_string())));
        out.push_str("        registers: &[\n");
        for reg in &map.registers {
            out.push_str(&format!(
                "            RegisterEntry {{ key: {}, name: {}, address: {}, array_size: {}, kind: {}, description: {}, unit: {}, hardware_support_register: {} }},\n",
                rust_str(&reg.key),
                rust_str(&reg.name),
                reg.address,
                reg.array_size,
                reg.kind.variant_path(),
                rust_str(&reg.description),
                rust_opt_str(reg.unit.as_deref()),
                rust_opt_u16(reg.hardware_support_register),
            ));
        }
        out.push_str("        ],\n");
        out.push_str("    },\n");
    }
    out.push_str("];\n\n");

    out.push_str("pub static IROCK_MODBUS_CELL_REGISTERS: &[CellMapEntry] = &[\n");
    for map in &catalog.cell_maps {
        out.push_str("    CellMapEntry {\n");
        out.push_str(&format!("        version: {},\n", rust_str(&map.version.to_string())));
        out.push_str(&format!("        base: {},\n", map.base));
        out.push_str(&format!("        stride: {},\n", map.stride));
        out.push_str("        registers: &[\n");
        for reg in &map.registers {
            out.push_str(&format!(
                "            CellRegisterEntry {{ key: {}, name: {}, offset: {}, array_size: {}, kind: {}, description: {}, unit: {}, hardware_support_register: {} }},\n",
                rust_str(&reg.key),
                rust_str(&reg.name),
                reg.offset,
                reg.array_size,
                reg.kind.variant_path(),
                rust_str(&reg.description),
                rust_opt_str(reg.unit.as_deref()),
                rust_opt_u16(reg.hardware_support_register),
            ));
        }
        out.push_str("        ],\n");
        out.push_str("    },\n");
    }
    out.push_str("];\n");

    out.push_str(GENERATED_END);
    out.push('\n');
    out
}

/// Replace the generated region of `existing` with `module`.
///
/// `module` must itself include the begin/end markers (as produced by
/// [`render_module`]). Fails if the existing text carries no markers.
pub fn splice(existing: &str, module: &str, path_for_error: &str) -> Result<String> {
    let pattern = format!(
        "(?s){}.*?{}\n?",
        regex::escape(GENERATED_BEGIN),
        regex::escape(GENERATED_END)
    );
    let re = Regex::new(&pattern).map_err(|e| RegsyncError::Codegen(e.to_string()))?;

    if !re.is_match(existing) {
        return Err(RegsyncError::MarkersMissing {
            path: path_for_error.to_string(),
        });
    }

    // NoExpand: the module text is literal, not a replacement template.
    Ok(re.replace(existing, regex::NoExpand(module)).into_owned())
}

/// Render a catalog into the target file's content.
///
/// When the file does not exist yet (`existing` is `None`) a fresh file is
/// produced from a minimal template. `changed` is false exactly when the
/// output is byte-identical to the input.
pub fn render_into(
    existing: Option<&str>,
    catalog: &RegisterCatalog,
    opts: &CodegenOptions,
    path_for_error: &str,
) -> Result<Rendered> {
    let module = render_module(catalog, opts);

    let text = match existing {
        Some(current) => splice(current, &module, path_for_error)?,
        None => format!(
            "//! iRock Modbus register tables.\n//!\n//! The region between the regsync markers is machine-maintained.\n\n{module}"
        ),
    };

    let changed = existing != Some(text.as_str());
    let digest = hex::encode(Sha256::digest(text.as_bytes()));

    Ok(Rendered {
        text,
        digest,
        changed,
    })
}

/// Escape a string into a Rust string literal.
fn rust_str(s: &str) -> String {
    let mut out = String::with_capacity(s.len() + 2);
    out.push('"');
    for c in s.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            c => out.push(c),
        }
    }
    out.push('"');
    out
}

fn rust_opt_str(s: Option<&str>) -> String {
    match s {
        Some(s) => format!("Some({})", rust_str(s)),
        None => "None".to_string(),
    }
}

fn rust_opt_u16(v: Option<u16>) -> String {
    match v {
        Some(v) => format!("Some({v})"),
        None => "None".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::register::{
        CellRegisterDef, RegisterDef, RegisterKind, VersionedCellMap, VersionedRegisterMap,
    };
    use semver::Version;

    fn sample_catalog() -> RegisterCatalog {
        RegisterCatalog::new(
            vec![
                VersionedRegisterMap {
                    version: Version::new(1, 0, 0),
                    registers: vec![RegisterDef {
                        key: "Manufacturer_ID".to_string(),
                        name: "Manufacturer ID".to_string(),
                        address: 0,
                        array_size: 1,
                        kind: RegisterKind::Uint16,
                        description: "Unique identifier of the manufacturer.".to_string(),
                        unit: None,
                        hardware_support_register: None,
                    }],
                },
                VersionedRegisterMap {
                    version: Version::new(2, 0, 0),
                    registers: vec![RegisterDef {
                        key: "Battery_SOC".to_string(),
                        name: "SOC".to_string(),
                        address: 40,
                        array_size: 1,
                        kind: RegisterKind::Float32,
                        description: "State of Charge (SOC) of the battery.".to_string(),
                        unit: Some("%".to_string()),
                        hardware_support_register: Some(1),
                    }],
                },
            ],
            vec![VersionedCellMap {
                version: Version::new(2, 0, 0),
                base: 76,
                stride: 3,
                registers: vec![CellRegisterDef {
                    key: "Cell_Voltage".to_string(),
                    name: "Cell Voltage".to_string(),
                    offset: 0,
                    array_size: 1,
                    kind: RegisterKind::Float32,
                    description: "Voltage of cell.".to_string(),
                    unit: Some("V".to_string()),
                    hardware_support_register: None,
                }],
            }],
        )
    }

    #[test]
    fn test_render_module_is_deterministic() {
        let catalog = sample_catalog();
        let opts = CodegenOptions::default();
        assert_eq!(render_module(&catalog, &opts), render_module(&catalog, &opts));
    }

    #[test]
    fn test_render_module_orders_newest_first() {
        let module = render_module(&sample_catalog(), &CodegenOptions::default());
        let v2 = module.find("\"2.0.0\"").unwrap();
        let v1 = module.find("\"1.0.0\"").unwrap();
        assert!(v2 < v1, "2.0.0 must precede 1.0.0");
        assert!(module.starts_with(GENERATED_BEGIN));
        assert!(module.trim_end().ends_with(GENERATED_END));
    }

    #[test]
    fn test_render_module_contains_entries() {
        let module = render_module(&sample_catalog(), &CodegenOptions::default());
        assert!(module.contains("IROCK_MODBUS_REGISTERS"));
        assert!(module.contains("IROCK_MODBUS_CELL_REGISTERS"));
        assert!(module.contains("key: \"Battery_SOC\""));
        assert!(module.contains("kind: RegisterKind::Float32"));
        assert!(module.contains("unit: Some(\"%\")"));
        assert!(module.contains("hardware_support_register: Some(1)"));
        assert!(module.contains("base: 76"));
        assert!(module.contains("stride: 3"));
    }

    #[test]
    fn test_splice_replaces_only_marked_region() {
        let existing = format!(
            "//! Hand-written header.\n\nfn keep_me() {{}}\n\n{GENERATED_BEGIN}\nold content\n{GENERATED_END}\n\nfn also_keep_me() {{}}\n"
        );
        let module = render_module(&sample_catalog(), &CodegenOptions::default());

        let new = splice(&existing, &module, "registers.rs").unwrap();
        assert!(new.contains("fn keep_me()"));
        assert!(new.contains("fn also_keep_me()"));
        assert!(!new.contains("old content"));
        assert!(new.contains("IROCK_MODBUS_REGISTERS"));
    }

    #[test]
    fn test_splice_without_markers_errors() {
        let module = render_module(&sample_catalog(), &CodegenOptions::default());
        let err = splice("fn main() {}\n", &module, "registers.rs").unwrap_err();
        assert!(matches!(err, RegsyncError::MarkersMissing { .. }));
    }

    #[test]
    fn test_render_into_creates_fresh_file() {
        let rendered =
            render_into(None, &sample_catalog(), &CodegenOptions::default(), "x.rs").unwrap();
        assert!(rendered.changed);
        assert!(rendered.text.contains(GENERATED_BEGIN));
        assert_eq!(rendered.digest.len(), 64);
    }

    #[test]
    fn test_render_into_unchanged_roundtrip() {
        let catalog = sample_catalog();
        let opts = CodegenOptions::default();

        let first = render_into(None, &catalog, &opts, "x.rs").unwrap();
        let second = render_into(Some(&first.text), &catalog, &opts, "x.rs").unwrap();

        assert!(!second.changed, "re-rendering identical input must be a no-op");
        assert_eq!(first.digest, second.digest);
    }

    #[test]
    fn test_rust_str_escaping() {
        assert_eq!(rust_str("plain"), "\"plain\"");
        assert_eq!(rust_str("a\"b\\c"), "\"a\\\"b\\\\c\"");
        // Unicode units pass through untouched.
        assert_eq!(rust_str("°C"), "\"°C\"");
    }
}
