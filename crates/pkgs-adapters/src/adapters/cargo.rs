use std::path::Path;

use toml::Value;

use pkgs_core::{DependencyType, Ecosystem, ManifestKind, ParsedDependency, ParsedManifest};

use crate::adapter::{as_utf8, basename, EcosystemAdapter};
use crate::error::ParseFailure;

/// `Cargo.toml` (manifest; `[dependencies]`/`[dev-dependencies]`/
/// `[build-dependencies]`) and `Cargo.lock` (lockfile, `[[package]]`
/// entries).
pub struct CargoAdapter;

impl EcosystemAdapter for CargoAdapter {
    fn recognize(&self, path: &Path) -> Option<ManifestKind> {
        match basename(path) {
            "Cargo.toml" => Some(ManifestKind::Manifest),
            "Cargo.lock" => Some(ManifestKind::Lockfile),
            _ => None,
        }
    }

    fn parse(&self, path: &Path, bytes: &[u8]) -> Result<ParsedManifest, ParseFailure> {
        let text = as_utf8(path, bytes)?;
        let value: Value = text.parse().map_err(|source| ParseFailure::Toml {
            path: path.display().to_string(),
            source,
        })?;
        match self.recognize(path) {
            Some(ManifestKind::Manifest) => Ok(parse_cargo_toml(&value)),
            Some(ManifestKind::Lockfile) => Ok(parse_cargo_lock(&value)),
            None => unreachable!("parse called without recognize"),
        }
    }
}

fn parse_cargo_toml(value: &Value) -> ParsedManifest {
    let mut dependencies = Vec::new();
    for (table_name, dep_type) in [
        ("dependencies", DependencyType::Runtime),
        ("dev-dependencies", DependencyType::Development),
        ("build-dependencies", DependencyType::Build),
    ] {
        if let Some(table) = value.get(table_name).and_then(Value::as_table) {
            for (name, spec) in table {
                let requirement = requirement_from_spec(spec);
                dependencies.push(ParsedDependency {
                    name: name.clone(),
                    requirement,
                    dependency_type: dep_type,
                });
            }
        }
    }
    ParsedManifest {
        ecosystem: Ecosystem::Cargo,
        kind: ManifestKind::Manifest,
        dependencies,
    }
}

fn requirement_from_spec(spec: &Value) -> String {
    match spec {
        Value::String(s) => s.clone(),
        Value::Table(t) => t
            .get("version")
            .and_then(Value::as_str)
            .unwrap_or("*")
            .to_string(),
        _ => "*".to_string(),
    }
}

fn parse_cargo_lock(value: &Value) -> ParsedManifest {
    let mut dependencies = Vec::new();
    if let Some(packages) = value.get("package").and_then(Value::as_array) {
        for package in packages {
            let name = package
                .get("name")
                .and_then(Value::as_str)
                .unwrap_or("")
                .to_string();
            if name.is_empty() {
                continue;
            }
            let version = package
                .get("version")
                .and_then(Value::as_str)
                .unwrap_or("")
                .to_string();
            dependencies.push(ParsedDependency {
                name,
                requirement: version,
                dependency_type: DependencyType::Runtime,
            });
        }
    }
    ParsedManifest {
        ecosystem: Ecosystem::Cargo,
        kind: ManifestKind::Lockfile,
        dependencies,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_simple_and_table_dependency_specs() {
        let text = r#"
[dependencies]
serde = "1"
tokio = { version = "1.28", features = ["full"] }

[dev-dependencies]
tempfile = "3"
"#;
        let value: Value = text.parse().unwrap();
        let parsed = parse_cargo_toml(&value);
        assert_eq!(parsed.dependencies.len(), 3);
        let tokio = parsed.dependencies.iter().find(|d| d.name == "tokio").unwrap();
        assert_eq!(tokio.requirement, "1.28");
        let tempfile = parsed.dependencies.iter().find(|d| d.name == "tempfile").unwrap();
        assert_eq!(tempfile.dependency_type, DependencyType::Development);
    }

    #[test]
    fn parses_cargo_lock_packages() {
        let text = r#"
[[package]]
name = "serde"
version = "1.0.190"

[[package]]
name = "libc"
version = "0.2.150"
"#;
        let value: Value = text.parse().unwrap();
        let parsed = parse_cargo_lock(&value);
        assert_eq!(parsed.dependencies.len(), 2);
    }
}
