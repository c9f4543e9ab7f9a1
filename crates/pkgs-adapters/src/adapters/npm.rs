use std::path::Path;

use serde_json::Value;

use pkgs_core::{DependencyType, Ecosystem, ManifestKind, ParsedDependency, ParsedManifest};

use crate::adapter::{as_utf8, basename, EcosystemAdapter};
use crate::error::ParseFailure;

/// `package.json` (manifest; `dependencies`/`devDependencies`/
/// `peerDependencies`) and `package-lock.json` (lockfile, v1-v3 shapes,
/// best-effort).
pub struct NpmAdapter;

impl EcosystemAdapter for NpmAdapter {
    fn recognize(&self, path: &Path) -> Option<ManifestKind> {
        match basename(path) {
            "package.json" => Some(ManifestKind::Manifest),
            "package-lock.json" => Some(ManifestKind::Lockfile),
            _ => None,
        }
    }

    fn parse(&self, path: &Path, bytes: &[u8]) -> Result<ParsedManifest, ParseFailure> {
        let text = as_utf8(path, bytes)?;
        let value: Value = serde_json::from_str(text).map_err(|source| ParseFailure::Json {
            path: path.display().to_string(),
            source,
        })?;
        match self.recognize(path) {
            Some(ManifestKind::Manifest) => Ok(parse_package_json(&value)),
            Some(ManifestKind::Lockfile) => Ok(parse_package_lock(&value)),
            None => unreachable!("parse called without recognize"),
        }
    }
}

fn parse_package_json(value: &Value) -> ParsedManifest {
    let mut dependencies = Vec::new();
    for (field, dep_type) in [
        ("dependencies", DependencyType::Runtime),
        ("devDependencies", DependencyType::Development),
        ("peerDependencies", DependencyType::Peer),
    ] {
        if let Some(map) = value.get(field).and_then(Value::as_object) {
            for (name, requirement) in map {
                dependencies.push(ParsedDependency {
                    name: name.clone(),
                    requirement: requirement.as_str().unwrap_or("*").to_string(),
                    dependency_type: dep_type,
                });
            }
        }
    }
    ParsedManifest {
        ecosystem: Ecosystem::Npm,
        kind: ManifestKind::Manifest,
        dependencies,
    }
}

fn parse_package_lock(value: &Value) -> ParsedManifest {
    let mut dependencies = Vec::new();

    // v2/v3 shape: top-level "packages" map keyed by "node_modules/<name>".
    if let Some(packages) = value.get("packages").and_then(Value::as_object) {
        for (key, entry) in packages {
            if key.is_empty() {
                continue; // the root project entry
            }
            let name = key
                .rsplit("node_modules/")
                .next()
                .unwrap_or(key)
                .to_string();
            let version = entry
                .get("version")
                .and_then(Value::as_str)
                .unwrap_or("")
                .to_string();
            let dev = entry.get("dev").and_then(Value::as_bool).unwrap_or(false);
            dependencies.push(ParsedDependency {
                name,
                requirement: version,
                dependency_type: if dev {
                    DependencyType::Development
                } else {
                    DependencyType::Runtime
                },
            });
        }
    } else if let Some(deps) = value.get("dependencies").and_then(Value::as_object) {
        // v1 shape: top-level "dependencies" map, recursive nesting ignored
        // (flat best-effort per spec).
        for (name, entry) in deps {
            let version = entry
                .get("version")
                .and_then(Value::as_str)
                .unwrap_or("")
                .to_string();
            let dev = entry.get("dev").and_then(Value::as_bool).unwrap_or(false);
            dependencies.push(ParsedDependency {
                name: name.clone(),
                requirement: version,
                dependency_type: if dev {
                    DependencyType::Development
                } else {
                    DependencyType::Runtime
                },
            });
        }
    }

    ParsedManifest {
        ecosystem: Ecosystem::Npm,
        kind: ManifestKind::Lockfile,
        dependencies,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn splits_runtime_and_dev_dependencies() {
        let text = r#"{
            "dependencies": {"lodash": "^4.0.0"},
            "devDependencies": {"jest": "^29"}
        }"#;
        let value: Value = serde_json::from_str(text).unwrap();
        let parsed = parse_package_json(&value);
        assert_eq!(parsed.dependencies.len(), 2);
        let lodash = parsed.dependencies.iter().find(|d| d.name == "lodash").unwrap();
        assert_eq!(lodash.dependency_type, DependencyType::Runtime);
        let jest = parsed.dependencies.iter().find(|d| d.name == "jest").unwrap();
        assert_eq!(jest.dependency_type, DependencyType::Development);
    }

    #[test]
    fn package_json_with_no_deps_is_empty_not_failed() {
        let value: Value = serde_json::from_str("{}").unwrap();
        let parsed = parse_package_json(&value);
        assert!(parsed.dependencies.is_empty());
    }

    #[test]
    fn package_lock_v2_reads_packages_map() {
        let text = r#"{
            "lockfileVersion": 2,
            "packages": {
                "": {"name": "root"},
                "node_modules/lodash": {"version": "4.17.21"}
            }
        }"#;
        let value: Value = serde_json::from_str(text).unwrap();
        let parsed = parse_package_lock(&value);
        assert_eq!(parsed.dependencies.len(), 1);
        assert_eq!(parsed.dependencies[0].name, "lodash");
        assert_eq!(parsed.dependencies[0].requirement, "4.17.21");
    }
}
