use std::path::Path;

use toml::Value;

use pkgs_core::{DependencyType, Ecosystem, ManifestKind, ParsedDependency, ParsedManifest};

use crate::adapter::{as_utf8, basename, EcosystemAdapter};
use crate::error::ParseFailure;

/// `pyproject.toml` (manifest; PEP 621 `project.dependencies` and
/// `[tool.poetry.dependencies]`) and `requirements.txt` (manifest,
/// line-based `name==version` parsing).
pub struct PypiAdapter;

impl EcosystemAdapter for PypiAdapter {
    fn recognize(&self, path: &Path) -> Option<ManifestKind> {
        match basename(path) {
            "pyproject.toml" => Some(ManifestKind::Manifest),
            "requirements.txt" => Some(ManifestKind::Manifest),
            _ => None,
        }
    }

    fn parse(&self, path: &Path, bytes: &[u8]) -> Result<ParsedManifest, ParseFailure> {
        let text = as_utf8(path, bytes)?;
        match basename(path) {
            "pyproject.toml" => {
                let value: Value = text.parse().map_err(|source| ParseFailure::Toml {
                    path: path.display().to_string(),
                    source,
                })?;
                Ok(parse_pyproject(&value))
            }
            "requirements.txt" => Ok(parse_requirements_txt(text)),
            _ => unreachable!("parse called without recognize"),
        }
    }
}

fn parse_pyproject(value: &Value) -> ParsedManifest {
    let mut dependencies = Vec::new();

    if let Some(deps) = value
        .get("project")
        .and_then(|p| p.get("dependencies"))
        .and_then(Value::as_array)
    {
        for dep in deps {
            if let Some(spec) = dep.as_str() {
                if let Some((name, requirement)) = split_pep508(spec) {
                    dependencies.push(ParsedDependency {
                        name,
                        requirement,
                        dependency_type: DependencyType::Runtime,
                    });
                }
            }
        }
    }

    if let Some(poetry_deps) = value
        .get("tool")
        .and_then(|t| t.get("poetry"))
        .and_then(|p| p.get("dependencies"))
        .and_then(Value::as_table)
    {
        for (name, spec) in poetry_deps {
            if name == "python" {
                continue;
            }
            let requirement = match spec {
                Value::String(s) => s.clone(),
                Value::Table(t) => t
                    .get("version")
                    .and_then(Value::as_str)
                    .unwrap_or("*")
                    .to_string(),
                _ => "*".to_string(),
            };
            dependencies.push(ParsedDependency {
                name: name.clone(),
                requirement,
                dependency_type: DependencyType::Runtime,
            });
        }
    }

    if let Some(groups) = value
        .get("tool")
        .and_then(|t| t.get("poetry"))
        .and_then(|p| p.get("group"))
        .and_then(Value::as_table)
    {
        for (group_name, group) in groups {
            let dep_type = if group_name == "dev" || group_name == "test" {
                DependencyType::Development
            } else {
                DependencyType::Runtime
            };
            if let Some(deps) = group.get("dependencies").and_then(Value::as_table) {
                for (name, spec) in deps {
                    let requirement = match spec {
                        Value::String(s) => s.clone(),
                        _ => "*".to_string(),
                    };
                    dependencies.push(ParsedDependency {
                        name: name.clone(),
                        requirement,
                        dependency_type: dep_type,
                    });
                }
            }
        }
    }

    ParsedManifest {
        ecosystem: Ecosystem::Pypi,
        kind: ManifestKind::Manifest,
        dependencies,
    }
}

/// Splits a PEP 508 requirement string (`"name>=1.0"`, `"name"`) into
/// `(name, requirement)`. Extras (`name[extra]`) and environment markers
/// (`; python_version >= ...`) are stripped from the name.
fn split_pep508(spec: &str) -> Option<(String, String)> {
    let spec = spec.split(';').next().unwrap_or(spec).trim();
    let name_end = spec
        .find(|c: char| !c.is_alphanumeric() && c != '-' && c != '_' && c != '.')
        .unwrap_or(spec.len());
    let name = spec[..name_end].trim().to_string();
    if name.is_empty() {
        return None;
    }
    let requirement = spec[name_end..].trim();
    let requirement = requirement
        .trim_start_matches(|c: char| c == '[' || c.is_alphanumeric() || c == ']')
        .trim();
    let requirement = if requirement.is_empty() {
        "*".to_string()
    } else {
        requirement.to_string()
    };
    Some((name, requirement))
}

fn parse_requirements_txt(text: &str) -> ParsedManifest {
    let mut dependencies = Vec::new();
    for line in text.lines() {
        let line = line.split('#').next().unwrap_or("").trim();
        if line.is_empty() || line.starts_with('-') {
            continue;
        }
        if let Some((name, requirement)) = split_pep508(line) {
            dependencies.push(ParsedDependency {
                name,
                requirement,
                dependency_type: DependencyType::Runtime,
            });
        }
    }
    ParsedManifest {
        ecosystem: Ecosystem::Pypi,
        kind: ManifestKind::Manifest,
        dependencies,
    }
}
