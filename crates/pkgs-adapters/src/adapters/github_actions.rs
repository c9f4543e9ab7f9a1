use std::path::Path;

use serde_yaml::Value;

use pkgs_core::{DependencyType, Ecosystem, ManifestKind, ParsedDependency, ParsedManifest};

use crate::adapter::{as_utf8, extension, EcosystemAdapter};
use crate::error::ParseFailure;

/// `.github/workflows/*.yml`/`*.yaml`: each step's `uses: owner/repo@ref`
/// is a dependency named `owner/repo`, requirement = `ref`.
pub struct GithubActionsAdapter;

impl EcosystemAdapter for GithubActionsAdapter {
    fn recognize(&self, path: &Path) -> Option<ManifestKind> {
        let path_str = path.to_string_lossy();
        let in_workflows_dir = path_str.contains(".github/workflows/");
        let is_yaml = matches!(extension(path), "yml" | "yaml");
        if in_workflows_dir && is_yaml {
            Some(ManifestKind::Manifest)
        } else {
            None
        }
    }

    fn parse(&self, path: &Path, bytes: &[u8]) -> Result<ParsedManifest, ParseFailure> {
        let text = as_utf8(path, bytes)?;
        let value: Value = serde_yaml::from_str(text).map_err(|source| ParseFailure::Yaml {
            path: path.display().to_string(),
            source,
        })?;
        Ok(parse_workflow(&value))
    }
}

fn parse_workflow(value: &Value) -> ParsedManifest {
    let mut dependencies = Vec::new();
    collect_uses(value, &mut dependencies);
    ParsedManifest {
        ecosystem: Ecosystem::GithubActions,
        kind: ManifestKind::Manifest,
        dependencies,
    }
}

/// Walks the whole document looking for `uses:` keys rather than
/// hand-modeling the full workflow schema — workflow YAML nests `steps`
/// under `jobs.<id>.steps` and, for composite/reusable workflows, under
/// other shapes too, so a structural walk is more robust than a fixed path.
fn collect_uses(value: &Value, out: &mut Vec<ParsedDependency>) {
    match value {
        Value::Mapping(map) => {
            for (key, val) in map {
                if key.as_str() == Some("uses") {
                    if let Some(spec) = val.as_str() {
                        if let Some(dep) = split_uses(spec) {
                            out.push(dep);
                        }
                    }
                } else {
                    collect_uses(val, out);
                }
            }
        }
        Value::Sequence(seq) => {
            for item in seq {
                collect_uses(item, out);
            }
        }
        _ => {}
    }
}

fn split_uses(spec: &str) -> Option<ParsedDependency> {
    // local/docker actions ("./local-action", "docker://image") are not a
    // registry-identified dependency in this ecosystem.
    if spec.starts_with('.') || spec.starts_with("docker://") {
        return None;
    }
    let (name, requirement) = spec.split_once('@')?;
    Some(ParsedDependency {
        name: name.to_string(),
        requirement: requirement.to_string(),
        dependency_type: DependencyType::Runtime,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recognizes_only_workflow_yaml_files() {
        let adapter = GithubActionsAdapter;
        assert!(adapter
            .recognize(Path::new(".github/workflows/ci.yml"))
            .is_some());
        assert!(adapter
            .recognize(Path::new(".github/workflows/ci.yaml"))
            .is_some());
        assert!(adapter.recognize(Path::new(".github/ci.yml")).is_none());
        assert!(adapter.recognize(Path::new("ci.yml")).is_none());
    }

    #[test]
    fn extracts_uses_steps_across_nested_jobs() {
        let text = r#"
jobs:
  build:
    steps:
      - uses: actions/checkout@v4
      - uses: actions/setup-node@v3
        with:
          node-version: 18
  test:
    steps:
      - run: echo hi
      - uses: actions/cache@v3
"#;
        let value: Value = serde_yaml::from_str(text).unwrap();
        let parsed = parse_workflow(&value);
        assert_eq!(parsed.dependencies.len(), 3);
        assert!(parsed
            .dependencies
            .iter()
            .any(|d| d.name == "actions/checkout" && d.requirement == "v4"));
    }

    #[test]
    fn skips_local_and_docker_uses() {
        let text = r#"
jobs:
  build:
    steps:
      - uses: ./.github/actions/local
      - uses: docker://alpine:3.18
"#;
        let value: Value = serde_yaml::from_str(text).unwrap();
        let parsed = parse_workflow(&value);
        assert!(parsed.dependencies.is_empty());
    }
}
