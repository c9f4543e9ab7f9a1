use std::path::Path;

use pkgs_core::{DependencyType, Ecosystem, ManifestKind, ParsedDependency, ParsedManifest};

use crate::adapter::{as_utf8, basename, extension, EcosystemAdapter};
use crate::error::ParseFailure;

/// `Dockerfile`/`*.Dockerfile`: each `FROM <image>` line is a dependency
/// named by image repository, requirement = tag or digest.
pub struct DockerAdapter;

impl EcosystemAdapter for DockerAdapter {
    fn recognize(&self, path: &Path) -> Option<ManifestKind> {
        if basename(path) == "Dockerfile" || extension(path) == "Dockerfile" {
            Some(ManifestKind::Manifest)
        } else {
            None
        }
    }

    fn parse(&self, path: &Path, bytes: &[u8]) -> Result<ParsedManifest, ParseFailure> {
        let text = as_utf8(path, bytes)?;
        Ok(parse_dockerfile(text))
    }
}

fn parse_dockerfile(text: &str) -> ParsedManifest {
    let mut dependencies = Vec::new();
    for line in text.lines() {
        let trimmed = line.trim();
        if !trimmed.to_uppercase().starts_with("FROM ") {
            continue;
        }
        let rest = trimmed[5..].trim();
        // `FROM image AS alias` — drop the alias.
        let image_spec = rest.split_whitespace().next().unwrap_or(rest);
        if image_spec.eq_ignore_ascii_case("scratch") {
            continue;
        }
        let (name, requirement) = split_image_ref(image_spec);
        dependencies.push(ParsedDependency {
            name,
            requirement,
            dependency_type: DependencyType::Runtime,
        });
    }
    ParsedManifest {
        ecosystem: Ecosystem::Docker,
        kind: ManifestKind::Manifest,
        dependencies,
    }
}

/// Splits `repo:tag`, `repo@digest`, or bare `repo` (defaults to `latest`).
/// A registry host containing a port (`host:5000/repo`) is distinguished
/// from a tag by checking for a `/` after the colon.
fn split_image_ref(image_spec: &str) -> (String, String) {
    if let Some(at_idx) = image_spec.find('@') {
        let (name, digest) = image_spec.split_at(at_idx);
        return (name.to_string(), digest[1..].to_string());
    }
    if let Some(colon_idx) = image_spec.rfind(':') {
        let (name, tag) = image_spec.split_at(colon_idx);
        let tag = &tag[1..];
        if !tag.contains('/') {
            return (name.to_string(), tag.to_string());
        }
    }
    (image_spec.to_string(), "latest".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recognizes_dockerfile_and_suffixed_variants() {
        let adapter = DockerAdapter;
        assert!(adapter.recognize(Path::new("Dockerfile")).is_some());
        assert!(adapter.recognize(Path::new("app.Dockerfile")).is_some());
        assert!(adapter.recognize(Path::new("readme.md")).is_none());
    }

    #[test]
    fn parses_from_lines_with_tags_and_aliases() {
        let text = "FROM rust:1.75 AS builder\nFROM debian:bookworm-slim\n";
        let parsed = parse_dockerfile(text);
        assert_eq!(parsed.dependencies.len(), 2);
        assert_eq!(parsed.dependencies[0].name, "rust");
        assert_eq!(parsed.dependencies[0].requirement, "1.75");
        assert_eq!(parsed.dependencies[1].name, "debian");
        assert_eq!(parsed.dependencies[1].requirement, "bookworm-slim");
    }

    #[test]
    fn handles_digest_pinned_and_registry_port_images() {
        let text = "FROM alpine@sha256:abcd1234\nFROM localhost:5000/myimage\n";
        let parsed = parse_dockerfile(text);
        assert_eq!(parsed.dependencies[0].requirement, "sha256:abcd1234");
        assert_eq!(parsed.dependencies[1].name, "localhost:5000/myimage");
        assert_eq!(parsed.dependencies[1].requirement, "latest");
    }

    #[test]
    fn skips_scratch_base() {
        let parsed = parse_dockerfile("FROM scratch\n");
        assert!(parsed.dependencies.is_empty());
    }
}
