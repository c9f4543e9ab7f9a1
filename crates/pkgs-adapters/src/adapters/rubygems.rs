use std::path::Path;

use pkgs_core::{DependencyType, Ecosystem, ManifestKind, ParsedDependency, ParsedManifest};

use crate::adapter::{as_utf8, basename, EcosystemAdapter};
use crate::error::ParseFailure;

/// `Gemfile` (manifest, `gem "name", "req"` lines) and `Gemfile.lock`
/// (lockfile, the `GEM` section's `    name (version)` lines).
pub struct RubygemsAdapter;

impl EcosystemAdapter for RubygemsAdapter {
    fn recognize(&self, path: &Path) -> Option<ManifestKind> {
        match basename(path) {
            "Gemfile" => Some(ManifestKind::Manifest),
            "Gemfile.lock" => Some(ManifestKind::Lockfile),
            _ => None,
        }
    }

    fn parse(&self, path: &Path, bytes: &[u8]) -> Result<ParsedManifest, ParseFailure> {
        let text = as_utf8(path, bytes)?;
        match self.recognize(path) {
            Some(ManifestKind::Manifest) => Ok(parse_gemfile(text)),
            Some(ManifestKind::Lockfile) => Ok(parse_gemfile_lock(text)),
            None => unreachable!("parse called without recognize"),
        }
    }
}

fn parse_gemfile(text: &str) -> ParsedManifest {
    let mut dependencies = Vec::new();
    for line in text.lines() {
        let trimmed = line.trim();
        if !trimmed.starts_with("gem ") && !trimmed.starts_with("gem\"") {
            continue;
        }
        let rest = trimmed
            .trim_start_matches("gem")
            .trim_start_matches(' ');
        let quoted = extract_quoted(rest);
        if quoted.is_empty() {
            continue;
        }
        let name = quoted[0].clone();
        let requirement = quoted
            .iter()
            .skip(1)
            .find(|s| looks_like_requirement(s))
            .cloned()
            .unwrap_or_else(|| ">= 0".to_string());
        let dependency_type = if line_has_group(trimmed, &["development", "test"]) {
            DependencyType::Development
        } else {
            DependencyType::Runtime
        };
        dependencies.push(ParsedDependency {
            name,
            requirement,
            dependency_type,
        });
    }
    ParsedManifest {
        ecosystem: Ecosystem::Rubygems,
        kind: ManifestKind::Manifest,
        dependencies,
    }
}

fn looks_like_requirement(value: &str) -> bool {
    value
        .chars()
        .next()
        .map(|c| c.is_ascii_digit() || c == '~' || c == '>' || c == '<' || c == '=')
        .unwrap_or(false)
}

fn line_has_group(line: &str, groups: &[&str]) -> bool {
    groups.iter().any(|g| line.contains(&format!(":{g}")))
}

fn extract_quoted(rest: &str) -> Vec<String> {
    let mut out = Vec::new();
    let mut chars = rest.chars().peekable();
    while let Some(c) = chars.next() {
        if c == '"' || c == '\'' {
            let quote = c;
            let mut value = String::new();
            for ch in chars.by_ref() {
                if ch == quote {
                    break;
                }
                value.push(ch);
            }
            out.push(value);
        }
        if c == '#' {
            break;
        }
    }
    out
}

fn parse_gemfile_lock(text: &str) -> ParsedManifest {
    let mut dependencies = Vec::new();
    let mut in_gem_section = false;
    for line in text.lines() {
        if line == "GEM" {
            in_gem_section = true;
            continue;
        }
        if !line.starts_with(' ') && !line.is_empty() {
            in_gem_section = false;
        }
        if !in_gem_section {
            continue;
        }
        let trimmed = line.trim_start();
        // specs entries are indented 4 spaces: "    name (version)"
        if !line.starts_with("    ") || line.starts_with("     ") {
            continue;
        }
        if let Some((name, version)) = split_spec_line(trimmed) {
            dependencies.push(ParsedDependency {
                name,
                requirement: version,
                dependency_type: DependencyType::Runtime,
            });
        }
    }
    ParsedManifest {
        ecosystem: Ecosystem::Rubygems,
        kind: ManifestKind::Lockfile,
        dependencies,
    }
}

fn split_spec_line(trimmed: &str) -> Option<(String, String)> {
    let open = trimmed.find('(')?;
    let close = trimmed.rfind(')')?;
    if close < open {
        return None;
    }
    let name = trimmed[..open].trim().to_string();
    if name.is_empty() {
        return None;
    }
    let version = trimmed[open + 1..close].trim().to_string();
    Some((name, version))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recognizes_gemfile_and_lock() {
        let adapter = RubygemsAdapter;
        assert_eq!(
            adapter.recognize(Path::new("Gemfile")),
            Some(ManifestKind::Manifest)
        );
        assert_eq!(
            adapter.recognize(Path::new("Gemfile.lock")),
            Some(ManifestKind::Lockfile)
        );
        assert_eq!(adapter.recognize(Path::new("Rakefile")), None);
    }

    #[test]
    fn parses_basic_gemfile() {
        let text = "source \"https://rubygems.org\"\ngem \"rails\", \"~> 7.0\"\n";
        let parsed = parse_gemfile(text);
        assert_eq!(parsed.dependencies.len(), 1);
        assert_eq!(parsed.dependencies[0].name, "rails");
        assert_eq!(parsed.dependencies[0].requirement, "~> 7.0");
        assert_eq!(parsed.dependencies[0].dependency_type, DependencyType::Runtime);
    }

    #[test]
    fn marks_group_test_development_dependencies() {
        let text = "group :development, :test do\n  gem \"rspec\", \"~> 3.0\"\nend\n";
        let parsed = parse_gemfile(text);
        assert_eq!(parsed.dependencies[0].dependency_type, DependencyType::Development);
    }

    #[test]
    fn parses_gemfile_lock_spec_lines() {
        let text = "GEM\n  remote: https://rubygems.org/\n  specs:\n    rails (7.0.4)\n    rake (13.0.6)\n\nPLATFORMS\n  ruby\n";
        let parsed = parse_gemfile_lock(text);
        assert_eq!(parsed.dependencies.len(), 2);
        assert_eq!(parsed.dependencies[0].name, "rails");
        assert_eq!(parsed.dependencies[0].requirement, "7.0.4");
    }

    #[test]
    fn empty_gemfile_yields_zero_dependencies_not_a_failure() {
        let parsed = parse_gemfile("source \"https://rubygems.org\"\n");
        assert!(parsed.dependencies.is_empty());
    }
}
