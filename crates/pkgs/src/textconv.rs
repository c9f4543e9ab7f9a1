//! `git-pkgs pkgs-textconv <path>`: a git `textconv` driver that renders a
//! manifest/lockfile blob as a `name  requirement` table
//! instead of its raw bytes. Installed via
//! `git config diff.pkgs.textconv "git-pkgs pkgs-textconv"`. Reads bytes
//! from stdin (the convention git's textconv protocol uses) and never
//! touches the store.

use std::io::Read;
use std::path::Path;

use pkgs_adapters::AdapterRegistry;
use pkgs_core::EcosystemFilter;

/// Renders `bytes` (the blob git hands a textconv driver) as sorted
/// `name  requirement` lines, or a placeholder if `path` isn't recognized
/// or doesn't parse.
pub fn render(path: &Path, bytes: &[u8]) -> String {
    let registry = AdapterRegistry::default_registry();
    match registry.analyse(path, bytes, &EcosystemFilter::allow_all()) {
        None => String::from_utf8_lossy(bytes).into_owned(),
        Some(Err(_)) => String::from_utf8_lossy(bytes).into_owned(),
        Some(Ok(parsed)) => {
            let mut deps = parsed.dependencies;
            deps.sort_by(|a, b| a.name.cmp(&b.name));
            let width = deps.iter().map(|d| d.name.len()).max().unwrap_or(0);
            deps.iter()
                .map(|d| format!("{:width$}  {}", d.name, d.requirement, width = width))
                .collect::<Vec<_>>()
                .join("\n")
        }
    }
}

/// Reads the blob from stdin and prints the rendered table, per the
/// `pkgs-textconv <path>` subcommand contract.
pub fn run(path: &Path) -> std::io::Result<()> {
    let mut bytes = Vec::new();
    std::io::stdin().read_to_end(&mut bytes)?;
    println!("{}", render(path, &bytes));
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn renders_a_sorted_name_requirement_table() {
        let bytes = b"gem \"rails\", \"~> 7.0\"\ngem \"actionpack\", \"~> 7.0\"\n";
        let rendered = render(Path::new("Gemfile"), bytes);
        let lines: Vec<&str> = rendered.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].starts_with("actionpack"));
    }

    #[test]
    fn unrecognized_path_falls_back_to_raw_bytes() {
        let rendered = render(Path::new("README.md"), b"hello world");
        assert_eq!(rendered, "hello world");
    }
}
