//! The filesystem half of `where`: given a manifest path
//! already known to declare a dependency, scans the working-tree copy of
//! that file for the lines that mention it. Plain substring scan, no
//! regex — manifest keys are declared literally, never interpolated.

use std::fs;
use std::path::Path;

use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LineMatch {
    pub line_number: usize,
    pub text: String,
    pub context: String,
}

/// Returns every line in `repo_root/path` containing `name`, 1-indexed,
/// with `context` surrounding lines (spec `where NAME [-C N]`) folded into
/// `context` as a joined block. Missing files (deleted since the commit
/// under inspection, or a worktree-less bare clone) yield an empty result
/// rather than an error — `where` degrades gracefully when the tree
/// doesn't match the index.
pub fn grep_line_numbers(repo_root: &Path, path: &str, name: &str, context: usize) -> Vec<LineMatch> {
    let Ok(contents) = fs::read_to_string(repo_root.join(path)) else {
        return Vec::new();
    };
    let lines: Vec<&str> = contents.lines().collect();
    let mut matches = Vec::new();
    for (idx, line) in lines.iter().enumerate() {
        if !line.contains(name) {
            continue;
        }
        let start = idx.saturating_sub(context);
        let end = (idx + context + 1).min(lines.len());
        matches.push(LineMatch {
            line_number: idx + 1,
            text: line.trim().to_string(),
            context: lines[start..end].join("\n"),
        });
    }
    matches
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn finds_matching_lines_with_one_indexed_numbers() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("package.json");
        let mut file = fs::File::create(&path).unwrap();
        writeln!(file, "{{").unwrap();
        writeln!(file, "  \"dependencies\": {{").unwrap();
        writeln!(file, "    \"lodash\": \"^4.0.0\"").unwrap();
        writeln!(file, "  }}").unwrap();
        writeln!(file, "}}").unwrap();

        let matches = grep_line_numbers(dir.path(), "package.json", "lodash", 0);
        assert_eq!(matches.len(), 1);
        assert_eq!(matches[0].line_number, 3);

        let with_context = grep_line_numbers(dir.path(), "package.json", "lodash", 1);
        assert_eq!(with_context[0].context.lines().count(), 3);
    }

    #[test]
    fn missing_file_yields_no_matches() {
        let dir = tempfile::tempdir().unwrap();
        assert!(grep_line_numbers(dir.path(), "does-not-exist.json", "lodash", 0).is_empty());
    }
}
