//! Terminal rendering (C0 ambient surface): plain-text tables for
//! interactive use, `serde_json` for `--format=json`, minimal hand-rolled
//! ANSI color (`NO_COLOR`/`--no-color`/`color.pkgs`/`color.ui` aware), and
//! `GIT_PAGER`/`PAGER`/`core.pager` piping. No color-terminal crate is
//! pulled in here — none of the corpus this workspace is grounded on reaches
//! for one for CLI output, so this follows suit (see DESIGN.md).

use std::io::Write;
use std::process::{Command, Stdio};

const RESET: &str = "\x1b[0m";
const RED: &str = "\x1b[31m";
const GREEN: &str = "\x1b[32m";
const YELLOW: &str = "\x1b[33m";
const DIM: &str = "\x1b[2m";
const BOLD: &str = "\x1b[1m";

/// Whether ANSI escapes should be emitted at all.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Painter {
    enabled: bool,
}

impl Painter {
    pub fn new(enabled: bool) -> Self {
        Self { enabled }
    }

    fn wrap(&self, code: &str, text: &str) -> String {
        if self.enabled {
            format!("{code}{text}{RESET}")
        } else {
            text.to_string()
        }
    }

    pub fn added(&self, text: &str) -> String {
        self.wrap(GREEN, text)
    }

    pub fn removed(&self, text: &str) -> String {
        self.wrap(RED, text)
    }

    pub fn modified(&self, text: &str) -> String {
        self.wrap(YELLOW, text)
    }

    pub fn dim(&self, text: &str) -> String {
        self.wrap(DIM, text)
    }

    pub fn bold(&self, text: &str) -> String {
        self.wrap(BOLD, text)
    }
}

/// Renders an aligned plain-text table: a header row, then one row per
/// `rows` entry, columns padded to the widest cell in that column.
pub fn table(headers: &[&str], rows: &[Vec<String>]) -> String {
    let mut widths: Vec<usize> = headers.iter().map(|h| h.len()).collect();
    for row in rows {
        for (i, cell) in row.iter().enumerate() {
            if let Some(w) = widths.get_mut(i) {
                *w = (*w).max(cell.len());
            }
        }
    }

    let mut out = String::new();
    out.push_str(&render_row(headers.iter().map(|s| s.to_string()).collect::<Vec<_>>().as_slice(), &widths));
    out.push('\n');
    for row in rows {
        out.push_str(&render_row(row, &widths));
        out.push('\n');
    }
    out.trim_end_matches('\n').to_string()
}

fn render_row(cells: &[String], widths: &[usize]) -> String {
    cells
        .iter()
        .enumerate()
        .map(|(i, cell)| format!("{:width$}", cell, width = widths.get(i).copied().unwrap_or(0)))
        .collect::<Vec<_>>()
        .join("  ")
        .trim_end()
        .to_string()
}

/// Resolves the pager command per env precedence: `GIT_PAGER` >
/// `core.pager` > `PAGER`.
pub fn resolve_pager(core_pager: Option<&str>) -> Option<String> {
    std::env::var("GIT_PAGER")
        .ok()
        .or_else(|| core_pager.map(|s| s.to_string()))
        .or_else(|| std::env::var("PAGER").ok())
        .filter(|cmd| !cmd.is_empty() && cmd != "cat")
}

/// Writes `content` to the configured pager's stdin if one is resolved and
/// `use_pager` allows it (never under `--quiet`/`--format=json`), otherwise
/// prints directly to stdout.
pub fn print_or_page(content: &str, pager: Option<&str>, use_pager: bool) {
    if use_pager {
        if let Some(cmd) = pager {
            if let Some(mut child) = spawn_pager(cmd) {
                if let Some(stdin) = child.stdin.as_mut() {
                    let _ = writeln!(stdin, "{content}");
                }
                let _ = child.wait();
                return;
            }
        }
    }
    println!("{content}");
}

fn spawn_pager(cmd: &str) -> Option<std::process::Child> {
    let mut parts = cmd.split_whitespace();
    let program = parts.next()?;
    Command::new(program)
        .args(parts)
        .stdin(Stdio::piped())
        .spawn()
        .ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn painter_no_ops_when_disabled() {
        let painter = Painter::new(false);
        assert_eq!(painter.added("x"), "x");
    }

    #[test]
    fn painter_wraps_with_ansi_when_enabled() {
        let painter = Painter::new(true);
        assert!(painter.added("x").contains("\x1b[32m"));
    }

    #[test]
    fn table_pads_columns_to_the_widest_cell() {
        let rendered = table(
            &["name", "requirement"],
            &[vec!["rails".to_string(), "~> 7.0".to_string()], vec!["a".to_string(), "1".to_string()]],
        );
        let lines: Vec<&str> = rendered.lines().collect();
        assert_eq!(lines.len(), 3);
        assert!(lines[0].starts_with("name "));
    }

    #[test]
    fn resolve_pager_prefers_git_pager_over_core_pager() {
        std::env::set_var("GIT_PAGER", "less-from-env");
        std::env::remove_var("PAGER");
        assert_eq!(resolve_pager(Some("less-from-config")).as_deref(), Some("less-from-env"));
        std::env::remove_var("GIT_PAGER");
    }

    #[test]
    fn resolve_pager_treats_cat_as_no_pager() {
        std::env::remove_var("GIT_PAGER");
        std::env::remove_var("PAGER");
        assert_eq!(resolve_pager(Some("cat")), None);
    }
}
