//! File reader (spec §2 C2, §4.7).

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

pub const MAX_LINES: usize = 500;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileReadResult {
    pub file_path: String,
    pub total_lines: usize,
    pub lines_shown: usize,
    pub line_range: (usize, usize),
    pub content: String,
    pub truncated: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

/// Read `path` (rooted at `project_root`), optionally restricted to
/// `[line_start, line_end]` (1-indexed, inclusive). Rejects paths outside
/// the project root, directories, and nonexistent files; enforces
/// `MAX_LINES` when no end is given (spec §4.7).
pub fn read(project_root: &Path, path: &Path, line_start: Option<usize>, line_end: Option<usize>) -> Result<FileReadResult, String> {
    let resolved = resolve_within_root(project_root, path)?;

    if resolved.is_dir() {
        return Err(format!("{}: is a directory, not a file", resolved.display()));
    }
    if !resolved.exists() {
        return Err(format!("{}: does not exist", resolved.display()));
    }

    let content = read_with_fallback(&resolved)?;
    let all_lines: Vec<&str> = content.lines().collect();
    let total_lines = all_lines.len();

    if let Some(start) = line_start {
        if start < 1 {
            return Err("line_start must be >= 1".to_string());
        }
        if start > total_lines {
            return Err(format!("line_start {start} exceeds total_lines {total_lines}"));
        }
    }
    if let (Some(start), Some(end)) = (line_start, line_end) {
        if end < start {
            return Err("line_end must be >= line_start".to_string());
        }
    }

    let start_idx = line_start.unwrap_or(1).max(1);
    let mut truncated = false;
    let mut message = None;

    let end_idx = match (line_start, line_end) {
        (_, Some(end)) => end.min(total_lines),
        (Some(start), None) => {
            let capped = (start - 1 + MAX_LINES).min(total_lines);
            if capped < total_lines {
                truncated = true;
                message = Some(format!(
                    "truncated at {MAX_LINES} lines; pass line_start/line_end to read more of this {total_lines}-line file"
                ));
            }
            capped
        }
        (None, None) => {
            if total_lines > MAX_LINES {
                truncated = true;
                message = Some(format!(
                    "truncated at {MAX_LINES} lines; pass line_start/line_end to read more of this {total_lines}-line file"
                ));
            }
            total_lines.min(MAX_LINES)
        }
    };

    let shown: Vec<String> = all_lines[start_idx - 1..end_idx]
        .iter()
        .enumerate()
        .map(|(i, line)| format!("{:5} | {}", start_idx + i, line))
        .collect();
    let lines_shown = shown.len();

    Ok(FileReadResult {
        file_path: resolved.to_string_lossy().into_owned(),
        total_lines,
        lines_shown,
        line_range: (start_idx, end_idx),
        content: shown.join("\n"),
        truncated,
        message,
    })
}

fn resolve_within_root(project_root: &Path, path: &Path) -> Result<PathBuf, String> {
    let candidate = if path.is_absolute() { path.to_path_buf() } else { project_root.join(path) };

    let root_canonical = project_root.canonicalize().map_err(|e| format!("project root unreadable: {e}"))?;

    let candidate_canonical = if candidate.exists() {
        candidate.canonicalize().map_err(|e| format!("could not resolve {}: {e}", candidate.display()))?
    } else {
        return Err(format!("{}: does not exist", candidate.display()));
    };

    if !candidate_canonical.starts_with(&root_canonical) {
        return Err("outside project root".to_string());
    }

    Ok(candidate_canonical)
}

/// Decode `path` as UTF-8; fall back to Latin-1 (every byte sequence is
/// valid Latin-1, so this path never fails) (spec §4.7).
fn read_with_fallback(path: &Path) -> Result<String, String> {
    let bytes = std::fs::read(path).map_err(|e| format!("could not read {}: {e}", path.display()))?;
    match String::from_utf8(bytes.clone()) {
        Ok(s) => Ok(s),
        Err(_) => Ok(bytes.iter().map(|&b| b as char).collect()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn fixture(lines: usize) -> (TempDir, PathBuf) {
        let dir = TempDir::new().unwrap();
        let content: String = (1..=lines).map(|i| format!("line {i}\n")).collect();
        let file = dir.path().join("app").join("models").join("member.rb");
        fs::create_dir_all(file.parent().unwrap()).unwrap();
        fs::write(&file, content).unwrap();
        (dir, PathBuf::from("app/models/member.rb"))
    }

    #[test]
    fn reads_full_small_file_with_line_numbers() {
        let (dir, rel) = fixture(3);
        let result = read(dir.path(), &rel, None, None).unwrap();
        assert_eq!(result.total_lines, 3);
        assert!(!result.truncated);
        assert!(result.content.starts_with("    1 | line 1"));
    }

    #[test]
    fn truncates_large_file_without_end() {
        let (dir, rel) = fixture(600);
        let result = read(dir.path(), &rel, None, None).unwrap();
        assert_eq!(result.lines_shown, MAX_LINES);
        assert!(result.truncated);
        assert!(result.message.is_some());
    }

    #[test]
    fn explicit_range_is_honored_even_past_max_lines() {
        let (dir, rel) = fixture(600);
        let result = read(dir.path(), &rel, Some(550), Some(560)).unwrap();
        assert_eq!(result.lines_shown, 11);
        assert!(!result.truncated);
    }

    #[test]
    fn rejects_line_start_below_one() {
        let (dir, rel) = fixture(10);
        assert!(read(dir.path(), &rel, Some(0), None).is_err());
    }

    #[test]
    fn rejects_line_end_before_line_start() {
        let (dir, rel) = fixture(10);
        assert!(read(dir.path(), &rel, Some(5), Some(3)).is_err());
    }

    #[test]
    fn rejects_line_start_past_total_lines() {
        let (dir, rel) = fixture(10);
        assert!(read(dir.path(), &rel, Some(20), None).is_err());
    }

    #[test]
    fn rejects_path_outside_project_root() {
        let (dir, _rel) = fixture(10);
        let other = TempDir::new().unwrap();
        let outside_file = other.path().join("secret.rb");
        fs::write(&outside_file, "x").unwrap();
        let result = read(dir.path(), &outside_file, None, None);
        assert_eq!(result.unwrap_err(), "outside project root");
    }

    #[test]
    fn rejects_directory() {
        let (dir, _rel) = fixture(10);
        let result = read(dir.path(), Path::new("app/models"), None, None);
        assert!(result.is_err());
    }

    #[test]
    fn rejects_nonexistent_path() {
        let (dir, _rel) = fixture(10);
        let result = read(dir.path(), Path::new("app/models/ghost.rb"), None, None);
        assert!(result.is_err());
    }
}
