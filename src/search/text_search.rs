//! Text search backend (spec §2 C1).
//!
//! Executes a regex over files under the project root filtered by a glob and
//! by the standing test-directory exclusion (spec §6 "File-system surface").
//! Invoked as a disposable blocking task with a hard 10-second wall-clock
//! timeout (spec §5 "Cancellation and timeouts").

use std::path::{Path, PathBuf};
use std::time::Duration;

use regex::Regex;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchHit {
    pub path: PathBuf,
    pub line: usize,
    pub content: String,
}

/// Expand a single `{a,b,c}` brace-alternation group (the `glob` crate has no
/// native brace support), returning one concrete glob per alternative.
fn expand_braces(pattern: &str) -> Vec<String> {
    let Some(start) = pattern.find('{') else {
        return vec![pattern.to_string()];
    };
    let Some(rel_end) = pattern[start..].find('}') else {
        return vec![pattern.to_string()];
    };
    let end = start + rel_end;
    let prefix = &pattern[..start];
    let suffix = &pattern[end + 1..];
    pattern[start + 1..end].split(',').map(|alt| format!("{prefix}{alt}{suffix}")).collect()
}

fn is_excluded(path: &Path) -> bool {
    for component in path.components() {
        if let std::path::Component::Normal(os) = component {
            if matches!(os.to_str(), Some("test") | Some("spec") | Some("tests")) {
                return true;
            }
        }
    }
    path.file_stem()
        .and_then(|s| s.to_str())
        .is_some_and(|stem| stem.ends_with("_test") || stem.ends_with("_spec"))
}

fn run_search(root: &Path, regex: &Regex, glob_pattern: &str) -> Result<Vec<SearchHit>, String> {
    let mut hits = Vec::new();
    for expanded in expand_braces(glob_pattern) {
        let full_pattern = root.join(&expanded);
        let full_pattern = full_pattern.to_string_lossy().into_owned();
        let paths = glob::glob(&full_pattern).map_err(|e| format!("invalid glob {expanded}: {e}"))?;
        for entry in paths {
            let Ok(path) = entry else { continue };
            if !path.is_file() || is_excluded(&path) {
                continue;
            }
            let Ok(content) = std::fs::read_to_string(&path) else { continue };
            for (idx, line) in content.lines().enumerate() {
                if regex.is_match(line) {
                    hits.push(SearchHit {
                        path: path.clone(),
                        line: idx + 1,
                        content: line.to_string(),
                    });
                }
            }
        }
    }
    Ok(hits)
}

/// Run `pattern` (a regex) over every file matching `glob_pattern` under
/// `project_root`, excluding test directories/files. Killed after 10 seconds
/// wall-clock, returning `Err("timed out")` on expiry (spec §5).
pub async fn search(project_root: &Path, pattern: &str, glob_pattern: &str) -> Result<Vec<SearchHit>, String> {
    let regex = Regex::new(pattern).map_err(|e| format!("invalid pattern: {e}"))?;
    let root = project_root.to_path_buf();
    let glob_pattern = glob_pattern.to_string();

    let task = tokio::task::spawn_blocking(move || run_search(&root, &regex, &glob_pattern));

    match tokio::time::timeout(Duration::from_secs(10), task).await {
        Ok(Ok(result)) => result,
        Ok(Err(_)) => Err("search task panicked".to_string()),
        Err(_) => Err("timed out".to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn fixture() -> TempDir {
        let dir = TempDir::new().unwrap();
        let models = dir.path().join("app").join("models");
        fs::create_dir_all(&models).unwrap();
        fs::write(models.join("member.rb"), "class Member\n  scope :active, -> { where(disabled: false) }\nend\n").unwrap();
        let spec = dir.path().join("spec").join("models");
        fs::create_dir_all(&spec).unwrap();
        fs::write(spec.join("member_spec.rb"), "scope :active, -> { where(disabled: false) }\n").unwrap();
        dir
    }

    #[tokio::test]
    async fn finds_matches_and_reports_line_numbers() {
        let dir = fixture();
        let hits = search(dir.path(), r"scope\s+:active", "app/models/**/*.rb").await.unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].line, 2);
    }

    #[tokio::test]
    async fn excludes_spec_directory() {
        let dir = fixture();
        let hits = search(dir.path(), r"scope\s+:active", "**/*.rb").await.unwrap();
        assert!(hits.iter().all(|h| !h.path.to_string_lossy().contains("/spec/")));
    }

    #[tokio::test]
    async fn brace_alternation_expands_to_multiple_dirs() {
        let dir = TempDir::new().unwrap();
        let workers = dir.path().join("app").join("workers");
        let jobs = dir.path().join("app").join("jobs");
        fs::create_dir_all(&workers).unwrap();
        fs::create_dir_all(&jobs).unwrap();
        fs::write(workers.join("a.rb"), ".limit(500)\n").unwrap();
        fs::write(jobs.join("b.rb"), ".limit(500)\n").unwrap();
        let hits = search(dir.path(), r"\.limit\(500\)", "app/{workers,jobs,services}/**/*.rb").await.unwrap();
        assert_eq!(hits.len(), 2);
    }
}
