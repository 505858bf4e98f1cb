//! Progressive search engine (spec §2 C11, §4.5 "Search loop").
//!
//! Turns a parsed `Statement` into a ranked, deduplicated, context-expanded
//! list of candidate hits without building a persistent index: patterns from
//! [`crate::rules`] are tried rarest-first, distinctive hits are refined by
//! requiring complementary evidence in the same file, and surviving hits are
//! expanded with a few lines of surrounding context for Pass B.

use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};

use crate::rules::{self, SearchLocation, SearchPattern};
use crate::search::text_search;
use crate::sql::Statement;

const LINES_BEFORE: usize = 3;
const LINES_AFTER: usize = 2;

#[derive(Debug, Clone, PartialEq)]
pub struct ProgressiveHit {
    pub path: PathBuf,
    pub line: usize,
    pub content: String,
    pub descriptions: Vec<String>,
    pub distinctiveness: f64,
}

struct RawHit {
    path: PathBuf,
    line: usize,
    content: String,
    descriptions: Vec<String>,
    distinctiveness: f64,
}

/// Run the rule set over `stmt`, search the ranked patterns rarest-first,
/// refine distinctive hits at the file level, then deduplicate and
/// context-expand the survivors (spec §4.5).
pub async fn search_progressive(project_root: &Path, stmt: &Statement) -> Result<Vec<ProgressiveHit>, String> {
    let (patterns, locations) = rules::generate_patterns(stmt);
    let mut results: Vec<RawHit> = Vec::new();
    let mut consumed_clause_types: HashSet<String> = HashSet::new();

    for (idx, pattern) in patterns.iter().enumerate() {
        let mut hits = Vec::new();
        for location in &locations {
            hits.extend(text_search::search(project_root, &pattern.regex_or_substring, location.glob).await?);
        }

        if hits.is_empty() {
            consumed_clause_types.insert(pattern.clause_type.clone());
            continue;
        }

        if pattern.distinctiveness >= 0.4 {
            let remaining = &patterns[idx + 1..];
            let refined = refine_file_level(project_root, pattern, remaining, &locations, &hits, &consumed_clause_types).await?;
            if hits.len() < 20 {
                results.extend(refined);
            } else if !refined.is_empty() {
                results.extend(refined);
            }
        } else if hits.len() < 100 {
            for hit in hits {
                results.push(RawHit {
                    path: hit.path,
                    line: hit.line,
                    content: hit.content,
                    descriptions: vec![pattern.description.clone()],
                    distinctiveness: pattern.distinctiveness,
                });
            }
        }

        consumed_clause_types.insert(pattern.clause_type.clone());
    }

    let deduped = dedup_by_file_and_line(results);
    Ok(expand_context(&deduped))
}

/// Select up to three complementary patterns (different `clause_type`, not
/// already consumed as a primary pattern), restrict `hits`'s files to those
/// containing every non-optional complementary pattern, and tag the
/// surviving hits with the union of matched-pattern descriptions (spec §4.5
/// "File-level refinement").
async fn refine_file_level(
    project_root: &Path,
    primary: &SearchPattern,
    remaining: &[SearchPattern],
    locations: &[SearchLocation<'_>],
    hits: &[text_search::SearchHit],
    consumed_clause_types: &HashSet<String>,
) -> Result<Vec<RawHit>, String> {
    let mut complementary: Vec<&SearchPattern> = Vec::new();
    let mut seen_types: HashSet<&str> = HashSet::new();
    seen_types.insert(primary.clause_type.as_str());
    for candidate in remaining {
        if consumed_clause_types.contains(&candidate.clause_type) {
            continue;
        }
        if seen_types.contains(candidate.clause_type.as_str()) {
            continue;
        }
        seen_types.insert(candidate.clause_type.as_str());
        complementary.push(candidate);
        if complementary.len() == 3 {
            break;
        }
    }

    if complementary.is_empty() {
        return Ok(hits
            .iter()
            .map(|h| RawHit {
                path: h.path.clone(),
                line: h.line,
                content: h.content.clone(),
                descriptions: vec![primary.description.clone()],
                distinctiveness: primary.distinctiveness,
            })
            .collect());
    }

    let mut file_hits_per_pattern: Vec<HashSet<PathBuf>> = Vec::new();
    for pattern in &complementary {
        let mut files = HashSet::new();
        for location in locations {
            let pattern_hits = text_search::search(project_root, &pattern.regex_or_substring, location.glob).await?;
            files.extend(pattern_hits.into_iter().map(|h| h.path));
        }
        file_hits_per_pattern.push(files);
    }

    let mut refined = Vec::new();
    for hit in hits {
        let mut matched_descriptions = vec![primary.description.clone()];
        let mut distinctivenesses = vec![primary.distinctiveness];
        let mut survives = true;

        for (pattern, files) in complementary.iter().zip(&file_hits_per_pattern) {
            let present = files.contains(&hit.path);
            if present {
                matched_descriptions.push(pattern.description.clone());
                distinctivenesses.push(pattern.distinctiveness);
            } else if !pattern.optional {
                survives = false;
                break;
            }
        }

        if survives {
            let mean = distinctivenesses.iter().sum::<f64>() / distinctivenesses.len() as f64;
            refined.push(RawHit {
                path: hit.path.clone(),
                line: hit.line,
                content: hit.content.clone(),
                descriptions: matched_descriptions,
                distinctiveness: mean,
            });
        }
    }

    Ok(refined)
}

fn dedup_by_file_and_line(hits: Vec<RawHit>) -> Vec<RawHit> {
    let mut seen: HashMap<(PathBuf, usize), usize> = HashMap::new();
    let mut out: Vec<RawHit> = Vec::new();
    for hit in hits {
        let key = (hit.path.clone(), hit.line);
        if let Some(&idx) = seen.get(&key) {
            for desc in hit.descriptions {
                if !out[idx].descriptions.contains(&desc) {
                    out[idx].descriptions.push(desc);
                }
            }
        } else {
            seen.insert(key, out.len());
            out.push(hit);
        }
    }
    out
}

/// Read `lines_before`/`lines_after` around each hit and join with single
/// spaces — a tight expansion so wider spans don't fold in unrelated
/// branches (spec §4.5 "Context expansion").
fn expand_context(hits: &[RawHit]) -> Vec<ProgressiveHit> {
    let mut file_lines: HashMap<PathBuf, Vec<String>> = HashMap::new();
    let mut out = Vec::with_capacity(hits.len());

    for hit in hits {
        let lines = file_lines
            .entry(hit.path.clone())
            .or_insert_with(|| std::fs::read_to_string(&hit.path).map(|s| s.lines().map(str::to_string).collect()).unwrap_or_default());

        let total = lines.len();
        let start = hit.line.saturating_sub(1).saturating_sub(LINES_BEFORE);
        let end = (hit.line - 1 + LINES_AFTER + 1).min(total);
        let expanded = if hit.line == 0 || hit.line > total {
            hit.content.clone()
        } else {
            lines[start..end].iter().map(|l| l.trim()).filter(|l| !l.is_empty()).collect::<Vec<_>>().join(" ")
        };

        out.push(ProgressiveHit {
            path: hit.path.clone(),
            line: hit.line,
            content: expanded,
            descriptions: hit.descriptions.clone(),
            distinctiveness: hit.distinctiveness,
        });
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sql::parse_sql;
    use std::fs;
    use tempfile::TempDir;

    fn fixture() -> TempDir {
        let dir = TempDir::new().unwrap();
        let models = dir.path().join("app").join("models");
        fs::create_dir_all(&models).unwrap();
        fs::write(
            models.join("member.rb"),
            "class Member < ApplicationRecord\n\
             belongs_to :company\n\
             scope :active, -> {\n\
               where(disabled: false)\n\
             }\n\
             end\n",
        )
        .unwrap();
        dir
    }

    #[tokio::test]
    async fn finds_association_and_where_hits() {
        let dir = fixture();
        let stmt = parse_sql("SELECT * FROM members WHERE company_id = 1 AND disabled = false");
        let hits = search_progressive(dir.path(), &stmt).await.unwrap();
        assert!(!hits.is_empty());
        assert!(hits.iter().any(|h| h.content.contains("belongs_to :company")));
    }

    #[tokio::test]
    async fn context_expansion_joins_surrounding_lines() {
        let dir = fixture();
        let stmt = parse_sql("SELECT * FROM members WHERE disabled = false");
        let hits = search_progressive(dir.path(), &stmt).await.unwrap();
        let where_hit = hits.iter().find(|h| h.content.contains("where(disabled")).unwrap();
        assert!(where_hit.content.contains("scope :active"));
    }

    #[test]
    fn dedup_merges_descriptions_for_same_file_and_line() {
        let hits = vec![
            RawHit {
                path: PathBuf::from("a.rb"),
                line: 1,
                content: "x".to_string(),
                descriptions: vec!["first".to_string()],
                distinctiveness: 0.5,
            },
            RawHit {
                path: PathBuf::from("a.rb"),
                line: 1,
                content: "x".to_string(),
                descriptions: vec!["second".to_string()],
                distinctiveness: 0.6,
            },
        ];
        let deduped = dedup_by_file_and_line(hits);
        assert_eq!(deduped.len(), 1);
        assert_eq!(deduped[0].descriptions, vec!["first".to_string(), "second".to_string()]);
    }
}
