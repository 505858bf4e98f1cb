//! Migration analyzer (spec §4.6).

use std::path::Path;
use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MigrationOperation {
    pub kind: String,
    pub detail: String,
    pub migration: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MigrationAnalysis {
    pub create_operations: Vec<MigrationOperation>,
    pub modify_operations: Vec<MigrationOperation>,
    pub recent_migrations: Vec<String>,
}

fn create_table_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r#"create_table\s+["']?:?(\w+)["']?"#).unwrap())
}

fn drop_table_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r#"drop_table\s+["']?:?(\w+)["']?"#).unwrap())
}

fn column_op_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r#"(add_column|remove_column|add_index|change_column)\s+:(\w+)"#).unwrap())
}

/// Iterate migration files under `migrate_dir` newest-first (by filename
/// timestamp prefix) and aggregate `create_table`/`drop_table`/`add_column`/
/// `remove_column`/`add_index`/`change_column` operations referencing
/// `table` (spec §4.6).
pub fn analyze_migrations(migrate_dir: &Path, table: &str) -> Result<MigrationAnalysis, String> {
    let mut entries: Vec<_> = std::fs::read_dir(migrate_dir)
        .map_err(|e| format!("could not read {}: {e}", migrate_dir.display()))?
        .filter_map(|e| e.ok())
        .filter(|e| e.path().extension().is_some_and(|ext| ext == "rb"))
        .collect();
    entries.sort_by_key(|e| std::cmp::Reverse(e.file_name()));

    let mut create_operations = Vec::new();
    let mut modify_operations = Vec::new();
    let mut recent_migrations = Vec::new();

    for entry in entries {
        let path = entry.path();
        let Ok(source) = std::fs::read_to_string(&path) else { continue };
        let migration_name = entry.file_name().to_string_lossy().into_owned();
        let mut touches_table = false;

        for c in create_table_re().captures_iter(&source) {
            if &c[1] == table {
                touches_table = true;
                create_operations.push(MigrationOperation {
                    kind: "create_table".to_string(),
                    detail: table.to_string(),
                    migration: migration_name.clone(),
                });
            }
        }
        for c in drop_table_re().captures_iter(&source) {
            if &c[1] == table {
                touches_table = true;
                create_operations.push(MigrationOperation {
                    kind: "drop_table".to_string(),
                    detail: table.to_string(),
                    migration: migration_name.clone(),
                });
            }
        }
        for c in column_op_re().captures_iter(&source) {
            if &c[2] == table {
                touches_table = true;
                modify_operations.push(MigrationOperation {
                    kind: c[1].to_string(),
                    detail: c[2].to_string(),
                    migration: migration_name.clone(),
                });
            }
        }

        if touches_table {
            recent_migrations.push(migration_name);
        }
    }

    Ok(MigrationAnalysis {
        create_operations,
        modify_operations,
        recent_migrations,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn aggregates_operations_newest_first() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("20200101000000_create_members.rb"), "create_table :members do |t|\nend\n").unwrap();
        std::fs::write(dir.path().join("20210101000000_add_company_to_members.rb"), "add_column :members, :company_id, :integer\n").unwrap();
        std::fs::write(dir.path().join("20220101000000_create_companies.rb"), "create_table :companies do |t|\nend\n").unwrap();

        let analysis = analyze_migrations(dir.path(), "members").unwrap();
        assert_eq!(analysis.create_operations.len(), 1);
        assert_eq!(analysis.modify_operations.len(), 1);
        assert_eq!(analysis.recent_migrations, vec![
            "20210101000000_add_company_to_members.rb".to_string(),
            "20200101000000_create_members.rb".to_string(),
        ]);
    }

    #[test]
    fn missing_directory_returns_error_not_panic() {
        assert!(analyze_migrations(Path::new("/nonexistent/db/migrate"), "members").is_err());
    }
}
