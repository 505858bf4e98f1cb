//! Shared Rails/ActiveRecord vocabulary (spec GLOSSARY "Known framework-method set").

/// Query-DSL method names that are never scope or custom-finder names.
/// Used by both the scope resolver (C6) and the matcher's source pass (C7
/// Pass B) to tell a scope/finder chain apart from ordinary query building.
pub const FRAMEWORK_METHODS: &[&str] = &[
    "where", "not", "order", "limit", "offset", "select", "joins", "includes", "group", "having",
    "distinct", "readonly", "lock", "references", "eager_load", "preload", "from", "unscope",
    "only", "except", "extending", "find", "find_by", "find_by!", "find_or_create_by",
    "find_or_initialize_by", "all", "first", "first!", "last", "last!", "take", "take!",
    "exists?", "any?", "many?", "none?", "one?", "count", "sum", "average", "minimum", "maximum",
    "calculate", "pluck", "ids", "pick", "create", "create!", "new", "build", "update", "update!",
    "update_all", "update_column", "update_columns", "destroy", "destroy!", "destroy_all",
    "delete", "delete_all", "find_each", "find_in_batches", "in_batches", "scope", "default_scope",
];

pub fn is_framework_method(name: &str) -> bool {
    FRAMEWORK_METHODS.contains(&name)
}
