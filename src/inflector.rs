//! Rails-convention inflector: plural→singular and table→model conversion
//! (spec §2 C3, §8 round-trip laws).
//!
//! The singularization rule table and irregular/uncountable word lists are
//! carried over in *behavior* from `original_source/tools/components/
//! rails_inflection.py` (Rails' own `ActiveSupport::Inflector` rules),
//! re-expressed as Rust regexes rather than transliterated.

use std::sync::OnceLock;

use regex::Regex;

/// Words whose singular and plural forms are identical (spec GLOSSARY).
const UNCOUNTABLE_NOUNS: &[&str] = &[
    "equipment",
    "information",
    "rice",
    "money",
    "species",
    "series",
    "fish",
    "sheep",
    "jeans",
    "police",
    "metadata",
    "data",
    "news",
];

/// Explicit plural → singular mapping for words regex rules get wrong.
const IRREGULARS: &[(&str, &str)] = &[
    ("people", "person"),
    ("men", "man"),
    ("children", "child"),
    ("sexes", "sex"),
    ("moves", "move"),
    ("zombies", "zombie"),
];

/// Ordered `(pattern, replacement)` singularization rules. Order matters —
/// the first matching pattern wins, matching the Rails source's cascade of
/// `re.search` checks.
fn singularization_rules() -> &'static Vec<(Regex, &'static str)> {
    static RULES: OnceLock<Vec<(Regex, &'static str)>> = OnceLock::new();
    RULES.get_or_init(|| {
        let raw: &[(&str, &str)] = &[
            (r"(?i)(database)s$", "${1}"),
            (r"(?i)(quiz)zes$", "${1}"),
            (r"(?i)(matr)ices$", "${1}ix"),
            (r"(?i)(vert|ind)ices$", "${1}ex"),
            (r"(?i)^(ox)en", "${1}"),
            (r"(?i)(alias|status)(es)?$", "${1}"),
            (r"(?i)(octop|vir)i$", "${1}us"),
            (r"(?i)(octop|vir|cact|radi|fung|alumn|stimul|syllab)us$", "${1}us"),
            (r"(?i)^(a)xes$", "${1}xis"),
            (r"(?i)(cris|test)es$", "${1}is"),
            (
                r"(?i)(analys|bas|diagnos|ellips|hypothes|oas|paralys|parenthes|synops|thes|cris|test)is$",
                "${1}is",
            ),
            (r"(?i)(shoe)s$", "${1}"),
            (r"(?i)(o)es$", "${1}"),
            (r"(?i)(bus)(es)?$", "${1}"),
            (r"(?i)^(m|l)ice$", "${1}ouse"),
            (r"(?i)(x|ch|ss|sh)es$", "${1}"),
            (r"(?i)(m)ovies$", "${1}ovie"),
            (r"(?i)(s)eries$", "${1}eries"),
            (r"(?i)([^aeiouy]|qu)ies$", "${1}y"),
            (r"(?i)([lr])ves$", "${1}f"),
            (r"(?i)(tive)s$", "${1}"),
            (r"(?i)(hive)s$", "${1}"),
            (r"(?i)([^f])ves$", "${1}fe"),
            (r"(?i)(^analy)ses$", "${1}sis"),
            (
                r"(?i)((a)naly|(b)a|(d)iagno|(p)arenthe|(p)rogno|(s)ynop|(t)he)ses$",
                "${1}sis",
            ),
            (r"(?i)(phenomen)a$", "${1}on"),
            (r"(?i)^news$", "news"),
            (r"(?i)^([^m].*[ti])a$", "${1}um"),
            (r"(?i)^(d)ata$", "${1}atum"),
            (r"(?i)(ss)$", "${1}"),
            (r"(?i)s$", ""),
        ];
        raw.iter()
            .map(|(pattern, replacement)| (Regex::new(pattern).expect("static inflection regex"), *replacement))
            .collect()
    })
}

/// Singularize a word following Rails `ActiveSupport::Inflector` rules.
pub fn singularize(word: &str) -> String {
    if word.is_empty() {
        return word.to_string();
    }

    let lower = word.to_lowercase();

    if let Some(last_part) = lower.rsplit('_').next() {
        if UNCOUNTABLE_NOUNS.contains(&last_part) {
            return word.to_string();
        }
    }

    if let Some((_, singular)) = IRREGULARS.iter().find(|(plural, _)| *plural == lower) {
        return singular.to_string();
    }

    for (regex, replacement) in singularization_rules() {
        if regex.is_match(&lower) {
            return regex.replace(&lower, *replacement).into_owned();
        }
    }

    word.to_string()
}

/// Convert a SQL table name to a Rails model class name: strip any schema
/// prefix, singularize, then CamelCase each underscore-separated part.
pub fn table_to_model(table: &str) -> String {
    if table.is_empty() {
        return String::new();
    }

    let base = table.rsplit('.').next().unwrap_or(table).to_lowercase();
    let singular = singularize(&base);

    singular
        .split('_')
        .filter(|part| !part.is_empty())
        .map(capitalize)
        .collect::<Vec<_>>()
        .join("")
}

/// Convert a Rails model class name (`LineItem`) to its conventional
/// snake_case file stem (`line_item`), the inverse direction of
/// [`table_to_model`] minus pluralization.
pub fn model_to_snake_case(model: &str) -> String {
    let mut result = String::with_capacity(model.len() + 4);
    for (i, c) in model.chars().enumerate() {
        if c.is_uppercase() {
            if i != 0 {
                result.push('_');
            }
            result.extend(c.to_lowercase());
        } else {
            result.push(c);
        }
    }
    result
}

fn capitalize(part: &str) -> String {
    let mut chars = part.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn singularize_regular_words() {
        assert_eq!(singularize("users"), "user");
        assert_eq!(singularize("categories"), "category");
        assert_eq!(singularize("boxes"), "box");
        assert_eq!(singularize("dishes"), "dish");
    }

    #[test]
    fn singularize_irregulars() {
        assert_eq!(singularize("people"), "person");
        assert_eq!(singularize("children"), "child");
        assert_eq!(singularize("men"), "man");
    }

    #[test]
    fn singularize_uncountables_are_unchanged() {
        assert_eq!(singularize("equipment"), "equipment");
        assert_eq!(singularize("information"), "information");
        assert_eq!(singularize("series"), "series");
    }

    #[test]
    fn singularize_latin_plurals() {
        assert_eq!(singularize("analyses"), "analysis");
        assert_eq!(singularize("octopi"), "octopus");
        assert_eq!(singularize("matrices"), "matrix");
        assert_eq!(singularize("indices"), "index");
    }

    #[test]
    fn table_to_model_conventional_corpus() {
        assert_eq!(table_to_model("users"), "User");
        assert_eq!(table_to_model("people"), "Person");
        assert_eq!(table_to_model("octopi"), "Octopus");
        assert_eq!(table_to_model("octopus"), "Octopus");
        assert_eq!(table_to_model("analyses"), "Analysis");
        assert_eq!(table_to_model("categories"), "Category");
        assert_eq!(table_to_model("equipment"), "Equipment");
    }

    #[test]
    fn table_to_model_strips_schema_prefix_and_underscores() {
        assert_eq!(table_to_model("public.line_items"), "LineItem");
    }

    #[test]
    fn model_to_snake_case_handles_compound_names() {
        assert_eq!(model_to_snake_case("LineItem"), "line_item");
        assert_eq!(model_to_snake_case("User"), "user");
    }

    #[test]
    fn table_to_model_is_injective_over_conventional_corpus() {
        let corpus = [
            "users", "people", "octopi", "analyses", "categories", "equipment",
        ];
        let mut seen = std::collections::HashSet::new();
        for table in corpus {
            assert!(seen.insert(table_to_model(table)));
        }
    }
}
