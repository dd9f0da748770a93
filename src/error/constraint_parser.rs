use std::sync::OnceLock;

use regex::Regex;

/// Pulls structured details out of PostgreSQL constraint violation messages.
///
/// Only the constraint kinds the `users` table can raise are handled:
/// unique, not-null and check.
pub struct ConstraintParser;

struct Patterns {
    key_value: Regex,
    column: Regex,
    relation: Regex,
}

static PATTERNS: OnceLock<Patterns> = OnceLock::new();

/// Index/constraint suffixes PostgreSQL generates by default.
const CONSTRAINT_SUFFIXES: &[&str] = &["_key", "_idx", "_check", "_uniq"];

impl ConstraintParser {
    fn patterns() -> &'static Patterns {
        PATTERNS.get_or_init(|| Patterns {
            // DETAIL: Key (email)=(a@x.com) already exists.
            key_value: Regex::new(r"Key \(([^)]+)\)=\(([^)]*)\)").expect("static regex"),
            column: Regex::new(r#"column "([^"]+)""#).expect("static regex"),
            // Matches both `relation "users"` and `table "users"`
            relation: Regex::new(r#"(?:relation|table) "([^"]+)""#).expect("static regex"),
        })
    }

    /// Parses a unique violation into `(entity, field, value)`.
    ///
    /// The constraint name (`users_email_key`) is preferred for entity/field;
    /// the offending value comes from the `Key (...)=(...)` detail line.
    pub fn parse_unique_violation(
        message: &str,
        constraint_name: Option<&str>,
    ) -> Option<(String, String, String)> {
        let key_value = Self::extract_key_value_from_message(message);

        if let Some((entity, field)) = constraint_name.and_then(Self::parse_constraint_name) {
            let value = key_value
                .map(|(_, v)| v)
                .unwrap_or_else(|| "duplicate_value".to_string());
            return Some((entity, field, value));
        }

        let (field, value) = key_value?;
        let entity =
            Self::extract_relation_from_message(message).unwrap_or_else(|| "resource".to_string());
        Some((entity, field, value))
    }

    /// Parses a not-null violation into `(entity, field)`.
    pub fn parse_not_null_violation(
        message: &str,
        constraint_name: Option<&str>,
    ) -> Option<(String, String)> {
        let field = Self::extract_column_from_message(message)?;
        let entity = Self::extract_relation_from_message(message)
            .or_else(|| constraint_name.and_then(Self::parse_constraint_name).map(|(e, _)| e))
            .unwrap_or_else(|| "resource".to_string());
        Some((entity, field))
    }

    /// Parses a check violation into `(entity, field)`.
    pub fn parse_check_violation(
        message: &str,
        constraint_name: Option<&str>,
    ) -> Option<(String, String)> {
        if let Some(parsed) = constraint_name.and_then(Self::parse_constraint_name) {
            return Some(parsed);
        }

        let field = Self::extract_column_from_message(message)?;
        let entity =
            Self::extract_relation_from_message(message).unwrap_or_else(|| "resource".to_string());
        Some((entity, field))
    }

    /// Splits a default-named constraint into `(table, column)`.
    ///
    /// `users_email_key` -> `("users", "email")`,
    /// `users_created_at_check` -> `("users", "created_at")`.
    pub fn parse_constraint_name(constraint_name: &str) -> Option<(String, String)> {
        let stem = CONSTRAINT_SUFFIXES
            .iter()
            .find_map(|suffix| constraint_name.strip_suffix(suffix))?;
        let (table, column) = stem.split_once('_')?;
        if table.is_empty() || column.is_empty() {
            return None;
        }
        Some((table.to_string(), column.to_string()))
    }

    pub fn extract_column_from_message(message: &str) -> Option<String> {
        Self::patterns()
            .column
            .captures(message)
            .and_then(|caps| caps.get(1))
            .map(|m| m.as_str().to_string())
    }

    pub fn extract_relation_from_message(message: &str) -> Option<String> {
        Self::patterns()
            .relation
            .captures(message)
            .and_then(|caps| caps.get(1))
            .map(|m| m.as_str().to_string())
    }

    pub fn extract_key_value_from_message(message: &str) -> Option<(String, String)> {
        Self::patterns().key_value.captures(message).and_then(|caps| {
            let field = caps.get(1)?.as_str().to_string();
            let value = caps.get(2)?.as_str().to_string();
            Some((field, value))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const EMAIL_DUPLICATE: &str = "duplicate key value violates unique constraint \"users_email_key\"\nDETAIL: Key (email)=(a@x.com) already exists.";

    #[test]
    fn test_parse_unique_violation_with_constraint_name() {
        let result = ConstraintParser::parse_unique_violation(EMAIL_DUPLICATE, Some("users_email_key"));
        assert_eq!(
            result,
            Some(("users".to_string(), "email".to_string(), "a@x.com".to_string()))
        );
    }

    #[test]
    fn test_parse_unique_violation_from_detail_only() {
        let message = "duplicate key value\nDETAIL: Key (username)=(alice) already exists.";
        let result = ConstraintParser::parse_unique_violation(message, None);
        assert_eq!(
            result,
            Some(("resource".to_string(), "username".to_string(), "alice".to_string()))
        );
    }

    #[test]
    fn test_parse_unique_violation_without_detail() {
        let result = ConstraintParser::parse_unique_violation(
            "duplicate key value violates unique constraint",
            Some("users_username_key"),
        );
        assert_eq!(
            result,
            Some((
                "users".to_string(),
                "username".to_string(),
                "duplicate_value".to_string()
            ))
        );
    }

    #[test]
    fn test_parse_not_null_violation_with_relation() {
        let message =
            "null value in column \"email\" of relation \"users\" violates not-null constraint";
        let result = ConstraintParser::parse_not_null_violation(message, None);
        assert_eq!(result, Some(("users".to_string(), "email".to_string())));
    }

    #[test]
    fn test_parse_check_violation_multi_word_column() {
        let message = "new row for relation \"users\" violates check constraint \"users_created_at_check\"";
        let result = ConstraintParser::parse_check_violation(message, Some("users_created_at_check"));
        assert_eq!(result, Some(("users".to_string(), "created_at".to_string())));
    }

    #[test]
    fn test_parse_constraint_name_rejects_unknown_shapes() {
        assert_eq!(ConstraintParser::parse_constraint_name("users_pkey"), None);
        assert_eq!(ConstraintParser::parse_constraint_name("_email_key"), None);
        assert_eq!(ConstraintParser::parse_constraint_name("invalid"), None);
    }

    #[test]
    fn test_unrelated_message_yields_nothing() {
        let message = "server closed the connection unexpectedly";
        assert_eq!(ConstraintParser::parse_unique_violation(message, None), None);
        assert_eq!(ConstraintParser::parse_not_null_violation(message, None), None);
        assert_eq!(ConstraintParser::parse_check_violation(message, None), None);
    }
}
