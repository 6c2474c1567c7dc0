//! Identifier and literal escaping for textual view emission.
//!
//! Every function here is pure; keyword knowledge is injected.

use std::borrow::Cow;

///
/// ReservedKeywords
///
/// Reserved-word table of the target query dialect.
///

pub trait ReservedKeywords: Send + Sync {
    fn is_reserved(&self, name: &str) -> bool;
}

impl<F> ReservedKeywords for F
where
    F: Fn(&str) -> bool + Send + Sync,
{
    fn is_reserved(&self, name: &str) -> bool {
        self(name)
    }
}

///
/// EntitySqlKeywords
///
/// Entity SQL reserved words; matched case-insensitively.
///

#[derive(Clone, Copy, Debug, Default)]
pub struct EntitySqlKeywords;

// Sorted; looked up with binary search on the upper-cased name.
const ENTITY_SQL_KEYWORDS: &[&str] = &[
    "ALL",
    "AND",
    "ANY",
    "APPLY",
    "AS",
    "ASC",
    "BETWEEN",
    "BY",
    "CASE",
    "CAST",
    "COLLATE",
    "CREATEREF",
    "CROSS",
    "DEREF",
    "DESC",
    "DISTINCT",
    "ELEMENT",
    "ELSE",
    "END",
    "ESCAPE",
    "EXCEPT",
    "EXISTS",
    "FALSE",
    "FLATTEN",
    "FROM",
    "FULL",
    "FUNCTION",
    "GROUP",
    "GROUPPARTITION",
    "HAVING",
    "IN",
    "INNER",
    "INTERSECT",
    "IS",
    "JOIN",
    "KEY",
    "LEFT",
    "LIKE",
    "LIMIT",
    "MULTISET",
    "NAVIGATE",
    "NOT",
    "NULL",
    "OF",
    "ON",
    "ONLY",
    "OR",
    "ORDER",
    "OUTER",
    "OVERLAPS",
    "REF",
    "RIGHT",
    "ROW",
    "SELECT",
    "SET",
    "SKIP",
    "THEN",
    "TOP",
    "TREAT",
    "TRUE",
    "UNION",
    "USING",
    "VALUE",
    "WHEN",
    "WHERE",
    "WITH",
];

impl ReservedKeywords for EntitySqlKeywords {
    fn is_reserved(&self, name: &str) -> bool {
        let upper = name.to_ascii_uppercase();
        ENTITY_SQL_KEYWORDS.binary_search(&upper.as_str()).is_ok()
    }
}

///
/// NoKeywords
///

#[derive(Clone, Copy, Debug, Default)]
pub struct NoKeywords;

impl ReservedKeywords for NoKeywords {
    fn is_reserved(&self, _name: &str) -> bool {
        false
    }
}

/// Whether `name` matches `^[A-Za-z_]\w*$`.
#[must_use]
pub fn is_simple_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    let Some(first) = chars.next() else {
        return false;
    };

    (first.is_ascii_alphabetic() || first == '_')
        && chars.all(|c| c.is_alphanumeric() || c == '_')
}

/// Emit `name` bare when it is a simple, non-reserved identifier, otherwise
/// bracketed with embedded `]` doubled.
#[must_use]
pub fn format_identifier<'a>(name: &'a str, keywords: &dyn ReservedKeywords) -> Cow<'a, str> {
    if is_simple_identifier(name) && !keywords.is_reserved(name) {
        return Cow::Borrowed(name);
    }

    let mut out = String::with_capacity(name.len() + 2);
    out.push('[');
    for c in name.chars() {
        if c == ']' {
            out.push(']');
        }
        out.push(c);
    }
    out.push(']');

    Cow::Owned(out)
}

/// Join individually escaped parts with `.`.
#[must_use]
pub fn format_qualified_name<'a>(
    parts: impl IntoIterator<Item = &'a str>,
    keywords: &dyn ReservedKeywords,
) -> String {
    let mut out = String::new();
    for (i, part) in parts.into_iter().enumerate() {
        if i > 0 {
            out.push('.');
        }
        out.push_str(&format_identifier(part, keywords));
    }

    out
}

/// Single-quoted string literal with embedded quotes doubled.
#[must_use]
pub fn format_string_literal(value: &str) -> String {
    let mut out = String::with_capacity(value.len() + 2);
    out.push('\'');
    for c in value.chars() {
        if c == '\'' {
            out.push('\'');
        }
        out.push(c);
    }
    out.push('\'');

    out
}

///
/// TESTS
///

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn keyword_table_is_sorted() {
        assert!(ENTITY_SQL_KEYWORDS.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn reserved_words_are_bracketed() {
        assert_eq!(format_identifier("Order", &EntitySqlKeywords), "[Order]");
        assert_eq!(format_identifier("select", &EntitySqlKeywords), "[select]");
    }

    #[test]
    fn simple_identifiers_stay_bare() {
        assert_eq!(format_identifier("CustomerId", &EntitySqlKeywords), "CustomerId");
        assert_eq!(format_identifier("_from0", &EntitySqlKeywords), "_from0");
        assert!(matches!(
            format_identifier("CustomerId", &EntitySqlKeywords),
            Cow::Borrowed(_)
        ));
    }

    #[test]
    fn embedded_closing_brackets_are_doubled() {
        assert_eq!(format_identifier("weird]name", &EntitySqlKeywords), "[weird]]name]");
    }

    #[test]
    fn non_simple_names_are_bracketed() {
        assert_eq!(format_identifier("", &NoKeywords), "[]");
        assert_eq!(format_identifier("1st", &NoKeywords), "[1st]");
        assert_eq!(format_identifier("two words", &NoKeywords), "[two words]");
    }

    #[test]
    fn keyword_table_is_injectable() {
        let custom = |name: &str| name == "Customer";

        assert_eq!(format_identifier("Customer", &custom), "[Customer]");
        assert_eq!(format_identifier("Order", &custom), "Order");
        assert_eq!(format_identifier("Order", &NoKeywords), "Order");
    }

    #[test]
    fn qualified_names_escape_each_part() {
        assert_eq!(
            format_qualified_name(["Sales", "Order"], &EntitySqlKeywords),
            "Sales.[Order]"
        );
    }

    #[test]
    fn string_literals_double_single_quotes() {
        assert_eq!(format_string_literal("it's"), "'it''s'");
    }

    proptest! {
        #[test]
        fn escaping_is_deterministic_and_total(name in ".{0,16}") {
            let once = format_identifier(&name, &EntitySqlKeywords).into_owned();
            let twice = format_identifier(&name, &EntitySqlKeywords).into_owned();
            prop_assert_eq!(&once, &twice);

            if once != name {
                prop_assert!(once.starts_with('[') && once.ends_with(']'));
                let inner = &once[1..once.len() - 1];
                prop_assert_eq!(inner.replace("]]", "]"), name);
            }
        }
    }
}
