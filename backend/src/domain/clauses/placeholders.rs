//! `{{placeholder}}` substitution for rendered clauses.
//!
//! Placeholders are `{{name}}` tokens where `name` is an identifier
//! (letters, digits, underscores, optional surrounding spaces). Mapped names
//! are replaced by their HTML-escaped value; unmapped tokens stay in the
//! output verbatim so missing data is visible to the reader.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::OnceLock;

use regex::{Captures, Regex};

use super::markup::escape_html;

/// Placeholder name to replacement value.
pub type Substitutions = BTreeMap<String, String>;

static PLACEHOLDER_RE: OnceLock<Regex> = OnceLock::new();

fn placeholder_regex() -> &'static Regex {
    PLACEHOLDER_RE.get_or_init(|| {
        Regex::new(r"\{\{\s*([A-Za-z_][A-Za-z0-9_]*)\s*\}\}")
            .unwrap_or_else(|error| panic!("placeholder regex failed to compile: {error}"))
    })
}

/// Replace mapped placeholders in `text`.
///
/// # Examples
/// ```
/// use futureproof_backend::domain::clauses::{Substitutions, substitute_placeholders};
///
/// let mut values = Substitutions::new();
/// values.insert("lender_name".to_owned(), "Acme".to_owned());
/// let out = substitute_placeholders("{{lender_name}} and {{unknown_field}}", &values);
/// assert_eq!(out, "Acme and {{unknown_field}}");
/// ```
#[must_use]
pub fn substitute_placeholders(text: &str, values: &Substitutions) -> String {
    placeholder_regex()
        .replace_all(text, |caps: &Captures<'_>| {
            let token = caps.get(0).map_or("", |m| m.as_str());
            caps.get(1)
                .and_then(|name| values.get(name.as_str()))
                .map_or_else(|| token.to_owned(), |value| escape_html(value))
        })
        .into_owned()
}

/// Distinct placeholder names used in `text`, sorted.
#[must_use]
pub fn placeholder_names(text: &str) -> BTreeSet<String> {
    placeholder_regex()
        .captures_iter(text)
        .filter_map(|caps| caps.get(1).map(|name| name.as_str().to_owned()))
        .collect()
}

/// Sample values used for admin-side previews before real contract data
/// exists.
#[must_use]
pub fn preview_substitutions() -> Substitutions {
    [
        ("lender_name", "Sample Lender Ltd"),
        ("borrower_name", "Alex Example"),
        ("property_address", "1 Sample Street, London, SW1A 1AA"),
        ("loan_amount", "£250,000.00"),
        ("interest_rate", "4.25%"),
        ("term_years", "25"),
        ("contract_date", "1 January 2025"),
    ]
    .into_iter()
    .map(|(name, value)| (name.to_owned(), value.to_owned()))
    .collect()
}
