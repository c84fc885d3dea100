//! Classification rule engine
//!
//! Collapses vendor-specific status vocabularies onto a small canonical enum.
//!
//! # Overview
//!
//! A [`ClassificationRule`] is an ordered list of categories, each owning a
//! set of recognized native values, plus a default. Classification walks the
//! categories in declaration order and the first one containing the value
//! wins. Values no category recognizes map to the default, so unknown
//! upstream states never fail a conversion.
//!
//! The module provides:
//! - `ClassificationRule` - generic ordered membership table
//! - `ResultRule` / `StatusRule` - the CI/CD result and status tables
//! - `CicdResult` / `CicdStatus` - canonical values with passthrough

mod types;

pub use types::{get_result, get_status, CicdResult, CicdStatus, ResultRule, StatusRule};

use regex::Regex;
use std::collections::BTreeSet;

/// How a category recognizes native values
#[derive(Debug, Clone)]
pub enum Matcher {
    /// Case-sensitive exact membership
    Exact(BTreeSet<String>),
    /// Regular expression match
    Pattern(Regex),
}

impl Matcher {
    /// Build an exact matcher from a list of values
    pub fn exact<I, S>(values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::Exact(values.into_iter().map(Into::into).collect())
    }

    /// Test a native value against this matcher
    pub fn matches(&self, value: &str) -> bool {
        match self {
            Matcher::Exact(values) => values.contains(value),
            Matcher::Pattern(regex) => regex.is_match(value),
        }
    }
}

/// One named category of a rule
#[derive(Debug, Clone)]
pub struct Category<T> {
    /// Canonical value produced when this category matches
    pub label: T,
    /// Native values belonging to the category
    pub matcher: Matcher,
}

/// Ordered category table with a default
#[derive(Debug, Clone)]
pub struct ClassificationRule<T> {
    categories: Vec<Category<T>>,
    default: T,
}

impl<T: Clone> ClassificationRule<T> {
    /// Create an empty rule that classifies everything as `default`
    pub fn new(default: T) -> Self {
        Self {
            categories: Vec::new(),
            default,
        }
    }

    /// Append an exact-membership category
    #[must_use]
    pub fn category<I, S>(mut self, label: T, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.categories.push(Category {
            label,
            matcher: Matcher::exact(values),
        });
        self
    }

    /// Append a pattern-based category
    #[must_use]
    pub fn pattern_category(mut self, label: T, pattern: Regex) -> Self {
        self.categories.push(Category {
            label,
            matcher: Matcher::Pattern(pattern),
        });
        self
    }

    /// Categories in evaluation order
    pub fn categories(&self) -> &[Category<T>] {
        &self.categories
    }

    /// Value returned when nothing matches
    pub fn default_value(&self) -> &T {
        &self.default
    }

    /// Map a native value to its canonical value
    ///
    /// The first category (in declaration order) that recognizes the value
    /// wins; otherwise the rule's default is returned.
    pub fn classify(&self, value: &str) -> T {
        self.categories
            .iter()
            .find(|c| c.matcher.matches(value))
            .map_or_else(|| self.default.clone(), |c| c.label.clone())
    }
}

#[cfg(test)]
mod tests;
