//! Regex enrichment of free-text categorical fields
//!
//! An [`EnrichmentTable`] collapses vendor spellings of a value (for example
//! `prod`, `Production`, `PRD`) onto one canonical label, while leaving
//! values the caller explicitly allows untouched.

use crate::error::{Error, Result};
use regex::Regex;
use serde::{Deserialize, Serialize};

/// One `pattern → name` mapping as written in configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnrichmentRuleDef {
    /// Regular expression tested against the raw value
    pub pattern: String,
    /// Canonical label produced on match
    pub name: String,
}

/// Declarative enrichment table
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct EnrichmentDef {
    /// Patterns whose matches are kept as-is
    #[serde(default)]
    pub allow: Vec<String>,
    /// Ordered mappings, first match wins
    #[serde(default)]
    pub rules: Vec<EnrichmentRuleDef>,
    /// Keep values that match nothing (otherwise they become empty)
    #[serde(default = "default_passthrough")]
    pub passthrough_unmatched: bool,
}

fn default_passthrough() -> bool {
    true
}

impl Default for EnrichmentDef {
    fn default() -> Self {
        Self {
            allow: Vec::new(),
            rules: Vec::new(),
            passthrough_unmatched: true,
        }
    }
}

/// Compiled enrichment table
#[derive(Debug, Clone)]
pub struct EnrichmentTable {
    allow: Vec<Regex>,
    rules: Vec<(Regex, String)>,
    passthrough_unmatched: bool,
}

impl EnrichmentTable {
    /// Compile a table definition
    pub fn from_def(def: &EnrichmentDef) -> Result<Self> {
        let allow = def
            .allow
            .iter()
            .map(|p| Regex::new(p))
            .collect::<std::result::Result<Vec<_>, _>>()?;

        let rules = def
            .rules
            .iter()
            .map(|r| {
                if r.name.is_empty() {
                    return Err(Error::invalid_value(
                        "rules.name",
                        format!("empty name for pattern '{}'", r.pattern),
                    ));
                }
                Ok((Regex::new(&r.pattern)?, r.name.clone()))
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            allow,
            rules,
            passthrough_unmatched: def.passthrough_unmatched,
        })
    }

    /// Normalize a raw value
    ///
    /// Allowed values are returned unchanged. Otherwise the first matching
    /// rule's label is returned. Unmatched values pass through unless the
    /// table disables it.
    pub fn normalize(&self, raw: &str) -> String {
        if self.is_allowed(raw) {
            return raw.to_string();
        }
        if let Some((_, name)) = self.rules.iter().find(|(re, _)| re.is_match(raw)) {
            return name.clone();
        }
        if self.passthrough_unmatched {
            raw.to_string()
        } else {
            String::new()
        }
    }

    /// Whether `raw` is already acceptable without rewriting
    pub fn is_allowed(&self, raw: &str) -> bool {
        self.allow.iter().any(|re| re.is_match(raw))
    }

    /// Whether the table has no patterns at all
    pub fn is_empty(&self) -> bool {
        self.allow.is_empty() && self.rules.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table(allow: &[&str], rules: &[(&str, &str)]) -> EnrichmentTable {
        EnrichmentTable::from_def(&EnrichmentDef {
            allow: allow.iter().map(ToString::to_string).collect(),
            rules: rules
                .iter()
                .map(|(p, n)| EnrichmentRuleDef {
                    pattern: (*p).to_string(),
                    name: (*n).to_string(),
                })
                .collect(),
            passthrough_unmatched: true,
        })
        .unwrap()
    }

    #[test]
    fn test_allowed_value_passes_through() {
        let t = table(&["^production$"], &[(r"(?i)prod", "PRODUCTION")]);
        assert_eq!(t.normalize("production"), "production");
    }

    #[test]
    fn test_mapping_rewrites() {
        let t = table(&[], &[("^prod$", "production")]);
        assert_eq!(t.normalize("prod"), "production");
        assert_eq!(t.normalize("production"), "production");
    }

    #[test]
    fn test_first_matching_rule_wins() {
        let t = table(
            &[],
            &[(r"(?i)^prd|prod", "production"), (r"(?i)prod|stag", "staging")],
        );
        assert_eq!(t.normalize("PRD-eu"), "production");
        assert_eq!(t.normalize("Production"), "production");
        assert_eq!(t.normalize("stage"), "staging");
    }

    #[test]
    fn test_earlier_rule_captures_later_label() {
        let t = table(&[], &[("^(qa|staging)$", "testing"), ("^stg$", "staging")]);
        assert_eq!(t.normalize("staging"), "testing");
        assert_eq!(t.normalize("stg"), "staging");

        let allowed = table(&["^staging$"], &[("^(qa|staging)$", "testing")]);
        assert_eq!(allowed.normalize("staging"), "staging");
        assert_eq!(allowed.normalize("qa"), "testing");
    }

    #[test]
    fn test_unmatched_value() {
        let t = table(&[], &[("^prod$", "production")]);
        assert_eq!(t.normalize("qa"), "qa");

        let strict = EnrichmentTable::from_def(&EnrichmentDef {
            rules: vec![EnrichmentRuleDef {
                pattern: "^prod$".into(),
                name: "production".into(),
            }],
            passthrough_unmatched: false,
            ..EnrichmentDef::default()
        })
        .unwrap();
        assert_eq!(strict.normalize("qa"), "");
        assert_eq!(strict.normalize("prod"), "production");
    }

    #[test]
    fn test_invalid_definitions() {
        let bad_regex = EnrichmentDef {
            allow: vec!["(".into()],
            ..EnrichmentDef::default()
        };
        assert!(matches!(
            EnrichmentTable::from_def(&bad_regex),
            Err(Error::Regex(_))
        ));

        let empty_name = EnrichmentDef {
            rules: vec![EnrichmentRuleDef {
                pattern: "prod".into(),
                name: String::new(),
            }],
            ..EnrichmentDef::default()
        };
        assert!(EnrichmentTable::from_def(&empty_name).is_err());
    }

    #[test]
    fn test_def_from_yaml_defaults() {
        let def: EnrichmentDef = serde_yaml::from_str("rules: [{pattern: '^prd$', name: production}]")
            .unwrap();
        assert!(def.passthrough_unmatched);
        assert!(def.allow.is_empty());
        let t = EnrichmentTable::from_def(&def).unwrap();
        assert!(!t.is_empty());
        assert_eq!(t.normalize("prd"), "production");
    }
}
