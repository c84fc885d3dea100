//! Domain ID generation
//!
//! Produces deterministic, collision-free identifiers for domain-layer
//! records from `(entity kind, connection id, native id)`.
//!
//! # Format
//!
//! ```text
//! {plugin}:{Entity}:{connection_id}:{native_id}[:{native_id}...]
//! ```
//!
//! Every textual segment is escaped (`%` → `%25`, `:` → `%3A`), so the
//! encoding is structural and reversible: two different inputs can never
//! produce the same id, and [`DomainIdGenerator::decode`] recovers them.

use crate::error::{Error, Result};
use crate::types::ConnectionId;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Tool-layer entity that owns a family of domain ids
///
/// Implemented by tool models so a generator can be created from the type
/// alone, e.g. `DomainIdGenerator::of::<GitlabDeployment>()`.
pub trait EntityKind {
    /// Plugin the entity belongs to (e.g. `gitlab`)
    const PLUGIN: &'static str;
    /// Entity type name (e.g. `GitlabDeployment`)
    const ENTITY: &'static str;
}

/// Opaque, deterministic domain identifier
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DomainId(String);

impl DomainId {
    /// Borrow the id as a string slice
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Consume into the underlying string
    pub fn into_string(self) -> String {
        self.0
    }
}

impl fmt::Display for DomainId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for DomainId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Components recovered from a domain id
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedId {
    /// Connection the entity came from
    pub connection_id: ConnectionId,
    /// Native primary key parts, unescaped
    pub native_ids: Vec<String>,
}

/// Generator bound to one entity kind
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DomainIdGenerator {
    prefix: String,
}

impl DomainIdGenerator {
    /// Create a generator for an explicit `(plugin, entity)` kind tag
    pub fn new(plugin: &str, entity: &str) -> Self {
        Self {
            prefix: format!("{}:{}", escape(plugin), escape(entity)),
        }
    }

    /// Create a generator for a tool entity type
    pub fn of<T: EntityKind>() -> Self {
        Self::new(T::PLUGIN, T::ENTITY)
    }

    /// The `{plugin}:{Entity}` prefix shared by every id of this kind
    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// Generate the id for a single native key
    pub fn generate(&self, connection_id: ConnectionId, native_id: impl fmt::Display) -> DomainId {
        DomainId(format!(
            "{}:{}:{}",
            self.prefix,
            connection_id,
            escape(&native_id.to_string())
        ))
    }

    /// Generate the id for a composite native key
    pub fn generate_composite(
        &self,
        connection_id: ConnectionId,
        native_ids: &[&dyn fmt::Display],
    ) -> DomainId {
        let mut id = format!("{}:{}", self.prefix, connection_id);
        for part in native_ids {
            id.push(':');
            id.push_str(&escape(&part.to_string()));
        }
        DomainId(id)
    }

    /// Split an id of this kind back into its components
    pub fn decode(&self, id: &str) -> Result<DecodedId> {
        let rest = id
            .strip_prefix(&self.prefix)
            .and_then(|r| r.strip_prefix(':'))
            .ok_or_else(|| Error::InvalidDomainId {
                id: id.to_string(),
                message: format!("expected prefix '{}'", self.prefix),
            })?;

        let mut parts = rest.split(':');
        let connection_id = parts
            .next()
            .and_then(|c| c.parse::<ConnectionId>().ok())
            .ok_or_else(|| Error::InvalidDomainId {
                id: id.to_string(),
                message: "missing or non-numeric connection id".to_string(),
            })?;

        let native_ids = parts
            .map(|p| unescape(p, id))
            .collect::<Result<Vec<_>>>()?;

        if native_ids.is_empty() {
            return Err(Error::InvalidDomainId {
                id: id.to_string(),
                message: "missing native id".to_string(),
            });
        }

        Ok(DecodedId {
            connection_id,
            native_ids,
        })
    }
}

fn escape(segment: &str) -> String {
    if !segment.contains(['%', ':']) {
        return segment.to_string();
    }
    let mut out = String::with_capacity(segment.len() + 4);
    for ch in segment.chars() {
        match ch {
            '%' => out.push_str("%25"),
            ':' => out.push_str("%3A"),
            c => out.push(c),
        }
    }
    out
}

fn unescape(segment: &str, id: &str) -> Result<String> {
    if !segment.contains('%') {
        return Ok(segment.to_string());
    }
    let mut out = String::with_capacity(segment.len());
    let mut rest = segment;
    while let Some(pos) = rest.find('%') {
        out.push_str(&rest[..pos]);
        let code = rest.get(pos + 1..pos + 3);
        match code {
            Some("25") => out.push('%'),
            Some("3A") => out.push(':'),
            _ => {
                return Err(Error::InvalidDomainId {
                    id: id.to_string(),
                    message: format!("bad escape in segment '{segment}'"),
                })
            }
        }
        rest = &rest[pos + 3..];
    }
    out.push_str(rest);
    Ok(out)
}
