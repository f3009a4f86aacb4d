//! Structural and semantic validation of a parsed mapping document.
//!
//! Validation never stops at the first problem: every defect in the document
//! is collected so an operator can fix a multi-entry file in one pass.

use std::fmt;

use serde_yaml::{Mapping as Object, Value};

use super::transform::Transform;
use super::types::{Mapping, MappingTable};
use crate::provider::Provider;

const MAPPINGS_KEY: &str = "mappings";

/// Fields every entry must carry, in reporting order.
pub const REQUIRED_FIELDS: [&str; 6] = [
    "source_api",
    "target_api",
    "proxy_path_prefix",
    "target_base_url_env_var",
    "request_transform",
    "response_transform",
];

/// The only optional entry field; may be absent, null, or a string.
pub const OPTIONAL_KEY_FIELD: &str = "target_api_key_env_var";

/// Where in the document a defect was found.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Location {
    Root,
    Entry(usize),
}

/// Type a value was required to have.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Expected {
    Object,
    Array,
    String,
    StringOrNull,
}

impl fmt::Display for Expected {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Expected::Object => "an object",
            Expected::Array => "an array",
            Expected::String => "a string",
            Expected::StringOrNull => "a string or null",
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DefectKind {
    Missing {
        field: &'static str,
    },
    UnknownProperty {
        name: String,
    },
    WrongType {
        field: &'static str,
        expected: Expected,
    },
    Empty {
        field: &'static str,
    },
    UnknownProvider {
        field: &'static str,
        value: String,
    },
    UnknownTransform {
        field: &'static str,
        value: String,
    },
    /// Transform exists but does not convert `from` into `to`.
    TransformDirection {
        field: &'static str,
        transform: Transform,
        from: Provider,
        to: Provider,
    },
}

impl fmt::Display for DefectKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DefectKind::Missing { field } => write!(f, "missing {field}"),
            DefectKind::UnknownProperty { name } => write!(f, "unknown property '{name}'"),
            DefectKind::WrongType { field, expected } => write!(f, "{field} must be {expected}"),
            DefectKind::Empty { field } => write!(f, "{field} must not be empty"),
            DefectKind::UnknownProvider { field, value } => write!(
                f,
                "{field} must be one of: {} (found '{value}')",
                Provider::valid_values()
            ),
            DefectKind::UnknownTransform { field, value } => {
                write!(f, "{field} names unknown transform '{value}'")
            }
            DefectKind::TransformDirection {
                field,
                transform,
                from,
                to,
            } => write!(f, "{field} '{transform}' cannot convert {from} to {to}"),
        }
    }
}

/// A single validation failure with its position.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Defect {
    pub location: Location,
    pub kind: DefectKind,
}

impl fmt::Display for Defect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.location {
            Location::Root => write!(f, "{} at root", self.kind),
            Location::Entry(i) => write!(f, "Invalid mapping at index {i}: {}", self.kind),
        }
    }
}

/// Every defect found in one document, in discovery order. Never empty.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Invalid API mappings configuration:{}", render_lines(.0))]
pub struct SchemaErrors(Vec<Defect>);

impl SchemaErrors {
    pub fn defects(&self) -> &[Defect] {
        &self.0
    }
}

fn render_lines(defects: &[Defect]) -> String {
    defects.iter().map(|d| format!("\n- {d}")).collect()
}

/// Validate a parsed YAML (or JSON) document and build the typed table from it.
pub fn validate(document: &Value) -> Result<MappingTable, SchemaErrors> {
    let mut defects = Vec::new();

    let Some(root) = document.as_mapping() else {
        defects.push(Defect {
            location: Location::Root,
            kind: DefectKind::WrongType {
                field: "document",
                expected: Expected::Object,
            },
        });
        return Err(SchemaErrors(defects));
    };

    {
        let mut root_check = Check {
            at: Location::Root,
            defects: &mut defects,
        };
        root_check.unknown_keys(root, |k| k == MAPPINGS_KEY);
        match root.get(MAPPINGS_KEY) {
            None => root_check.push(DefectKind::Missing {
                field: MAPPINGS_KEY,
            }),
            Some(Value::Sequence(_)) => {}
            Some(_) => root_check.push(DefectKind::WrongType {
                field: MAPPINGS_KEY,
                expected: Expected::Array,
            }),
        }
    }

    let mut entries = Vec::new();
    if let Some(Value::Sequence(items)) = root.get(MAPPINGS_KEY) {
        for (index, item) in items.iter().enumerate() {
            let mut check = Check {
                at: Location::Entry(index),
                defects: &mut defects,
            };
            if let Some(mapping) = check.entry(item) {
                entries.push(mapping);
            }
        }
    }

    if defects.is_empty() {
        tracing::debug!("mapping document valid ({} entries)", entries.len());
        Ok(MappingTable::new(entries))
    } else {
        tracing::debug!("mapping document has {} defect(s)", defects.len());
        Err(SchemaErrors(defects))
    }
}

/// Collects defects for one location.
struct Check<'d> {
    at: Location,
    defects: &'d mut Vec<Defect>,
}

impl Check<'_> {
    fn push(&mut self, kind: DefectKind) {
        self.defects.push(Defect {
            location: self.at,
            kind,
        });
    }

    /// Keys are visited in document order; non-string keys are never allowed.
    fn unknown_keys(&mut self, obj: &Object, allowed: impl Fn(&str) -> bool) {
        for key in obj.keys() {
            if !key.as_str().is_some_and(&allowed) {
                self.push(DefectKind::UnknownProperty {
                    name: key_name(key),
                });
            }
        }
    }

    fn required_str<'v>(
        &mut self,
        obj: &'v Object,
        field: &'static str,
    ) -> Option<&'v str> {
        match obj.get(field) {
            None => {
                self.push(DefectKind::Missing { field });
                None
            }
            Some(Value::String(s)) if s.trim().is_empty() => {
                self.push(DefectKind::Empty { field });
                None
            }
            Some(Value::String(s)) => Some(s.as_str()),
            Some(_) => {
                self.push(DefectKind::WrongType {
                    field,
                    expected: Expected::String,
                });
                None
            }
        }
    }

    /// `Some(None)` for absent/null, `None` when the value has the wrong type.
    fn optional_str(&mut self, obj: &Object, field: &'static str) -> Option<Option<String>> {
        match obj.get(field) {
            None | Some(Value::Null) => Some(None),
            Some(Value::String(s)) => Some(Some(s.clone())),
            Some(_) => {
                self.push(DefectKind::WrongType {
                    field,
                    expected: Expected::StringOrNull,
                });
                None
            }
        }
    }

    fn provider(&mut self, field: &'static str, value: &str) -> Option<Provider> {
        match value.parse() {
            Ok(p) => Some(p),
            Err(_) => {
                self.push(DefectKind::UnknownProvider {
                    field,
                    value: value.to_string(),
                });
                None
            }
        }
    }

    fn transform(&mut self, field: &'static str, value: &str) -> Option<Transform> {
        let found = Transform::from_name(value);
        if found.is_none() {
            self.push(DefectKind::UnknownTransform {
                field,
                value: value.to_string(),
            });
        }
        found
    }

    fn direction(&mut self, field: &'static str, transform: Transform, from: Provider, to: Provider) {
        if !transform.converts(from, to) {
            self.push(DefectKind::TransformDirection {
                field,
                transform,
                from,
                to,
            });
        }
    }

    fn entry(&mut self, value: &Value) -> Option<Mapping> {
        let Some(obj) = value.as_mapping() else {
            self.push(DefectKind::WrongType {
                field: "entry",
                expected: Expected::Object,
            });
            return None;
        };
        let before = self.defects.len();

        let [source, target, prefix, base_url_var, request, response] =
            REQUIRED_FIELDS.map(|field| self.required_str(obj, field));
        let api_key_var = self.optional_str(obj, OPTIONAL_KEY_FIELD);
        self.unknown_keys(obj, |k| {
            k == OPTIONAL_KEY_FIELD || REQUIRED_FIELDS.iter().any(|f| *f == k)
        });

        let source = source.and_then(|s| self.provider("source_api", s));
        let target = target.and_then(|s| self.provider("target_api", s));
        let request = request.and_then(|s| self.transform("request_transform", s));
        let response = response.and_then(|s| self.transform("response_transform", s));

        if let (Some(src), Some(tgt)) = (source, target) {
            if let Some(t) = request {
                self.direction("request_transform", t, src, tgt);
            }
            if let Some(t) = response {
                self.direction("response_transform", t, tgt, src);
            }
        }

        if self.defects.len() > before {
            return None;
        }
        Some(Mapping {
            source_api: source?,
            target_api: target?,
            proxy_path_prefix: prefix?.to_string(),
            target_base_url_env_var: base_url_var?.to_string(),
            target_api_key_env_var: api_key_var?,
            request_transform: request?,
            response_transform: response?,
        })
    }
}

fn key_name(key: &Value) -> String {
    match key {
        Value::String(s) => s.clone(),
        other => serde_yaml::to_string(other)
            .map(|s| s.trim_end().to_string())
            .unwrap_or_else(|_| "<non-string key>".to_string()),
    }
}
