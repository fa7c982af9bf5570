//! Checked OpenAPI v3 schema model
//!
//! Raw schema fragments are parsed once at the discovery boundary into a
//! small closed set of node variants, so the generator never has to probe
//! untyped YAML. Anything the model does not name is kept in `extra` and
//! rendered back unchanged.

use anyhow::{anyhow, Result};
use indexmap::IndexMap;
use serde_yaml::{Mapping, Value};

const PRESERVE_UNKNOWN_FIELDS: &str = "x-kubernetes-preserve-unknown-fields";

/// Keys lifted out of a schema fragment into typed fields
const MODELED_KEYS: &[&str] = &[
    "type",
    "title",
    "description",
    "default",
    "enum",
    "properties",
    "required",
    "items",
];

/// Attributes shared by every schema node
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SchemaMeta {
    pub title: Option<String>,
    pub description: Option<String>,
    pub default: Option<Value>,
    pub enum_values: Option<Vec<Value>>,
    /// Every key not modeled above, in input order
    pub extra: Mapping,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ObjectSchema {
    pub meta: SchemaMeta,
    pub properties: IndexMap<String, SchemaNode>,
    pub required: Vec<String>,
}

impl ObjectSchema {
    pub fn is_required(&self, name: &str) -> bool {
        self.required.iter().any(|r| r == name)
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ArraySchema {
    pub meta: SchemaMeta,
    pub items: Option<Box<SchemaNode>>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ScalarSchema {
    pub meta: SchemaMeta,
    /// Declared type; `None` when the fragment has no `type`
    pub type_name: Option<String>,
}

/// A parsed schema fragment
#[derive(Debug, Clone, PartialEq)]
pub enum SchemaNode {
    Object(ObjectSchema),
    Array(ArraySchema),
    Scalar(ScalarSchema),
    /// `x-kubernetes-preserve-unknown-fields: true` without a `type`
    PreserveUnknown(SchemaMeta),
}

impl SchemaNode {
    /// Parse a raw schema fragment
    pub fn from_value(value: &Value) -> Result<Self> {
        let map = value
            .as_mapping()
            .ok_or_else(|| anyhow!("schema fragment is not a mapping"))?;

        let type_name = map.get("type").and_then(|t| t.as_str());
        let meta = parse_meta(map)?;

        let preserve_unknown = map
            .get(PRESERVE_UNKNOWN_FIELDS)
            .and_then(|v| v.as_bool())
            .unwrap_or(false);

        if preserve_unknown && type_name.is_none() {
            return Ok(Self::PreserveUnknown(meta));
        }

        match type_name {
            Some("object") => parse_object(map, meta).map(Self::Object),
            None if map.contains_key("properties") => parse_object(map, meta).map(Self::Object),
            Some("array") => {
                let items = match map.get("items") {
                    Some(items) => Some(Box::new(
                        Self::from_value(items).map_err(|e| anyhow!("items: {e}"))?,
                    )),
                    None => None,
                };
                Ok(Self::Array(ArraySchema { meta, items }))
            }
            other => Ok(Self::Scalar(ScalarSchema {
                meta,
                type_name: other.map(str::to_string),
            })),
        }
    }

    pub fn meta(&self) -> &SchemaMeta {
        match self {
            Self::Object(o) => &o.meta,
            Self::Array(a) => &a.meta,
            Self::Scalar(s) => &s.meta,
            Self::PreserveUnknown(meta) => meta,
        }
    }

    pub fn as_object(&self) -> Option<&ObjectSchema> {
        match self {
            Self::Object(o) => Some(o),
            _ => None,
        }
    }

    /// Look up a direct property of an object node
    pub fn property(&self, name: &str) -> Option<&SchemaNode> {
        self.as_object().and_then(|o| o.properties.get(name))
    }

    /// Declared type name, if the fragment had one
    pub fn type_name(&self) -> Option<&str> {
        match self {
            Self::Object(_) => Some("object"),
            Self::Array(_) => Some("array"),
            Self::Scalar(s) => s.type_name.as_deref(),
            Self::PreserveUnknown(_) => None,
        }
    }

    /// Render the node back into an OpenAPI fragment
    pub fn to_value(&self) -> Value {
        let mut map = Mapping::new();
        let meta = self.meta();

        if let Some(title) = &meta.title {
            map.insert("title".into(), title.as_str().into());
        }
        if let Some(description) = &meta.description {
            map.insert("description".into(), description.as_str().into());
        }
        if let Some(type_name) = self.type_name() {
            map.insert("type".into(), type_name.into());
        }
        if let Some(default) = &meta.default {
            map.insert("default".into(), default.clone());
        }
        if let Some(values) = &meta.enum_values {
            map.insert("enum".into(), Value::Sequence(values.clone()));
        }

        match self {
            Self::Object(o) => {
                if !o.properties.is_empty() {
                    let properties: Mapping = o
                        .properties
                        .iter()
                        .map(|(k, v)| (Value::from(k.as_str()), v.to_value()))
                        .collect();
                    map.insert("properties".into(), Value::Mapping(properties));
                }
                if !o.required.is_empty() {
                    let required = o.required.iter().map(|r| Value::from(r.as_str())).collect();
                    map.insert("required".into(), Value::Sequence(required));
                }
            }
            Self::Array(a) => {
                if let Some(items) = &a.items {
                    map.insert("items".into(), items.to_value());
                }
            }
            Self::Scalar(_) | Self::PreserveUnknown(_) => {}
        }

        for (k, v) in &meta.extra {
            map.insert(k.clone(), v.clone());
        }

        Value::Mapping(map)
    }
}

fn parse_meta(map: &Mapping) -> Result<SchemaMeta> {
    let title = map.get("title").and_then(|v| v.as_str()).map(str::to_string);
    let description = map
        .get("description")
        .and_then(|v| v.as_str())
        .map(str::to_string);
    let default = map.get("default").cloned();
    let enum_values = match map.get("enum") {
        Some(Value::Sequence(values)) => Some(values.clone()),
        Some(_) => return Err(anyhow!("enum must be a sequence")),
        None => None,
    };

    let extra = map
        .iter()
        .filter(|(k, _)| !k.as_str().is_some_and(|k| MODELED_KEYS.contains(&k)))
        .map(|(k, v)| (k.clone(), v.clone()))
        .collect();

    Ok(SchemaMeta {
        title,
        description,
        default,
        enum_values,
        extra,
    })
}

fn parse_object(map: &Mapping, meta: SchemaMeta) -> Result<ObjectSchema> {
    let mut properties = IndexMap::new();

    match map.get("properties") {
        Some(Value::Mapping(props)) => {
            for (key, value) in props {
                let key = key
                    .as_str()
                    .ok_or_else(|| anyhow!("property names must be strings"))?;
                let node =
                    SchemaNode::from_value(value).map_err(|e| anyhow!("property {key}: {e}"))?;
                properties.insert(key.to_string(), node);
            }
        }
        Some(Value::Null) | None => {}
        Some(_) => return Err(anyhow!("properties must be a mapping")),
    }

    let required = map
        .get("required")
        .and_then(|r| r.as_sequence())
        .map(|seq| {
            seq.iter()
                .filter_map(|v| v.as_str().map(str::to_string))
                .collect()
        })
        .unwrap_or_default();

    Ok(ObjectSchema {
        meta,
        properties,
        required,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(yaml: &str) -> SchemaNode {
        let value: Value = serde_yaml::from_str(yaml).unwrap();
        SchemaNode::from_value(&value).unwrap()
    }

    #[test]
    fn test_object_keeps_property_order() {
        let node = parse(
            r#"
            type: object
            required: [zeta]
            properties:
              zeta: {type: string}
              alpha: {type: integer}
              mid: {type: boolean}
            "#,
        );

        let object = node.as_object().unwrap();
        let keys: Vec<_> = object.properties.keys().map(String::as_str).collect();
        assert_eq!(keys, vec!["zeta", "alpha", "mid"]);
        assert!(object.is_required("zeta"));
        assert!(!object.is_required("alpha"));
    }

    #[test]
    fn test_preserve_unknown_without_type() {
        let node = parse("x-kubernetes-preserve-unknown-fields: true\ndescription: raw values");
        assert!(matches!(node, SchemaNode::PreserveUnknown(_)));
        assert_eq!(node.meta().description.as_deref(), Some("raw values"));
    }

    #[test]
    fn test_preserve_unknown_with_type_is_object() {
        let node = parse("type: object\nx-kubernetes-preserve-unknown-fields: true");
        assert!(matches!(node, SchemaNode::Object(_)));
    }

    #[test]
    fn test_scalar_without_type() {
        let node = parse("description: anything");
        match node {
            SchemaNode::Scalar(s) => assert!(s.type_name.is_none()),
            other => panic!("unexpected node {other:?}"),
        }
    }

    #[test]
    fn test_render_keeps_unmodeled_keys() {
        let node = parse(
            r#"
            type: integer
            minimum: 1
            format: int32
            default: 3
            "#,
        );

        let value = node.to_value();
        assert_eq!(value.get("minimum").and_then(|v| v.as_i64()), Some(1));
        assert_eq!(value.get("format").and_then(|v| v.as_str()), Some("int32"));
        assert_eq!(value.get("default").and_then(|v| v.as_i64()), Some(3));
        assert_eq!(SchemaNode::from_value(&value).unwrap(), node);
    }

    #[test]
    fn test_rejects_non_mapping_properties() {
        let value: Value = serde_yaml::from_str("type: object\nproperties: [a, b]").unwrap();
        assert!(SchemaNode::from_value(&value).is_err());
    }
}
