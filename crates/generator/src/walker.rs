//! Conversion of OpenAPI schema fragments into form fields

use crate::form::FormField;
use catalog_crd::{ObjectSchema, SchemaNode};
use indexmap::IndexMap;
use serde_yaml::Value;

/// Rows shown by free-text widgets for schemaless values
pub const TEXTAREA_ROWS: u64 = 10;

pub struct SchemaWalker {
    convert_defaults_to_placeholders: bool,
}

impl SchemaWalker {
    pub fn new(convert_defaults_to_placeholders: bool) -> Self {
        Self {
            convert_defaults_to_placeholders,
        }
    }

    /// Convert a schema fragment; anything but an object yields no properties
    pub fn walk_node(&self, node: Option<&SchemaNode>) -> FormField {
        match node.and_then(SchemaNode::as_object) {
            Some(object) => self.walk(object),
            None => FormField::branch(),
        }
    }

    /// Convert the properties of an object schema, keeping its top-level `required`
    pub fn walk(&self, schema: &ObjectSchema) -> FormField {
        let properties: IndexMap<String, FormField> = schema
            .properties
            .iter()
            .map(|(name, node)| (name.clone(), self.convert_property(node)))
            .collect();

        let required = schema
            .required
            .iter()
            .filter(|name| {
                schema
                    .properties
                    .get(name.as_str())
                    .is_some_and(|node| !matches!(node, SchemaNode::PreserveUnknown(_)))
            })
            .cloned()
            .collect();

        FormField {
            properties: Some(properties),
            required,
            ..Default::default()
        }
    }

    fn convert_property(&self, node: &SchemaNode) -> FormField {
        match node {
            SchemaNode::PreserveUnknown(meta) => FormField {
                title: meta.title.clone(),
                description: meta.description.clone(),
                field_type: Some("string".to_string()),
                ui_widget: Some("textarea".to_string()),
                ui_options: Some(rows_option()),
                ..Default::default()
            },
            SchemaNode::Object(object) if !object.properties.is_empty() => {
                let mut field = FormField {
                    title: object.meta.title.clone(),
                    description: object.meta.description.clone(),
                    field_type: Some("object".to_string()),
                    default: object.meta.default.clone(),
                    extra: object.meta.extra.clone(),
                    properties: Some(
                        object
                            .properties
                            .iter()
                            .map(|(name, child)| (name.clone(), self.convert_property(child)))
                            .collect(),
                    ),
                    ..Default::default()
                };
                self.apply_default_policy(&mut field);
                field
            }
            _ => {
                let mut field = FormField::from(node);
                if field.field_type.is_none() {
                    field.field_type = Some("string".to_string());
                }
                self.apply_default_policy(&mut field);
                field
            }
        }
    }

    fn apply_default_policy(&self, field: &mut FormField) {
        if !self.convert_defaults_to_placeholders {
            return;
        }

        // Checkboxes have no placeholder, so boolean defaults stay
        match field.default.take() {
            Some(default) if !default.is_bool() => {
                field.ui_placeholder = Some(format!("Default: {}", render_default(&default)));
            }
            other => field.default = other,
        }
    }
}

fn rows_option() -> Value {
    let mut options = serde_yaml::Mapping::new();
    options.insert("rows".into(), TEXTAREA_ROWS.into());
    Value::Mapping(options)
}

fn render_default(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        Value::Null => "null".to_string(),
        other => serde_json::to_string(other).unwrap_or_default(),
    }
}
