//! Form field tree used for Template parameters
//!
//! A `FormField` is a JSON-Schema-like node understood by the scaffolder form
//! renderer. Parameter groups are `FormField`s of type object with a title.

use catalog_crd::{SchemaMeta, SchemaNode};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_yaml::{Mapping, Value};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FormField {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub field_type: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub default: Option<Value>,

    #[serde(rename = "enum", skip_serializing_if = "Option::is_none")]
    pub enum_values: Option<Vec<Value>>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub pattern: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_length: Option<u64>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub min_items: Option<u64>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub unique_items: Option<bool>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub items: Option<Box<FormField>>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub required: Vec<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub properties: Option<IndexMap<String, FormField>>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub one_of: Option<Vec<FormField>>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub dependencies: Option<IndexMap<String, FormField>>,

    #[serde(rename = "ui:field", skip_serializing_if = "Option::is_none")]
    pub ui_field: Option<String>,

    #[serde(rename = "ui:widget", skip_serializing_if = "Option::is_none")]
    pub ui_widget: Option<String>,

    #[serde(rename = "ui:options", skip_serializing_if = "Option::is_none")]
    pub ui_options: Option<Value>,

    #[serde(rename = "ui:placeholder", skip_serializing_if = "Option::is_none")]
    pub ui_placeholder: Option<String>,

    /// Schema keywords passed through untouched
    #[serde(flatten)]
    pub extra: Mapping,
}

impl FormField {
    /// Field of the given JSON type
    pub fn typed(field_type: &str) -> Self {
        Self {
            field_type: Some(field_type.to_string()),
            ..Default::default()
        }
    }

    /// Titled object used as a parameter group
    pub fn group(title: &str) -> Self {
        Self {
            title: Some(title.to_string()),
            field_type: Some("object".to_string()),
            properties: Some(IndexMap::new()),
            ..Default::default()
        }
    }

    /// Branch of a `oneOf` whose properties are not typed
    pub fn branch() -> Self {
        Self {
            properties: Some(IndexMap::new()),
            ..Default::default()
        }
    }

    pub fn title(mut self, title: &str) -> Self {
        self.title = Some(title.to_string());
        self
    }

    pub fn description(mut self, description: &str) -> Self {
        self.description = Some(description.to_string());
        self
    }

    pub fn default_value(mut self, value: impl Into<Value>) -> Self {
        self.default = Some(value.into());
        self
    }

    pub fn one_of_values<I, V>(mut self, values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        self.enum_values = Some(values.into_iter().map(Into::into).collect());
        self
    }

    pub fn with_property(mut self, name: &str, field: FormField) -> Self {
        self.properties
            .get_or_insert_with(IndexMap::new)
            .insert(name.to_string(), field);
        self
    }

    pub fn with_required(mut self, name: &str) -> Self {
        if !self.required.iter().any(|r| r == name) {
            self.required.push(name.to_string());
        }
        self
    }

    pub fn with_dependency(mut self, name: &str, field: FormField) -> Self {
        self.dependencies
            .get_or_insert_with(IndexMap::new)
            .insert(name.to_string(), field);
        self
    }

    pub fn with_extra(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.extra.insert(key.into(), value.into());
        self
    }

    /// A group with nothing in it is dropped from the form
    pub fn has_properties(&self) -> bool {
        self.properties.as_ref().is_some_and(|p| !p.is_empty())
    }

    /// Number of direct properties
    pub fn property_count(&self) -> usize {
        self.properties.as_ref().map_or(0, IndexMap::len)
    }

    pub fn property(&self, name: &str) -> Option<&FormField> {
        self.properties.as_ref().and_then(|p| p.get(name))
    }
}

/// Verbatim conversion of a schema node into a form field
impl From<&SchemaNode> for FormField {
    fn from(node: &SchemaNode) -> Self {
        let mut field = from_meta(node.meta());
        field.field_type = node.type_name().map(str::to_string);

        match node {
            SchemaNode::Object(object) => {
                if !object.properties.is_empty() {
                    field.properties = Some(
                        object
                            .properties
                            .iter()
                            .map(|(name, child)| (name.clone(), FormField::from(child)))
                            .collect(),
                    );
                }
                field.required = object.required.clone();
            }
            SchemaNode::Array(array) => {
                field.items = array.items.as_deref().map(|items| Box::new(items.into()));
            }
            SchemaNode::Scalar(_) | SchemaNode::PreserveUnknown(_) => {}
        }

        field
    }
}

fn from_meta(meta: &SchemaMeta) -> FormField {
    FormField {
        title: meta.title.clone(),
        description: meta.description.clone(),
        default: meta.default.clone(),
        enum_values: meta.enum_values.clone(),
        extra: meta.extra.clone(),
        ..Default::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_serialized_keys() {
        let mut field = FormField::typed("string")
            .title("Owner")
            .with_extra("format", "uri");
        field.ui_field = Some("OwnerPicker".to_string());
        field.max_length = Some(63);

        let value = serde_yaml::to_value(&field).unwrap();
        assert_eq!(value.get("type").and_then(|v| v.as_str()), Some("string"));
        assert_eq!(value.get("ui:field").and_then(|v| v.as_str()), Some("OwnerPicker"));
        assert_eq!(value.get("maxLength").and_then(|v| v.as_u64()), Some(63));
        assert_eq!(value.get("format").and_then(|v| v.as_str()), Some("uri"));
        assert!(value.get("required").is_none());
        assert!(value.get("properties").is_none());
    }

    #[test]
    fn test_reparse_is_structurally_equal() {
        let field = FormField::group("Creation Settings")
            .with_property(
                "pushToGit",
                FormField::typed("boolean").default_value(true),
            )
            .with_required("pushToGit")
            .with_dependency(
                "pushToGit",
                FormField {
                    one_of: Some(vec![FormField::branch().with_property(
                        "pushToGit",
                        FormField::default().one_of_values([false]),
                    )]),
                    ..Default::default()
                },
            );

        let yaml = serde_yaml::to_string(&field).unwrap();
        let parsed: FormField = serde_yaml::from_str(&yaml).unwrap();
        assert_eq!(parsed, field);
    }

    #[test]
    fn test_from_schema_node_is_verbatim() {
        let raw: Value = serde_yaml::from_str(
            r#"
            type: object
            required: [name]
            properties:
              name: {type: string, minLength: 1}
              tags: {type: array, items: {type: string}}
            "#,
        )
        .unwrap();
        let node = SchemaNode::from_value(&raw).unwrap();
        let field = FormField::from(&node);

        assert_eq!(field.required, vec!["name".to_string()]);
        let name = field.property("name").unwrap();
        assert_eq!(name.extra.get("minLength").and_then(|v| v.as_u64()), Some(1));
        let tags = field.property("tags").unwrap();
        assert_eq!(
            tags.items.as_ref().and_then(|i| i.field_type.as_deref()),
            Some("string")
        );
    }
}
