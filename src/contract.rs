//! The canonical data contract model.
//!
//! Mirrors the data contract specification's `models` and `definitions`
//! sections closely enough to round-trip through YAML. Top-level keys this
//! crate does not manage (servers, terms, quality, ...) are kept in
//! [`DataContract::extra`] untouched.

use std::path::Path;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Prefix of every `$ref` that points into the shared definitions.
pub const DEFINITIONS_PREFIX: &str = "#/definitions/";

/// Model type used when a class does not name one.
pub const DEFAULT_MODEL_TYPE: &str = "table";

fn default_specification() -> String {
    "1.1.0".to_string()
}

/// A data contract: metadata, models, and shared definitions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DataContract {
    #[serde(default = "default_specification")]
    pub data_contract_specification: String,

    #[serde(default)]
    pub id: String,

    #[serde(default)]
    pub info: Info,

    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub models: IndexMap<String, Model>,

    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub definitions: IndexMap<String, Definition>,

    /// Any other top-level keys, preserved as-is.
    #[serde(flatten)]
    pub extra: IndexMap<String, serde_json::Value>,
}

impl Default for DataContract {
    fn default() -> Self {
        Self {
            data_contract_specification: default_specification(),
            id: String::new(),
            info: Info::default(),
            models: IndexMap::new(),
            definitions: IndexMap::new(),
            extra: IndexMap::new(),
        }
    }
}

impl DataContract {
    /// Create an empty contract with the given id and title.
    pub fn new(id: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            info: Info {
                title: title.into(),
                version: "0.0.1".to_string(),
                description: None,
            },
            ..Self::default()
        }
    }

    /// Load a contract from a YAML (or JSON) file.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| Error::Read {
            path: path.to_path_buf(),
            source: e,
        })?;
        Ok(serde_yaml::from_str(&content)?)
    }

    pub fn to_yaml(&self) -> Result<String> {
        Ok(serde_yaml::to_string(self)?)
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Info {
    #[serde(default)]
    pub title: String,

    #[serde(default)]
    pub version: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// A model: one table-like entity with named fields.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Model {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub model_type: Option<String>,

    /// Fields in insertion order.
    #[serde(default)]
    pub fields: IndexMap<String, Field>,
}

/// A shared, fully-resolved object definition.
///
/// Every key is optional so that a descriptor can be merged over its base
/// one key at a time (see [`Definition::overlay`]).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Definition {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub definition_type: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fields: Option<IndexMap<String, Field>>,
}

impl Definition {
    /// Shallow merge over `base`: each top-level key set on `self` wins
    /// outright, unset keys are taken from `base`.
    ///
    /// `fields` is replaced as a whole, never combined per field.
    pub fn overlay(self, base: &Definition) -> Definition {
        Definition {
            name: self.name.or_else(|| base.name.clone()),
            title: self.title.or_else(|| base.title.clone()),
            description: self.description.or_else(|| base.description.clone()),
            definition_type: self
                .definition_type
                .or_else(|| base.definition_type.clone()),
            fields: self.fields.or_else(|| base.fields.clone()),
        }
    }

    /// The definition's fields, or an empty map.
    pub fn fields(&self) -> impl Iterator<Item = (&String, &Field)> {
        self.fields.iter().flat_map(|fields| fields.iter())
    }
}

/// A single field of a model or definition.
///
/// A field takes exactly one shape, see [`FieldShape`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Field {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub field_type: Option<String>,

    /// Element type; set only on arrays.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub items: Option<Box<Field>>,

    /// Inline nested fields; set only on objects held by value.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fields: Option<IndexMap<String, Field>>,

    /// Reference into the shared definitions (`#/definitions/<name>`).
    #[serde(rename = "$ref", default, skip_serializing_if = "Option::is_none")]
    pub reference: Option<String>,

    #[serde(rename = "enum", default, skip_serializing_if = "Option::is_none")]
    pub enum_values: Option<Vec<String>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub required: Option<bool>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub observable: Option<u32>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_length: Option<u64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_length: Option<u64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub minimum: Option<serde_json::Number>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub maximum: Option<serde_json::Number>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pii: Option<bool>,
}

/// The mutually exclusive shapes a field can take.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FieldShape<'a> {
    Scalar,
    Array(&'a Field),
    Object(&'a IndexMap<String, Field>),
    Reference(&'a str),
}

impl Field {
    /// An object-by-reference field pointing at definition `name`.
    pub fn reference_to(name: &str) -> Self {
        Field {
            field_type: Some("object".to_string()),
            reference: Some(format!("{DEFINITIONS_PREFIX}{name}")),
            ..Field::default()
        }
    }

    /// An array field whose elements are `items`.
    pub fn array_of(items: Field) -> Self {
        Field {
            field_type: Some("array".to_string()),
            items: Some(Box::new(items)),
            ..Field::default()
        }
    }

    pub fn shape(&self) -> FieldShape<'_> {
        if let Some(reference) = &self.reference {
            FieldShape::Reference(reference)
        } else if let Some(items) = &self.items {
            FieldShape::Array(items)
        } else if let Some(fields) = &self.fields {
            FieldShape::Object(fields)
        } else {
            FieldShape::Scalar
        }
    }

    /// Name of the referenced definition, if this field's `$ref` points into
    /// the shared definitions.
    pub fn definition_name(&self) -> Option<&str> {
        self.reference
            .as_deref()
            .and_then(|r| r.strip_prefix(DEFINITIONS_PREFIX))
    }

    pub fn is_required(&self) -> bool {
        self.required.unwrap_or(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn named(name: &str, fields: &[&str]) -> Definition {
        Definition {
            name: Some(name.to_string()),
            definition_type: Some("object".to_string()),
            fields: Some(
                fields
                    .iter()
                    .map(|f| (f.to_string(), Field::default()))
                    .collect(),
            ),
            ..Definition::default()
        }
    }

    #[test]
    fn overlay_replaces_fields_wholesale() {
        let base = Definition {
            title: Some("Base".to_string()),
            description: Some("from base".to_string()),
            ..named("base", &["a", "b"])
        };
        let derived = named("derived", &["c"]).overlay(&base);

        assert_eq!(derived.name.as_deref(), Some("derived"));
        assert_eq!(derived.title.as_deref(), Some("Base"));
        assert_eq!(derived.description.as_deref(), Some("from base"));
        let fields: Vec<&str> = derived.fields().map(|(k, _)| k.as_str()).collect();
        assert_eq!(fields, ["c"]);
    }

    #[test]
    fn overlay_with_empty_base_is_identity() {
        let d = named("thing", &["x"]);
        assert_eq!(d.clone().overlay(&Definition::default()), d);
    }

    #[test]
    fn field_shapes() {
        let reference = Field::reference_to("user");
        assert_eq!(reference.shape(), FieldShape::Reference("#/definitions/user"));
        assert_eq!(reference.definition_name(), Some("user"));

        let array = Field::array_of(Field::reference_to("user"));
        assert!(matches!(array.shape(), FieldShape::Array(_)));
        assert_eq!(array.definition_name(), None);

        assert_eq!(Field::default().shape(), FieldShape::Scalar);
    }

    #[test]
    fn serializes_with_contract_key_names() {
        let field = Field {
            enum_values: Some(vec!["1".to_string()]),
            min_length: Some(1),
            required: Some(true),
            ..Field::reference_to("user")
        };
        let json = serde_json::to_value(&field).unwrap();
        assert_eq!(json["$ref"], "#/definitions/user");
        assert_eq!(json["type"], "object");
        assert_eq!(json["enum"][0], "1");
        assert_eq!(json["minLength"], 1);
        assert_eq!(json["required"], true);
        assert!(json.get("tags").is_none());
        assert!(json.get("items").is_none());
    }

    #[test]
    fn unknown_contract_keys_survive_yaml_round_trip() {
        let yaml = r#"
dataContractSpecification: 1.1.0
id: urn:test
info:
  title: Test
  version: 1.0.0
servers:
  production:
    type: s3
models:
  login:
    type: table
    fields:
      user:
        type: object
        $ref: '#/definitions/_entity'
"#;
        let contract: DataContract = serde_yaml::from_str(yaml).unwrap();
        assert!(contract.extra.contains_key("servers"));
        assert_eq!(
            contract.models["login"].fields["user"].definition_name(),
            Some("_entity")
        );

        let back: DataContract = serde_yaml::from_str(&contract.to_yaml().unwrap()).unwrap();
        assert_eq!(back, contract);
    }
}
