//! Maps OCSF scalar types to data contract field types.
//!
//! # Type Mapping Table
//!
//! Every OCSF scalar type reduces to one of six primitives, either directly
//! or through its `type` key in the schema's `types` section (`port_t` is an
//! `integer_t`, `hostname_t` is a `string_t`, and so on).
//!
//! | OCSF primitive | Contract type | Notes |
//! |----------------|---------------|-------|
//! | `boolean_t` | `boolean` | |
//! | `float_t` | `float` | |
//! | `integer_t` | `integer` | |
//! | `json_t` | `string` | Serialized JSON text |
//! | `long_t` | `long` | |
//! | `string_t` | `string` | |
//! | Anything else | *(omitted)* | The field is emitted without a `type` |

use crate::contract::Field;
use crate::fields::clean_html;
use crate::schema::OcsfType;

/// OCSF types whose values identify people or hosts.
pub const PII_TYPES: &[&str] = &["email_t", "hostname_t", "ip_t", "mac_t", "username_t"];

/// Map an OCSF primitive type name to a contract type.
///
/// Returns `None` for anything that is not one of the six primitives;
/// callers omit the type rather than fail.
pub fn contract_primitive(type_name: &str) -> Option<&'static str> {
    let primitive = match type_name {
        "boolean_t" => "boolean",
        "float_t" => "float",
        "integer_t" => "integer",
        "json_t" => "string",
        "long_t" => "long",
        "string_t" => "string",
        _ => return None,
    };
    Some(primitive)
}

/// A resolved scalar type: contract type plus constraints and metadata.
///
/// Only keys whose source value was present are set.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ScalarType {
    pub field_type: Option<&'static str>,
    pub description: Option<String>,
    pub min_length: Option<u64>,
    pub max_length: Option<u64>,
    pub minimum: Option<serde_json::Number>,
    pub maximum: Option<serde_json::Number>,
    pub observable: Option<u32>,
    pub pii: Option<bool>,
}

impl ScalarType {
    /// Build the descriptor for `name` from its `types` entry.
    ///
    /// A type missing from the `types` section is treated as an empty entry
    /// whose primitive is the name itself.
    pub fn build(name: &str, spec: Option<&OcsfType>) -> Self {
        let empty = OcsfType::default();
        let spec = spec.unwrap_or(&empty);
        let true_type = spec.base_type.as_deref().unwrap_or(name);
        let range = spec.range.as_deref().unwrap_or_default();

        Self {
            field_type: contract_primitive(true_type),
            description: spec.description.as_deref().map(clean_html),
            min_length: spec.min_len,
            // Both bounds come from `min_len`; see DESIGN.md.
            max_length: spec.min_len,
            minimum: range.first().cloned(),
            maximum: range.get(1).cloned(),
            observable: spec.observable,
            pii: Some(PII_TYPES.contains(&name)),
        }
    }

    /// Render the descriptor as a bare contract field.
    pub fn to_field(&self) -> Field {
        Field {
            field_type: self.field_type.map(str::to_string),
            description: self.description.clone(),
            min_length: self.min_length,
            max_length: self.max_length,
            minimum: self.minimum.clone(),
            maximum: self.maximum.clone(),
            observable: self.observable,
            pii: self.pii,
            ..Field::default()
        }
    }
}

/// Strip an extension prefix from an object name.
///
/// `"win/win_service"` → `"win_service"`.
pub fn sanitize_object_name(s: &str) -> String {
    s.rsplit('/').next().unwrap_or(s).to_string()
}
