//! OCSF schema document types, loading, and downloading.
//!
//! Unlike the fully-resolved export consumed by code generators, the importer
//! works on documents where `extends` chains are still present, so objects
//! keep their own attributes and name their base object. All maps are
//! [`IndexMap`]s: document order decides model order, field order, and the
//! order of enum values in the resulting contract.

use std::path::Path;

use indexmap::IndexMap;
use once_cell::sync::Lazy;
use serde::{Deserialize, Deserializer};

use crate::error::{Error, Result};
use crate::type_map::sanitize_object_name;

/// An OCSF schema document.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct OcsfSchema {
    /// OCSF version string (e.g., `"1.3.0"`). Not every document carries one.
    #[serde(default)]
    pub version: String,

    /// Event classes keyed by name (e.g., `"authentication"`).
    #[serde(default)]
    pub classes: IndexMap<String, OcsfClass>,

    /// Reusable objects keyed by name (e.g., `"user"`, `"network_endpoint"`).
    #[serde(default)]
    pub objects: IndexMap<String, OcsfObject>,

    /// Scalar type definitions (e.g., `"string_t"`, `"port_t"`).
    #[serde(default)]
    pub types: IndexMap<String, OcsfType>,
}

/// An OCSF event class. Structurally an object with a few class-only keys.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct OcsfClass {
    /// Snake_case class name. Falls back to the document key when absent.
    #[serde(default)]
    pub name: Option<String>,

    /// Unique class identifier (e.g., `3002` for Authentication).
    #[serde(default)]
    pub uid: Option<u32>,

    /// Human-readable class name (e.g., `"Authentication"`).
    #[serde(default)]
    pub caption: Option<String>,

    #[serde(default)]
    pub description: Option<String>,

    /// Model type to emit. Defaults to `"table"` when absent.
    #[serde(rename = "type", default)]
    pub model_type: Option<String>,

    /// Parent class name (e.g., `"iam"`).
    #[serde(default)]
    pub extends: Option<String>,

    /// Category name (e.g., `"iam"`, `"findings"`).
    #[serde(default)]
    pub category: Option<String>,

    #[serde(default)]
    pub profiles: Vec<String>,

    /// Attributes keyed by name, in document order.
    #[serde(default, deserialize_with = "deserialize_attributes")]
    pub attributes: IndexMap<String, OcsfAttribute>,
}

/// An OCSF object (e.g., User, Network Endpoint).
#[derive(Debug, Clone, Default, Deserialize)]
pub struct OcsfObject {
    #[serde(default)]
    pub name: Option<String>,

    #[serde(default)]
    pub caption: Option<String>,

    #[serde(default)]
    pub description: Option<String>,

    /// Base object name (e.g., `"_entity"`). `None` ends the inheritance chain.
    #[serde(default)]
    pub extends: Option<String>,

    #[serde(default)]
    pub profiles: Vec<String>,

    /// Attributes keyed by name, in document order.
    #[serde(default, deserialize_with = "deserialize_attributes")]
    pub attributes: IndexMap<String, OcsfAttribute>,

    /// Observable type number (e.g., `20` for Endpoint, `21` for User).
    #[serde(default)]
    pub observable: Option<u32>,
}

/// A scalar type definition from the `types` section.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct OcsfType {
    /// Underlying primitive (e.g., `port_t` is an `integer_t`). Absent on
    /// the primitives themselves.
    #[serde(rename = "type", default)]
    pub base_type: Option<String>,

    #[serde(default)]
    pub caption: Option<String>,

    #[serde(default)]
    pub description: Option<String>,

    #[serde(default)]
    pub min_len: Option<u64>,

    #[serde(default)]
    pub max_len: Option<u64>,

    #[serde(default)]
    pub regex: Option<String>,

    /// Inclusive `[min, max]` bounds.
    #[serde(default)]
    pub range: Option<Vec<serde_json::Number>>,

    #[serde(default)]
    pub observable: Option<u32>,
}

/// A single attribute of a class or object.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct OcsfAttribute {
    /// OCSF scalar type name (e.g., `"string_t"`). Absent on some
    /// object-valued and profile-contributed attributes.
    #[serde(rename = "type", default)]
    pub type_name: Option<String>,

    #[serde(default)]
    pub caption: Option<String>,

    #[serde(default)]
    pub description: Option<String>,

    /// `"required"`, `"recommended"`, `"optional"`, or anything else.
    #[serde(default)]
    pub requirement: Option<String>,

    #[serde(default)]
    pub is_array: bool,

    /// Referenced object name. May carry an extension prefix
    /// (e.g., `"win/win_service"`).
    #[serde(default)]
    pub object_type: Option<String>,

    /// Attribute group: `"primary"`, `"context"`, `"classification"`, `"occurrence"`.
    #[serde(default)]
    pub group: Option<String>,

    /// Profile that contributed this attribute (e.g., `"cloud"`).
    #[serde(default)]
    pub profile: Option<String>,

    #[serde(default)]
    pub observable: Option<u32>,

    /// Enum values keyed by allowed value, in document order.
    #[serde(rename = "enum", default)]
    pub enum_values: Option<IndexMap<String, serde_json::Value>>,

    #[serde(default)]
    pub deprecated: bool,

    /// Deprecation metadata as found in the OCSF export format.
    #[serde(rename = "@deprecated", default)]
    pub deprecation: Option<OcsfDeprecated>,
}

impl OcsfAttribute {
    /// Whether the attribute is deprecated in either notation.
    pub fn is_deprecated(&self) -> bool {
        self.deprecated || self.deprecation.is_some()
    }
}

/// Deprecation metadata for an attribute.
#[derive(Debug, Clone, Deserialize)]
pub struct OcsfDeprecated {
    #[serde(default)]
    pub message: String,

    #[serde(default)]
    pub since: String,
}

/// Attribute maps may contain non-object entries such as
/// `"$include": ["profiles/data_classification.json"]`. Those become empty
/// attributes and are handled by name during translation.
fn deserialize_attributes<'de, D>(
    deserializer: D,
) -> std::result::Result<IndexMap<String, OcsfAttribute>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = IndexMap::<String, serde_json::Value>::deserialize(deserializer)?;
    raw.into_iter()
        .map(|(name, value)| {
            let attr = if value.is_object() {
                serde_json::from_value(value).map_err(serde::de::Error::custom)?
            } else {
                OcsfAttribute::default()
            };
            Ok((name, attr))
        })
        .collect()
}

/// Objects that OCSF schema libraries omit from their exports but that
/// classes and objects still extend or reference.
const INTERNAL_OBJECTS_JSON: &str = r#"{
    "_dns": {
        "caption": "DNS",
        "name": "_dns",
        "description": "The Domain Name System (DNS) object represents the shared information associated with the DNS query and answer objects.",
        "extends": "object",
        "attributes": {
            "class": {
                "description": "The class of resource records being queried. See <a target='_blank' href='https://www.rfc-editor.org/rfc/rfc1035.txt'>RFC1035</a>. For example: <code>IN</code>.",
                "caption": "Resource Record Class",
                "requirement": "recommended"
            },
            "packet_uid": {
                "description": "The DNS packet identifier assigned by the program that generated the query. The identifier is copied to the response.",
                "requirement": "recommended"
            },
            "type": {
                "description": "The type of resource records being queried. See <a target='_blank' href='https://www.rfc-editor.org/rfc/rfc1035.txt'>RFC1035</a>. For example: A, AAAA, CNAME, MX, and NS.",
                "caption": "Resource Record Type",
                "requirement": "recommended"
            }
        }
    },
    "_entity": {
        "caption": "Entity",
        "name": "_entity",
        "description": "The Entity object is an unordered collection of attributes, with a name and unique identifier. It serves as a base object that defines a set of attributes and default constraints available in all objects that extend it.",
        "extends": "object",
        "attributes": {
            "name": {"description": "The name of the entity.", "requirement": "recommended"},
            "uid": {"description": "The unique identifier of the entity.", "requirement": "recommended"}
        }
    },
    "_resource": {
        "caption": "Resource",
        "name": "_resource",
        "description": "The Resource object contains attributes that provide information about a particular resource. It serves as a base object, offering attributes that help identify and classify the resource effectively.",
        "extends": "_entity",
        "profiles": ["data_classification"],
        "attributes": {
            "$include": ["profiles/data_classification.json"],
            "data": {"description": "Additional data describing the resource.", "requirement": "optional"},
            "labels": {"description": "The list of labels/tags associated to a resource.", "requirement": "optional"},
            "name": {"description": "The name of the resource."},
            "type": {"description": "The resource type as defined by the event source.", "requirement": "optional"},
            "uid": {"description": "The unique identifier of the resource."}
        }
    }
}"#;

static INTERNAL_OBJECTS: Lazy<IndexMap<String, OcsfObject>> = Lazy::new(|| {
    serde_json::from_str(INTERNAL_OBJECTS_JSON).expect("built-in OCSF objects are valid JSON")
});

impl OcsfSchema {
    /// Add the built-in `_dns`, `_entity`, and `_resource` objects.
    ///
    /// Objects already present in the document win on name collision.
    pub fn with_internal_objects(mut self) -> Self {
        for (name, obj) in INTERNAL_OBJECTS.iter() {
            if !self.objects.contains_key(name) {
                self.objects.insert(name.clone(), obj.clone());
            }
        }
        self
    }

    /// Look up an object by name, handling extension-prefixed names.
    ///
    /// Tries the name as given, then the unprefixed name, then scans all
    /// objects comparing unprefixed names.
    pub fn object(&self, name: &str) -> Option<&OcsfObject> {
        self.objects.get(name).or_else(|| {
            let sanitized = sanitize_object_name(name);
            self.objects.get(&sanitized).or_else(|| {
                self.objects.iter().find_map(|(key, obj)| {
                    let obj_name = obj.name.as_deref().unwrap_or(key);
                    (sanitize_object_name(obj_name) == sanitized).then_some(obj)
                })
            })
        })
    }
}

/// Parse an OCSF schema document from a JSON string.
///
/// `source` identifies where the text came from and is included in the
/// error on failure.
pub fn parse_schema(content: &str, source: &str) -> Result<OcsfSchema> {
    serde_json::from_str(content).map_err(|e| Error::Schema {
        operation: "parse OCSF schema",
        reason: format!("failed to parse json/ocsf schema from {source}"),
        source: Box::new(e),
    })
}

/// Load an OCSF schema document from disk.
pub fn load_schema(path: &Path) -> Result<OcsfSchema> {
    let content = std::fs::read_to_string(path).map_err(|e| Error::Schema {
        operation: "read OCSF schema",
        reason: format!("failed to read json/ocsf schema from {}", path.display()),
        source: Box::new(e),
    })?;
    parse_schema(&content, &path.display().to_string())
}

/// Export API address for `version`, as `{base_url}?version={version}`.
#[cfg(feature = "download")]
pub fn export_url(base_url: &str, version: &str) -> Result<reqwest::Url> {
    reqwest::Url::parse_with_params(base_url, &[("version", version)])
        .map_err(|e| Error::Download(format!("invalid schema URL {base_url}: {e}")))
}

/// Fetch one OCSF version from the export API and cache it at `output_path`.
///
/// The body must parse as an [`OcsfSchema`]; nothing is written otherwise.
#[cfg(feature = "download")]
pub async fn download_schema(version: &str, output_path: &Path, base_url: &str) -> Result<()> {
    let url = export_url(base_url, version)?;
    tracing::info!(%url, version, "fetching OCSF schema");

    let body = reqwest::Client::new()
        .get(url.clone())
        .send()
        .await
        .and_then(reqwest::Response::error_for_status)
        .map_err(|e| Error::Download(format!("GET {url}: {e}")))?
        .text()
        .await
        .map_err(|e| Error::Download(format!("body of {url}: {e}")))?;

    let schema = parse_schema(&body, url.as_str())?;
    save_schema(output_path, &body)?;

    tracing::info!(
        version = %schema.version,
        classes = schema.classes.len(),
        objects = schema.objects.len(),
        path = %output_path.display(),
        "cached OCSF schema"
    );
    Ok(())
}

/// Write a schema body, creating missing parent directories.
#[cfg(feature = "download")]
fn save_schema(path: &Path, body: &str) -> Result<()> {
    let write_err = |path: &Path| {
        let path = path.to_path_buf();
        move |source: std::io::Error| Error::Write { path, source }
    };
    if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
        std::fs::create_dir_all(dir).map_err(write_err(dir))?;
    }
    std::fs::write(path, body).map_err(write_err(path))
}
