//! Import of OCSF classes into a data contract.
//!
//! Each selected class becomes one model. Object-typed attributes are kept
//! as `$ref`s; once all models are built, every reachable object is
//! resolved into the contract's shared `definitions`.

use std::path::Path;

use indexmap::IndexMap;
use tracing::{debug, info};

use crate::contract::{DEFAULT_MODEL_TYPE, DataContract, Definition, Field, Model};
use crate::error::{Error, Result};
use crate::fields::clean_html;
use crate::resolver::Resolver;
use crate::schema::{OcsfClass, OcsfSchema, load_schema};

/// Counters and warnings collected during one import.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct ImportReport {
    pub models_imported: usize,
    pub definitions_collected: usize,
    pub deprecated_fields_skipped: usize,
    pub includes_unhandled: usize,
    pub missing_objects: usize,
    /// Every recoverable anomaly, in the order it was met.
    pub warnings: Vec<String>,
}

/// Imports classes from one OCSF schema document.
///
/// The document is held immutably; every [`OcsfImporter::import`] call gets
/// its own resolution caches.
#[derive(Debug, Clone)]
pub struct OcsfImporter {
    schema: OcsfSchema,
}

impl OcsfImporter {
    /// Wrap a schema, adding the built-in objects it may lack.
    pub fn new(schema: OcsfSchema) -> Self {
        Self {
            schema: schema.with_internal_objects(),
        }
    }

    /// Load the schema document at `path`.
    pub fn from_path(path: &Path) -> Result<Self> {
        Ok(Self::new(load_schema(path)?))
    }

    pub fn schema(&self) -> &OcsfSchema {
        &self.schema
    }

    /// Import classes into `contract`.
    ///
    /// `classes` selects classes by name (hyphens and underscores are
    /// interchangeable); `None` or an empty list imports every class. An
    /// unknown class name fails the whole import before anything is added.
    ///
    /// Models are inserted under their document key, replacing any model of
    /// the same name. The definitions reachable from all of the contract's
    /// models are added to `contract.definitions`.
    pub fn import(
        &self,
        contract: &mut DataContract,
        classes: Option<&[String]>,
    ) -> Result<ImportReport> {
        let selected = self.select_classes(classes)?;
        let mut resolver = Resolver::new(&self.schema);

        for (key, class) in selected {
            let model = import_class(&mut resolver, key, class);
            debug!(class = key, fields = model.fields.len(), "imported class");
            contract.models.insert(key.to_string(), model);
            resolver.report.models_imported += 1;
        }

        let mut definitions = IndexMap::new();
        for model in contract.models.values() {
            collect_definitions(&mut resolver, model.fields.values(), &mut definitions);
        }
        resolver.report.definitions_collected = definitions.len();
        contract.definitions.extend(definitions);

        let report = resolver.into_report();
        info!(
            models = report.models_imported,
            definitions = report.definitions_collected,
            warnings = report.warnings.len(),
            "OCSF import finished"
        );
        Ok(report)
    }

    fn select_classes(&self, requested: Option<&[String]>) -> Result<Vec<(&str, &OcsfClass)>> {
        let classes = &self.schema.classes;
        let Some(requested) = requested.filter(|r| !r.is_empty()) else {
            return Ok(classes.iter().map(|(k, c)| (k.as_str(), c)).collect());
        };

        let mut selected: Vec<(&str, &OcsfClass)> = Vec::with_capacity(requested.len());
        for name in requested {
            let normalized = name.replace('-', "_");
            let found = classes.get_key_value(normalized.as_str()).or_else(|| {
                classes
                    .iter()
                    .find(|(key, _)| key.replace('-', "_") == normalized)
            });
            let Some((key, class)) = found else {
                return Err(class_not_found(name, classes.keys()));
            };
            // A class requested twice is imported once.
            if !selected.iter().any(|(k, _)| *k == key.as_str()) {
                selected.push((key.as_str(), class));
            }
        }
        Ok(selected)
    }
}

fn class_not_found<'a>(name: &str, keys: impl Iterator<Item = &'a String>) -> Error {
    let available: Vec<&str> = keys.map(String::as_str).collect();
    Error::ClassNotFound {
        name: name.to_string(),
        available: if available.len() > 10 {
            format!(
                "{} ... and {} more",
                available[..10].join(", "),
                available.len() - 10
            )
        } else {
            available.join(", ")
        },
    }
}

fn import_class(resolver: &mut Resolver<'_>, key: &str, class: &OcsfClass) -> Model {
    Model {
        title: Some(class.name.clone().unwrap_or_else(|| key.to_string())),
        description: class.description.as_deref().map(clean_html),
        model_type: Some(
            class
                .model_type
                .clone()
                .unwrap_or_else(|| DEFAULT_MODEL_TYPE.to_string()),
        ),
        fields: resolver.translate_attributes(&class.attributes),
    }
}

/// Add every definition reachable from `fields` to `known`.
///
/// A name already in `known` is never resolved again, which also stops
/// self- and mutually-referencing objects. References inside array `items`
/// and inline `fields` are followed as well.
pub fn collect_definitions<'f>(
    resolver: &mut Resolver<'_>,
    fields: impl IntoIterator<Item = &'f Field>,
    known: &mut IndexMap<String, Definition>,
) {
    for field in fields {
        if let Some(name) = field.definition_name() {
            if !known.contains_key(name) {
                let definition = resolver.resolve_reference(name);
                known.insert(name.to_string(), Definition::clone(&definition));
                let inner: Vec<&Field> = definition.fields().map(|(_, f)| f).collect();
                collect_definitions(resolver, inner, known);
            }
        }
        if let Some(items) = &field.items {
            collect_definitions(resolver, vec![items.as_ref()], known);
        }
        if let Some(nested) = &field.fields {
            let inner: Vec<&Field> = nested.values().collect();
            collect_definitions(resolver, inner, known);
        }
    }
}
