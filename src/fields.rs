//! Translation of OCSF attributes into contract fields.

use std::fmt;

use indexmap::IndexMap;
use once_cell::sync::Lazy;
use regex::Regex;

use crate::contract::Field;
use crate::resolver::Resolver;
use crate::schema::OcsfAttribute;

/// Attribute name OCSF uses to splice in profile files.
pub const INCLUDE_MARKER: &str = "$include";

/// Requirement level that marks a field as required.
pub const REQUIRED: &str = "required";

static HTML_CODE: Lazy<Regex> = Lazy::new(|| Regex::new(r"</?code>").expect("valid regex"));
static HTML_TAG: Lazy<Regex> = Lazy::new(|| Regex::new(r"<[^>]+>").expect("valid regex"));

/// Strip HTML from an OCSF description, turning `<code>` spans into
/// backtick-quoted text.
pub fn clean_html(html: &str) -> String {
    let text = HTML_CODE.replace_all(html, "`");
    HTML_TAG.replace_all(&text, "").into_owned()
}

/// Outcome of translating one attribute.
#[derive(Debug, Clone, PartialEq)]
pub enum Translation {
    Field(Field),
    Skipped(SkipReason),
}

/// Why an attribute produced no field.
#[derive(Debug, Clone, PartialEq)]
pub enum SkipReason {
    Deprecated { message: Option<String> },
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkipReason::Deprecated { message: Some(message) } => {
                write!(f, "is deprecated ({message})")
            }
            SkipReason::Deprecated { message: None } => write!(f, "is deprecated"),
        }
    }
}

impl Resolver<'_> {
    /// Translate one attribute into a contract field.
    ///
    /// Object-typed attributes become `$ref`s into the shared definitions;
    /// the referenced object itself is resolved later, when definitions are
    /// collected.
    pub fn translate_attribute(&mut self, name: &str, attr: &OcsfAttribute) -> Translation {
        let mut field = Field {
            title: Some(attr.caption.clone().unwrap_or_else(|| name.to_string())),
            description: attr.description.as_deref().map(clean_html),
            ..Field::default()
        };

        if attr.is_deprecated() {
            return Translation::Skipped(SkipReason::Deprecated {
                message: attr.deprecation.as_ref().map(|d| d.message.clone()),
            });
        }

        if name == INCLUDE_MARKER {
            self.warn(format!(
                "not handling `{INCLUDE_MARKER}`, emitting {name} without a type"
            ));
            self.report.includes_unhandled += 1;
            return Translation::Field(field);
        }

        // The profile tag is gated on `group`, not on `profile` alone.
        if let Some(group) = &attr.group {
            field.tags.push(group.clone());
            if let Some(profile) = &attr.profile {
                field.tags.push(format!("profile:{profile}"));
            }
        }

        if let Some(observable) = attr.observable.filter(|id| *id != 0) {
            field.observable = Some(observable);
        }

        let base = match &attr.object_type {
            Some(object_type) => Field::reference_to(object_type),
            None => self.scalar_type(attr.type_name.as_deref()).to_field(),
        };
        let base = if attr.is_array {
            Field::array_of(base)
        } else {
            base
        };

        // Title, description, and tags always come from the attribute.
        let mut field = Field {
            title: field.title,
            description: field.description,
            tags: field.tags,
            observable: field.observable.or(base.observable),
            ..base
        };

        if let Some(values) = attr.enum_values.as_ref().filter(|v| !v.is_empty()) {
            field.enum_values = Some(values.keys().cloned().collect());
        }

        match attr.requirement.as_deref() {
            Some(REQUIRED) => field.required = Some(true),
            Some(level) if !level.is_empty() => field.tags.push(level.to_string()),
            _ => {}
        }

        Translation::Field(field)
    }

    /// Translate an attribute map, dropping deprecated attributes with a
    /// warning.
    pub fn translate_attributes(
        &mut self,
        attributes: &IndexMap<String, OcsfAttribute>,
    ) -> IndexMap<String, Field> {
        let mut fields = IndexMap::with_capacity(attributes.len());
        for (name, attr) in attributes {
            match self.translate_attribute(name, attr) {
                Translation::Field(field) => {
                    fields.insert(name.clone(), field);
                }
                Translation::Skipped(reason) => {
                    self.warn(format!("{name}: {reason}, skipping"));
                    self.report.deprecated_fields_skipped += 1;
                }
            }
        }
        fields
    }
}
