//! Object and scalar type resolution with per-import memoization.
//!
//! A [`Resolver`] borrows one schema and owns two name-keyed caches: scalar
//! types and fully merged objects. Names are only unique within a document,
//! so a resolver must never outlive the import it was created for.

use std::collections::{HashMap, HashSet};
use std::rc::Rc;

use tracing::{debug, warn};

use crate::contract::Definition;
use crate::fields::clean_html;
use crate::importer::ImportReport;
use crate::schema::OcsfSchema;
use crate::type_map::ScalarType;

pub struct Resolver<'a> {
    schema: &'a OcsfSchema,
    types: HashMap<String, Rc<ScalarType>>,
    objects: HashMap<String, Rc<Definition>>,
    /// Objects whose `extends` chain is currently being walked.
    in_progress: HashSet<String>,
    /// Referenced objects already reported as missing.
    missing: HashSet<String>,
    no_type: Rc<ScalarType>,
    no_base: Rc<Definition>,
    pub(crate) report: ImportReport,
}

impl<'a> Resolver<'a> {
    pub fn new(schema: &'a OcsfSchema) -> Self {
        Self {
            schema,
            types: HashMap::new(),
            objects: HashMap::new(),
            in_progress: HashSet::new(),
            missing: HashSet::new(),
            no_type: Rc::new(ScalarType::default()),
            no_base: Rc::new(Definition::default()),
            report: ImportReport::default(),
        }
    }

    pub fn schema(&self) -> &'a OcsfSchema {
        self.schema
    }

    /// Resolve a scalar type by name. `None` yields the empty descriptor.
    pub fn scalar_type(&mut self, name: Option<&str>) -> Rc<ScalarType> {
        let Some(name) = name else {
            return Rc::clone(&self.no_type);
        };
        if let Some(cached) = self.types.get(name) {
            return Rc::clone(cached);
        }
        let resolved = Rc::new(ScalarType::build(name, self.schema.types.get(name)));
        self.types.insert(name.to_string(), Rc::clone(&resolved));
        resolved
    }

    /// Resolve an object merged with its transitive base objects.
    ///
    /// `None` (no base) yields the empty descriptor, the identity for
    /// [`Definition::overlay`]. Each name is resolved at most once; later
    /// calls return the same cached instance.
    pub fn resolve_object(&mut self, name: Option<&str>) -> Rc<Definition> {
        let Some(name) = name else {
            return Rc::clone(&self.no_base);
        };
        if let Some(cached) = self.objects.get(name) {
            return Rc::clone(cached);
        }
        if self.in_progress.contains(name) {
            self.warn(format!(
                "object '{name}' extends itself through its base chain, ignoring the cycle"
            ));
            return Rc::clone(&self.no_base);
        }

        let schema = self.schema;
        let Some(obj) = schema.object(name) else {
            debug!(object = name, "object not in schema, treating as empty");
            let empty = Rc::clone(&self.no_base);
            self.objects.insert(name.to_string(), Rc::clone(&empty));
            return empty;
        };

        self.in_progress.insert(name.to_string());
        let base = self.resolve_object(obj.extends.as_deref());
        let own = Definition {
            name: Some(name.to_string()),
            title: obj.caption.clone(),
            description: obj.description.as_deref().map(clean_html),
            definition_type: Some("object".to_string()),
            fields: Some(self.translate_attributes(&obj.attributes)),
        };
        self.in_progress.remove(name);

        debug!(object = name, base = ?obj.extends, "resolved object");
        let merged = Rc::new(own.overlay(&base));
        self.objects.insert(name.to_string(), Rc::clone(&merged));
        merged
    }

    /// Resolve an object reached through a `$ref`, warning when the schema
    /// does not define it.
    pub fn resolve_reference(&mut self, name: &str) -> Rc<Definition> {
        if self.schema.object(name).is_none() && self.missing.insert(name.to_string()) {
            self.warn(format!(
                "object '{name}' referenced but not found in schema"
            ));
            self.report.missing_objects += 1;
        }
        self.resolve_object(Some(name))
    }

    pub(crate) fn warn(&mut self, message: String) {
        warn!("{message}");
        self.report.warnings.push(message);
    }

    pub fn into_report(self) -> ImportReport {
        self.report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::parse_schema;

    fn schema() -> OcsfSchema {
        parse_schema(
            r#"{
                "objects": {
                    "base": {
                        "caption": "Base",
                        "description": "The <b>base</b> object.",
                        "attributes": {
                            "a": {"type": "string_t"},
                            "b": {"type": "string_t"}
                        }
                    },
                    "derived": {
                        "extends": "base",
                        "attributes": {"c": {"type": "integer_t"}}
                    },
                    "loop_a": {"extends": "loop_b", "attributes": {"x": {}}},
                    "loop_b": {"extends": "loop_a", "attributes": {"y": {}}}
                },
                "types": {
                    "port_t": {"type": "integer_t"}
                }
            }"#,
            "test",
        )
        .unwrap()
    }

    #[test]
    fn derived_fields_replace_base_fields() {
        let schema = schema();
        let mut resolver = Resolver::new(&schema);
        let derived = resolver.resolve_object(Some("derived"));

        let fields: Vec<&str> = derived.fields().map(|(k, _)| k.as_str()).collect();
        assert_eq!(fields, ["c"]);
        assert_eq!(derived.name.as_deref(), Some("derived"));
        // Keys the derived object lacks come from the base.
        assert_eq!(derived.title.as_deref(), Some("Base"));
        assert_eq!(derived.description.as_deref(), Some("The base object."));
        assert_eq!(derived.definition_type.as_deref(), Some("object"));
    }

    #[test]
    fn objects_are_memoized() {
        let schema = schema();
        let mut resolver = Resolver::new(&schema);
        let first = resolver.resolve_object(Some("derived"));
        let second = resolver.resolve_object(Some("derived"));
        assert!(Rc::ptr_eq(&first, &second));

        let base_via_derived = resolver.resolve_object(Some("base"));
        let base_again = resolver.resolve_object(Some("base"));
        assert!(Rc::ptr_eq(&base_via_derived, &base_again));
    }

    #[test]
    fn no_base_is_empty() {
        let schema = schema();
        let mut resolver = Resolver::new(&schema);
        assert_eq!(*resolver.resolve_object(None), Definition::default());
    }

    #[test]
    fn extends_cycle_terminates_with_warning() {
        let schema = schema();
        let mut resolver = Resolver::new(&schema);
        let a = resolver.resolve_object(Some("loop_a"));

        let fields: Vec<&str> = a.fields().map(|(k, _)| k.as_str()).collect();
        assert_eq!(fields, ["x"]);
        assert_eq!(resolver.report.warnings.len(), 1);
        assert!(resolver.report.warnings[0].contains("loop_a"));
    }

    #[test]
    fn missing_base_ends_the_chain() {
        let schema = parse_schema(
            r#"{"objects": {"orphan": {"extends": "object", "attributes": {}}}}"#,
            "test",
        )
        .unwrap();
        let mut resolver = Resolver::new(&schema);
        let orphan = resolver.resolve_object(Some("orphan"));
        assert_eq!(orphan.name.as_deref(), Some("orphan"));
        assert!(resolver.report.warnings.is_empty());
    }

    #[test]
    fn missing_reference_warns_once() {
        let schema = schema();
        let mut resolver = Resolver::new(&schema);
        let ghost = resolver.resolve_reference("ghost");
        assert_eq!(*ghost, Definition::default());
        resolver.resolve_reference("ghost");
        assert_eq!(resolver.report.missing_objects, 1);
        assert_eq!(resolver.report.warnings.len(), 1);
    }

    #[test]
    fn missing_base_later_referenced_still_warns() {
        let schema = parse_schema(
            r#"{"objects": {"orphan": {"extends": "ghost", "attributes": {}}}}"#,
            "test",
        )
        .unwrap();
        let mut resolver = Resolver::new(&schema);
        resolver.resolve_object(Some("orphan"));
        assert!(resolver.report.warnings.is_empty());

        resolver.resolve_reference("ghost");
        resolver.resolve_reference("ghost");
        assert_eq!(resolver.report.missing_objects, 1);
        assert_eq!(resolver.report.warnings.len(), 1);
        assert!(resolver.report.warnings[0].contains("ghost"));
    }

    #[test]
    fn scalar_types_are_memoized() {
        let schema = schema();
        let mut resolver = Resolver::new(&schema);
        let first = resolver.scalar_type(Some("port_t"));
        let second = resolver.scalar_type(Some("port_t"));
        assert!(Rc::ptr_eq(&first, &second));
        assert_eq!(first.field_type, Some("integer"));

        assert_eq!(*resolver.scalar_type(None), ScalarType::default());
    }
}
