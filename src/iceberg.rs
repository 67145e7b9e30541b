//! Export of data contract models as Iceberg `CREATE TABLE` DDL.
//!
//! Each model becomes one statement. Field ids are assigned depth-first by a
//! [`SchemaBuilder`] and keep counting across the models of one export, so
//! two exports of the same contract produce identical ids.
//!
//! # Type Mapping Table
//!
//! | Contract type | Iceberg type |
//! |---------------|--------------|
//! | *(absent)*, `null` | `null` |
//! | `array` | `array<items>` |
//! | `object`, `record`, `struct` | `struct<...>` |
//! | `string`, `varchar`, `text` | `string` |
//! | `number`, `decimal`, `numeric` | `decimal(38, 18)` |
//! | `integer`, `int` | `int` |
//! | `long` | `long` |
//! | `float` | `float` |
//! | `double` | `double` |
//! | `boolean` | `boolean` |
//! | `timestamp`, `timestamp_tz` | `timestamp` |
//! | `timestamp_ntz` | `timestamp_ntz` |
//! | `date` | `date` |
//! | `bytes`, anything else | `binary` |
//!
//! Objects without inline `fields` are expanded from the `$ref`ed
//! definition. An object that cannot be expanded (missing definition, or a
//! definition that contains itself) is emitted as `string`.

use std::fmt;

use indexmap::IndexMap;
use tracing::warn;

use crate::contract::{DataContract, Definition, Field, Model};
use crate::error::{Error, Result};

pub const DECIMAL_PRECISION: u32 = 38;
pub const DECIMAL_SCALE: u32 = 18;

#[derive(Debug, Clone, PartialEq)]
pub enum IcebergType {
    Null,
    String,
    Decimal { precision: u32, scale: u32 },
    Int,
    Long,
    Float,
    Double,
    Boolean,
    Timestamp,
    TimestampNtz,
    Date,
    Binary,
    List {
        element_id: u32,
        element: Box<IcebergType>,
    },
    Struct(StructType),
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct StructType {
    pub fields: Vec<NestedField>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NestedField {
    pub id: u32,
    pub name: String,
    pub field_type: IcebergType,
    pub required: bool,
}

impl fmt::Display for IcebergType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IcebergType::Null => f.write_str("null"),
            IcebergType::String => f.write_str("string"),
            IcebergType::Decimal { precision, scale } => write!(f, "decimal({precision}, {scale})"),
            IcebergType::Int => f.write_str("int"),
            IcebergType::Long => f.write_str("long"),
            IcebergType::Float => f.write_str("float"),
            IcebergType::Double => f.write_str("double"),
            IcebergType::Boolean => f.write_str("boolean"),
            IcebergType::Timestamp => f.write_str("timestamp"),
            IcebergType::TimestampNtz => f.write_str("timestamp_ntz"),
            IcebergType::Date => f.write_str("date"),
            IcebergType::Binary => f.write_str("binary"),
            IcebergType::List { element, .. } => write!(f, "array<{element}>"),
            IcebergType::Struct(inner) => write!(f, "struct<{inner}>"),
        }
    }
}

/// Renders as the column list of a `CREATE TABLE` statement: one field per
/// line, indented, with nested structs indented one more level.
impl fmt::Display for StructType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let columns: Vec<String> = self
            .fields
            .iter()
            .map(|field| indent(&format!("{} {}", field.name, field.field_type)))
            .collect();
        write!(f, "\n{}\n", columns.join(",\n"))
    }
}

fn indent(text: &str) -> String {
    text.split('\n')
        .map(|line| format!("    {line}"))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Options for the generated DDL.
#[derive(Debug, Clone, Default)]
pub struct IcebergOptions {
    /// Partition expressions, e.g. `day(time)`.
    pub partitions: Vec<String>,
    pub location: Option<String>,
}

/// Builds Iceberg schemas, numbering fields as it goes.
pub struct SchemaBuilder<'a> {
    definitions: &'a IndexMap<String, Definition>,
    last_id: u32,
    expanding: Vec<&'a str>,
}

impl<'a> SchemaBuilder<'a> {
    pub fn new(definitions: &'a IndexMap<String, Definition>) -> Self {
        Self {
            definitions,
            last_id: 0,
            expanding: Vec::new(),
        }
    }

    /// Highest field id assigned so far.
    pub fn last_field_id(&self) -> u32 {
        self.last_id
    }

    pub fn model_schema(&mut self, model: &'a Model) -> StructType {
        self.struct_type(model.fields.iter())
    }

    fn next_id(&mut self) -> u32 {
        self.last_id += 1;
        self.last_id
    }

    fn struct_type(&mut self, fields: impl Iterator<Item = (&'a String, &'a Field)>) -> StructType {
        StructType {
            fields: fields
                .map(|(name, field)| self.nested_field(name, field))
                .collect(),
        }
    }

    fn nested_field(&mut self, name: &str, field: &'a Field) -> NestedField {
        let id = self.next_id();
        NestedField {
            id,
            name: name.to_string(),
            field_type: self.field_type(field),
            required: field.is_required(),
        }
    }

    fn field_type(&mut self, field: &'a Field) -> IcebergType {
        let Some(field_type) = field.field_type.as_deref() else {
            return IcebergType::Null;
        };
        match field_type {
            "null" => IcebergType::Null,
            "array" => {
                let element_id = self.next_id();
                let element = match field.items.as_deref() {
                    Some(items) => self.field_type(items),
                    None => IcebergType::Null,
                };
                IcebergType::List {
                    element_id,
                    element: Box::new(element),
                }
            }
            "object" | "record" | "struct" => self.object_type(field),
            "string" | "varchar" | "text" => IcebergType::String,
            "number" | "decimal" | "numeric" => IcebergType::Decimal {
                precision: DECIMAL_PRECISION,
                scale: DECIMAL_SCALE,
            },
            "integer" | "int" => IcebergType::Int,
            "long" => IcebergType::Long,
            "float" => IcebergType::Float,
            "double" => IcebergType::Double,
            "boolean" => IcebergType::Boolean,
            "timestamp" | "timestamp_tz" => IcebergType::Timestamp,
            "timestamp_ntz" => IcebergType::TimestampNtz,
            "date" => IcebergType::Date,
            _ => IcebergType::Binary,
        }
    }

    fn object_type(&mut self, field: &'a Field) -> IcebergType {
        if let Some(fields) = &field.fields {
            return IcebergType::Struct(self.struct_type(fields.iter()));
        }

        let Some(name) = field.definition_name() else {
            return IcebergType::Struct(StructType::default());
        };
        if self.expanding.contains(&name) {
            warn!(definition = name, "recursive definition, emitting string");
            return IcebergType::String;
        }
        let definitions = self.definitions;
        let Some(definition) = definitions.get(name) else {
            warn!(definition = name, "definition not found, emitting string");
            return IcebergType::String;
        };

        self.expanding.push(name);
        let inner = self.struct_type(definition.fields());
        self.expanding.pop();
        IcebergType::Struct(inner)
    }
}

/// Build the Iceberg schema of a single model, numbering fields from 1.
pub fn to_iceberg_schema(model: &Model, definitions: &IndexMap<String, Definition>) -> StructType {
    SchemaBuilder::new(definitions).model_schema(model)
}

/// Render every model of `contract` as an Iceberg `CREATE TABLE` statement.
///
/// Statements are separated by a blank line. A model without fields cannot
/// form a table and fails the export.
pub fn to_iceberg(contract: &DataContract, options: &IcebergOptions) -> Result<String> {
    let mut builder = SchemaBuilder::new(&contract.definitions);
    let mut ddl = Vec::with_capacity(contract.models.len());

    for (model_name, model) in &contract.models {
        if model.fields.is_empty() {
            return Err(Error::Export(format!("model '{model_name}' has no fields")));
        }
        let schema = builder.model_schema(model);

        let mut parts = vec![format!("CREATE TABLE \"{model_name}\" ({schema})")];
        if !options.partitions.is_empty() {
            parts.push(format!("PARTITIONED BY ({})", options.partitions.join(", ")));
        }
        if let Some(location) = &options.location {
            parts.push(format!("LOCATION '{location}'"));
        }
        parts.push("TBLPROPERTIES ( 'table_type' = 'ICEBERG' )".to_string());
        ddl.push(parts.join(" "));
    }

    Ok(ddl.join("\n\n"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scalar(field_type: &str) -> Field {
        Field {
            field_type: Some(field_type.to_string()),
            ..Field::default()
        }
    }

    fn model(fields: Vec<(&str, Field)>) -> Model {
        Model {
            fields: fields
                .into_iter()
                .map(|(name, field)| (name.to_string(), field))
                .collect(),
            ..Model::default()
        }
    }

    #[test]
    fn scalar_type_mapping() {
        let cases = [
            ("string", "string"),
            ("text", "string"),
            ("numeric", "decimal(38, 18)"),
            ("int", "int"),
            ("integer", "int"),
            ("long", "long"),
            ("float", "float"),
            ("double", "double"),
            ("boolean", "boolean"),
            ("timestamp_tz", "timestamp"),
            ("timestamp_ntz", "timestamp_ntz"),
            ("date", "date"),
            ("bytes", "binary"),
            ("uuid", "binary"),
        ];
        let fields: Vec<Field> = cases.iter().map(|(t, _)| scalar(t)).collect();
        let untyped = Field::default();
        let definitions = IndexMap::new();
        let mut builder = SchemaBuilder::new(&definitions);
        for ((contract_type, expected), field) in cases.iter().zip(&fields) {
            assert_eq!(
                builder.field_type(field).to_string(),
                *expected,
                "for {contract_type}"
            );
        }
        assert_eq!(builder.field_type(&untyped), IcebergType::Null);
    }

    #[test]
    fn field_ids_are_depth_first() {
        let nested = Field {
            field_type: Some("object".to_string()),
            fields: Some(
                [("inner".to_string(), scalar("string"))]
                    .into_iter()
                    .collect(),
            ),
            ..Field::default()
        };
        let m = model(vec![
            ("a", scalar("long")),
            ("b", nested),
            ("c", Field::array_of(scalar("int"))),
        ]);
        let definitions = IndexMap::new();
        let schema = to_iceberg_schema(&m, &definitions);

        let ids: Vec<u32> = schema.fields.iter().map(|f| f.id).collect();
        assert_eq!(ids, [1, 2, 4]);
        let IcebergType::Struct(inner) = &schema.fields[1].field_type else {
            panic!("expected struct");
        };
        assert_eq!(inner.fields[0].id, 3);
        assert_eq!(
            schema.fields[2].field_type,
            IcebergType::List {
                element_id: 5,
                element: Box::new(IcebergType::Int)
            }
        );
    }

    #[test]
    fn references_expand_from_definitions() {
        let mut definitions = IndexMap::new();
        definitions.insert(
            "node".to_string(),
            Definition {
                fields: Some(
                    [
                        ("name".to_string(), scalar("string")),
                        ("parent".to_string(), Field::reference_to("node")),
                    ]
                    .into_iter()
                    .collect(),
                ),
                ..Definition::default()
            },
        );
        let m = model(vec![
            ("node", Field::reference_to("node")),
            ("ghost", Field::reference_to("ghost")),
        ]);
        let schema = to_iceberg_schema(&m, &definitions);

        assert_eq!(
            schema.fields[0].field_type.to_string(),
            "struct<\n    name string,\n    parent string\n>"
        );
        assert_eq!(schema.fields[1].field_type, IcebergType::String);
    }

    #[test]
    fn ddl_statement_layout() {
        let mut contract = DataContract::default();
        contract.models.insert(
            "events".to_string(),
            model(vec![
                (
                    "time",
                    Field {
                        required: Some(true),
                        ..scalar("long")
                    },
                ),
                ("tags", Field::array_of(scalar("string"))),
            ]),
        );
        let ddl = to_iceberg(&contract, &IcebergOptions::default()).unwrap();
        assert_eq!(
            ddl,
            "CREATE TABLE \"events\" (\n    time long,\n    tags array<string>\n) \
             TBLPROPERTIES ( 'table_type' = 'ICEBERG' )"
        );
    }

    #[test]
    fn ddl_with_partitions_and_location() {
        let mut contract = DataContract::default();
        contract
            .models
            .insert("a".to_string(), model(vec![("x", scalar("int"))]));
        contract
            .models
            .insert("b".to_string(), model(vec![("y", scalar("int"))]));
        let options = IcebergOptions {
            partitions: vec!["x".to_string(), "day(ts)".to_string()],
            location: Some("s3://bucket/a".to_string()),
        };
        let ddl = to_iceberg(&contract, &options).unwrap();

        let statements: Vec<&str> = ddl.split("\n\n").collect();
        assert_eq!(statements.len(), 2);
        assert!(statements[0].contains(") PARTITIONED BY (x, day(ts)) LOCATION 's3://bucket/a' TBLPROPERTIES"));
        assert!(statements[1].starts_with("CREATE TABLE \"b\""));
    }

    #[test]
    fn model_without_fields_is_rejected() {
        let mut contract = DataContract::default();
        contract.models.insert("empty".to_string(), Model::default());
        let err = to_iceberg(&contract, &IcebergOptions::default()).unwrap_err();
        assert_eq!(err.category(), "export");
        assert!(err.to_string().contains("empty"));
    }
}
