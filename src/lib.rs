//! Convert OCSF schemas into data contracts, and data contracts into Iceberg DDL.
//!
//! `ocsf-datacontract` reads an [OCSF](https://schema.ocsf.io/) (Open
//! Cybersecurity Schema Framework) schema document and imports its event
//! classes as data contract models, with every referenced object collected
//! into the contract's shared `definitions`.
//!
//! # Features
//!
//! - One model per OCSF class, fields in document order
//! - Object inheritance (`extends`) resolved with a shallow, per-key override
//! - Object references kept as `$ref`s and resolved transitively, once each
//! - Self- and mutually-referencing objects terminate
//! - Deprecated attributes skipped with a warning
//! - Enum keys, requirement levels, groups, and profiles carried as
//!   `enum`, `required`, and `tags`
//! - Iceberg `CREATE TABLE` export of any contract
//!
//! # Usage
//!
//! ```no_run
//! use std::path::Path;
//!
//! use ocsf_datacontract::contract::DataContract;
//! use ocsf_datacontract::importer::OcsfImporter;
//!
//! let importer = OcsfImporter::from_path(Path::new("schema.json"))?;
//! let mut contract = DataContract::new("urn:ocsf:authentication", "Authentication");
//! let report = importer.import(&mut contract, Some(&["authentication".to_string()]))?;
//! eprintln!(
//!     "Imported {} models, {} definitions",
//!     report.models_imported, report.definitions_collected
//! );
//! print!("{}", contract.to_yaml()?);
//! # Ok::<(), ocsf_datacontract::error::Error>(())
//! ```

pub mod contract;
pub mod error;
pub mod fields;
pub mod iceberg;
pub mod importer;
pub mod resolver;
pub mod schema;
pub mod type_map;
