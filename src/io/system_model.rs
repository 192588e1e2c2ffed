//! Self-describing JSON document holding a complete system.
//!
//! ```json
//! {
//!   "atomic-system": {
//!     "box": { "avect": [..], "bvect": [..], "cvect": [..], "origin": [..], "unit": "angstrom" },
//!     "periodic-boundary-condition": [true, true, true],
//!     "atom-type-symbol": ["Cu", null],
//!     "atoms": {
//!       "natoms": 2,
//!       "property": [ { "name": "pos", "unit": "angstrom", "data": [[..], [..]] } ]
//!     }
//!   }
//! }
//! ```

use super::error::Error;
use crate::model::atoms::{Atoms, POS, Property};
use crate::model::sim_box::SimBox;
use crate::model::system::System;
use crate::units;
use nalgebra::Vector3;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::io::{BufRead, Write};

const FORMAT: &str = "system_model";

/// Options for writing the document.
#[derive(Debug, Clone, PartialEq)]
pub struct SystemModelOptions {
    pub box_unit: String,
    /// Unit each named property is stored in; unlisted properties are stored as is.
    pub prop_units: BTreeMap<String, String>,
}

impl Default for SystemModelOptions {
    fn default() -> Self {
        Self {
            box_unit: "angstrom".to_string(),
            prop_units: BTreeMap::from([(POS.to_string(), "angstrom".to_string())]),
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct Document {
    #[serde(rename = "atomic-system")]
    system: SystemRecord,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
struct SystemRecord {
    #[serde(rename = "box")]
    sim_box: BoxRecord,
    periodic_boundary_condition: [bool; 3],
    #[serde(default)]
    atom_type_symbol: Vec<Option<String>>,
    atoms: AtomsRecord,
}

#[derive(Debug, Serialize, Deserialize)]
struct BoxRecord {
    avect: [f64; 3],
    bvect: [f64; 3],
    cvect: [f64; 3],
    origin: [f64; 3],
    #[serde(default, skip_serializing_if = "Option::is_none")]
    unit: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
struct AtomsRecord {
    natoms: usize,
    property: Vec<PropertyRecord>,
}

#[derive(Debug, Serialize, Deserialize)]
struct PropertyRecord {
    name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    unit: Option<String>,
    data: PropertyData,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(untagged)]
enum PropertyData {
    Integer(Vec<i64>),
    Scalar(Vec<f64>),
    Vector(Vec<[f64; 3]>),
}

fn to_array(v: &Vector3<f64>, scale: f64) -> [f64; 3] {
    [v.x / scale, v.y / scale, v.z / scale]
}

fn build_document(system: &System, options: &SystemModelOptions) -> Result<Document, Error> {
    let box_scale = units::scale_of(&options.box_unit)?;
    let sim_box = system.sim_box();

    let mut property = Vec::new();
    for (name, prop) in system.atoms().columns() {
        let unit = options.prop_units.get(name).cloned();
        let scale = units::optional_scale(unit.as_deref())?;
        let data = match prop {
            Property::Integer(values) => PropertyData::Integer(values.clone()),
            Property::Scalar(values) => {
                PropertyData::Scalar(values.iter().map(|v| v / scale).collect())
            }
            Property::Vector(values) => {
                PropertyData::Vector(values.iter().map(|v| to_array(v, scale)).collect())
            }
        };
        property.push(PropertyRecord {
            name: name.to_string(),
            unit: if matches!(prop, Property::Integer(_)) { None } else { unit },
            data,
        });
    }

    Ok(Document {
        system: SystemRecord {
            sim_box: BoxRecord {
                avect: to_array(&sim_box.avect(), box_scale),
                bvect: to_array(&sim_box.bvect(), box_scale),
                cvect: to_array(&sim_box.cvect(), box_scale),
                origin: to_array(&sim_box.origin(), box_scale),
                unit: Some(options.box_unit.clone()),
            },
            periodic_boundary_condition: system.pbc,
            atom_type_symbol: system
                .symbols()
                .iter()
                .map(|s| s.as_ref().map(|s| s.to_string()))
                .collect(),
            atoms: AtomsRecord {
                natoms: system.natoms(),
                property,
            },
        },
    })
}

pub fn write<W: Write>(
    mut writer: W,
    system: &System,
    options: &SystemModelOptions,
) -> Result<(), Error> {
    let document = build_document(system, options)?;
    let text = serde_json::to_string_pretty(&document)
        .map_err(|e| Error::inconsistent_data(FORMAT, None, e.to_string()))?;
    writeln!(writer, "{text}").map_err(|e| Error::from_io(e, None))?;

    tracing::debug!(natoms = system.natoms(), "wrote system model");
    Ok(())
}

pub fn read<R: BufRead>(reader: R) -> Result<System, Error> {
    let document: Document = serde_json::from_reader(reader).map_err(|e| {
        if e.is_io() {
            Error::from_io(e.into(), None)
        } else {
            Error::parse(FORMAT, None, e.line(), e.to_string())
        }
    })?;
    let record = document.system;

    let box_scale = units::optional_scale(record.sim_box.unit.as_deref())?;
    let vector = |v: [f64; 3]| Vector3::from(v) * box_scale;
    let sim_box = SimBox::from_vectors(
        vector(record.sim_box.avect),
        vector(record.sim_box.bvect),
        vector(record.sim_box.cvect),
        vector(record.sim_box.origin),
    )?;

    let natoms = record.atoms.natoms;
    let mut atoms = Atoms::new(natoms);
    for entry in record.atoms.property {
        let scale = units::optional_scale(entry.unit.as_deref())?;
        let property = match entry.data {
            // An empty list deserializes as integers; let the existing column decide.
            PropertyData::Integer(values) if values.is_empty() => match atoms.property(&entry.name) {
                Some(existing) if existing.is_empty() => continue,
                _ => Property::Integer(values),
            },
            PropertyData::Integer(values) => Property::Integer(values),
            PropertyData::Scalar(values) => {
                Property::Scalar(values.into_iter().map(|v| v * scale).collect())
            }
            PropertyData::Vector(values) => Property::Vector(
                values
                    .into_iter()
                    .map(|v| Vector3::from(v) * scale)
                    .collect(),
            ),
        };
        atoms.add_property(&entry.name, property)?;
    }

    let mut system = System::new(sim_box, atoms, record.periodic_boundary_condition);
    system.set_symbols(record.atom_type_symbol.iter().map(|s| s.as_deref()));

    tracing::debug!(natoms, "loaded system model");
    Ok(system)
}
