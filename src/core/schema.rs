//! Source and target attribute tables.
//!
//! A schema maps every source variable of a soil product onto a target attribute
//! of the site format, together with both units and the number of decimals used
//! when the target value is written out.
use crate::core::units::Unit;
use crate::error::{Error, Result};

/// Attribute as named and stored by the source product
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SourceAttribute {
    pub name: &'static str,
    pub unit: Unit,
}

/// Attribute of the site format
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TargetAttribute {
    pub name: &'static str,
    pub long_name: &'static str,
    pub unit: Unit,
    /// Decimals used when serialising
    pub precision: usize,
}

/// Resolved mapping of one source attribute
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AttributeMapping {
    pub source: SourceAttribute,
    pub target: TargetAttribute,
}

#[derive(Debug)]
pub struct AttributeSchema {
    pub name: &'static str,
    sources: &'static [SourceAttribute],
    targets: &'static [TargetAttribute],
    mapping: &'static [(&'static str, &'static str)],
    mask_attributes: &'static [&'static str],
}

impl AttributeSchema {
    /// Target name, unit and precision of a source attribute
    pub fn lookup(&self, source_name: &str) -> Result<AttributeMapping> {
        let unknown = || Error::UnknownAttribute {
            name: source_name.to_string(),
        };
        let source = self
            .sources
            .iter()
            .find(|a| a.name == source_name)
            .ok_or_else(unknown)?;
        let target_name = self
            .mapping
            .iter()
            .find(|(s, _)| *s == source_name)
            .map(|(_, t)| *t)
            .ok_or_else(unknown)?;
        let target = self.target(target_name).ok_or_else(|| Error::UnknownAttribute {
            name: target_name.to_string(),
        })?;
        Ok(AttributeMapping {
            source: *source,
            target: *target,
        })
    }

    pub fn target(&self, name: &str) -> Option<&TargetAttribute> {
        self.targets.iter().find(|t| t.name == name)
    }

    /// Decimals of a target attribute, 2 for names the schema does not declare
    pub fn precision(&self, target_name: &str) -> usize {
        self.target(target_name).map_or(2, |t| t.precision)
    }

    pub fn sources(&self) -> &[SourceAttribute] {
        self.sources
    }

    pub fn is_source(&self, name: &str) -> bool {
        self.sources.iter().any(|a| a.name == name)
    }

    /// Target names reachable from the source table
    pub fn mapped_targets(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.mapping.iter().map(|(_, t)| *t)
    }

    /// Source attributes scanned when building the layer validity mask
    pub fn mask_attributes(&self) -> &[&'static str] {
        self.mask_attributes
    }
}

const TARGETS: &[TargetAttribute] = &[
    TargetAttribute { name: "bd", long_name: "bulk density", unit: Unit::GramsPerCm3, precision: 2 },
    TargetAttribute { name: "depth", long_name: "layer depth", unit: Unit::Millimeter, precision: 0 },
    TargetAttribute { name: "split", long_name: "layer split", unit: Unit::Dimensionless, precision: 0 },
    TargetAttribute { name: "corg", long_name: "organic carbon", unit: Unit::Fraction, precision: 5 },
    TargetAttribute { name: "norg", long_name: "organic nitrogen", unit: Unit::Fraction, precision: 6 },
    TargetAttribute { name: "ph", long_name: "pH", unit: Unit::Dimensionless, precision: 2 },
    TargetAttribute { name: "clay", long_name: "clay fraction", unit: Unit::Fraction, precision: 2 },
    TargetAttribute { name: "sand", long_name: "sand fraction", unit: Unit::Fraction, precision: 2 },
    TargetAttribute { name: "silt", long_name: "silt fraction", unit: Unit::Fraction, precision: 2 },
    TargetAttribute { name: "sks", long_name: "saturated hydraulic conductivity", unit: Unit::Unknown, precision: 2 },
    TargetAttribute { name: "scel", long_name: "coarse fraction", unit: Unit::Fraction, precision: 2 },
    TargetAttribute { name: "wcmin", long_name: "wilting point", unit: Unit::Unknown, precision: 1 },
    TargetAttribute { name: "wcmax", long_name: "field capacity", unit: Unit::Unknown, precision: 1 },
    TargetAttribute { name: "iron", long_name: "iron fraction", unit: Unit::Fraction, precision: 5 },
    TargetAttribute { name: "topd", long_name: "layer top depth", unit: Unit::Centimeter, precision: 0 },
    TargetAttribute { name: "botd", long_name: "layer bottom depth", unit: Unit::Centimeter, precision: 0 },
];

/// ISRIC-WISE derived soil properties
pub static ISRIC_WISE: AttributeSchema = AttributeSchema {
    name: "ISRIC-WISE",
    sources: &[
        SourceAttribute { name: "BULK", unit: Unit::GramsPerCm3 },
        SourceAttribute { name: "PHAQ", unit: Unit::Dimensionless },
        SourceAttribute { name: "CLPC", unit: Unit::Percent },
        SourceAttribute { name: "SDTO", unit: Unit::Percent },
        SourceAttribute { name: "STPC", unit: Unit::Percent },
        SourceAttribute { name: "TOTC", unit: Unit::GramsPerKg },
        SourceAttribute { name: "TOTN", unit: Unit::GramsPerKg },
        SourceAttribute { name: "CFRAG", unit: Unit::Percent },
        SourceAttribute { name: "TopDep", unit: Unit::Centimeter },
        SourceAttribute { name: "BotDep", unit: Unit::Centimeter },
    ],
    targets: TARGETS,
    mapping: &[
        ("BULK", "bd"),
        ("PHAQ", "ph"),
        ("CLPC", "clay"),
        ("SDTO", "sand"),
        ("STPC", "silt"),
        ("TOTC", "corg"),
        ("TOTN", "norg"),
        ("CFRAG", "scel"),
        ("TopDep", "topd"),
        ("BotDep", "botd"),
    ],
    mask_attributes: &["PHAQ", "BULK", "CLPC", "TopDep"],
};
