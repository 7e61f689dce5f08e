//! Physical units of source and target attributes and the closed conversion table
//! between them. Only direct pairs are supported, their inverses are derived.
use ndarray::{Array, ArrayBase, Data, Dimension};

use crate::error::{Error, Result};

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum Unit {
    Fraction,
    Percent,
    GramsPerKg,
    GramsPerCm3,
    Millimeter,
    Centimeter,
    Meter,
    Dimensionless,
    /// Unit not declared by the source
    Unknown,
}

impl Unit {
    pub fn label(self) -> &'static str {
        match self {
            Unit::Fraction => "fraction",
            Unit::Percent => "percent",
            Unit::GramsPerKg => "g kg-1",
            Unit::GramsPerCm3 => "g cm-3",
            Unit::Millimeter => "mm",
            Unit::Centimeter => "cm",
            Unit::Meter => "m",
            Unit::Dimensionless => "-",
            Unit::Unknown => "unknown",
        }
    }
}

impl std::fmt::Display for Unit {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

const CONVERSIONS: &[(Unit, Unit, f64)] = &[
    (Unit::Fraction, Unit::Percent, 100.0),
    (Unit::GramsPerKg, Unit::Percent, 0.1),
    (Unit::GramsPerKg, Unit::Fraction, 0.001),
    (Unit::Centimeter, Unit::Millimeter, 10.0),
    (Unit::Meter, Unit::Millimeter, 1000.0),
    (Unit::Meter, Unit::Centimeter, 100.0),
];

/// Multiplicative factor turning a value in `from` into a value in `to`
pub fn conversion_factor(from: Unit, to: Unit) -> Result<f64> {
    if from == to {
        return Ok(1.0);
    }
    for &(a, b, factor) in CONVERSIONS {
        if a == from && b == to {
            return Ok(factor);
        }
        if a == to && b == from {
            return Ok(1.0 / factor);
        }
    }
    Err(Error::UnsupportedConversion {
        from: from.to_string(),
        to: to.to_string(),
    })
}

pub fn convert(value: f64, from: Unit, to: Unit) -> Result<f64> {
    Ok(value * conversion_factor(from, to)?)
}

/// Converted copy of an array
pub fn convert_array<S, D>(data: &ArrayBase<S, D>, from: Unit, to: Unit) -> Result<Array<f64, D>>
where
    S: Data<Elem = f64>,
    D: Dimension,
{
    let factor = conversion_factor(from, to)?;
    Ok(data.mapv(|v| v * factor))
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn identity_is_exact_even_for_unknown_units() {
        assert_eq!(conversion_factor(Unit::Unknown, Unit::Unknown).unwrap(), 1.0);
        assert_eq!(convert(3.7, Unit::Percent, Unit::Percent).unwrap(), 3.7);
    }

    #[test]
    fn supported_pairs_are_symmetric() {
        for &(a, b, _) in CONVERSIONS {
            for x in [0.0, 0.37, 1.0, 12.5, 1234.5] {
                let back = convert(convert(x, a, b).unwrap(), b, a).unwrap();
                assert!((back - x).abs() < 1e-9, "{a} <-> {b}: {x} became {back}");
            }
        }
    }

    #[test]
    fn inverse_is_derived() {
        assert!((convert(35.0, Unit::Percent, Unit::Fraction).unwrap() - 0.35).abs() < 1e-12);
        assert_eq!(convert(12.0, Unit::Centimeter, Unit::Millimeter).unwrap(), 120.0);
        assert!((convert(8.0, Unit::GramsPerKg, Unit::Fraction).unwrap() - 0.008).abs() < 1e-12);
    }

    #[test]
    fn unsupported_pair_fails() {
        let err = convert(1.0, Unit::GramsPerCm3, Unit::Percent).unwrap_err();
        assert!(matches!(err, Error::UnsupportedConversion { .. }));
        assert!(err.to_string().contains("g cm-3"));
    }

    #[test]
    fn arrays_convert_elementwise() {
        let data = array![[10.0, 20.0], [30.0, -1.0]];
        let converted = convert_array(&data, Unit::Percent, Unit::Fraction).unwrap();
        let expected = array![[0.1, 0.2], [0.3, -0.01]];
        assert!(converted.iter().zip(expected.iter()).all(|(a, b)| (a - b).abs() < 1e-12));
        let depths = convert_array(&data, Unit::Centimeter, Unit::Millimeter).unwrap();
        assert_eq!(depths[[1, 0]], 300.0);
    }
}
