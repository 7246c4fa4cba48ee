//! Runtime physical units for catalog and payload quantities.
//!
//! Catalog columns carry their units as free text (`[Rsun]`, `[W/m**2/um]`),
//! so units here are values rather than types: a symbol, a scale factor to
//! SI and a dimension vector over (length, mass, time, temperature, angle).

use std::fmt;

use log::warn;
use serde::{Deserialize, Serialize};

use crate::error::{PipelineError, Result};

const LENGTH: [i8; 5] = [1, 0, 0, 0, 0];
const MASS: [i8; 5] = [0, 1, 0, 0, 0];
const TIME: [i8; 5] = [0, 0, 1, 0, 0];
const TEMPERATURE: [i8; 5] = [0, 0, 0, 1, 0];
const ANGLE: [i8; 5] = [0, 0, 0, 0, 1];
const SOLID_ANGLE: [i8; 5] = [0, 0, 0, 0, 2];
const POWER: [i8; 5] = [2, 1, -3, 0, 0];
const ENERGY: [i8; 5] = [2, 1, -2, 0, 0];
const FORCE: [i8; 5] = [1, 1, -2, 0, 0];
const FREQUENCY: [i8; 5] = [0, 0, -1, 0, 0];
const NONE: [i8; 5] = [0; 5];

/// Named units: symbol, SI scale, dimension.
const NAMED_UNITS: &[(&str, f64, [i8; 5])] = &[
    // length
    ("m", 1.0, LENGTH),
    ("cm", 1e-2, LENGTH),
    ("mm", 1e-3, LENGTH),
    ("um", 1e-6, LENGTH),
    ("micron", 1e-6, LENGTH),
    ("nm", 1e-9, LENGTH),
    ("Angstrom", 1e-10, LENGTH),
    ("AA", 1e-10, LENGTH),
    ("km", 1e3, LENGTH),
    ("AU", 1.495_978_707e11, LENGTH),
    ("au", 1.495_978_707e11, LENGTH),
    ("pc", 3.085_677_581_491_367e16, LENGTH),
    ("lyr", 9.460_730_472_580_8e15, LENGTH),
    ("Rsun", 6.957e8, LENGTH),
    ("R_sun", 6.957e8, LENGTH),
    ("solRad", 6.957e8, LENGTH),
    ("Rjup", 7.1492e7, LENGTH),
    ("R_jup", 7.1492e7, LENGTH),
    ("jupiterRad", 7.1492e7, LENGTH),
    ("Rearth", 6.3781e6, LENGTH),
    ("R_earth", 6.3781e6, LENGTH),
    ("earthRad", 6.3781e6, LENGTH),
    // mass
    ("kg", 1.0, MASS),
    ("g", 1e-3, MASS),
    ("Msun", 1.988_409_870_698_051e30, MASS),
    ("M_sun", 1.988_409_870_698_051e30, MASS),
    ("solMass", 1.988_409_870_698_051e30, MASS),
    ("Mjup", 1.898_124_597_336_050_5e27, MASS),
    ("M_jup", 1.898_124_597_336_050_5e27, MASS),
    ("jupiterMass", 1.898_124_597_336_050_5e27, MASS),
    ("Mearth", 5.972_167_867_791_379e24, MASS),
    ("M_earth", 5.972_167_867_791_379e24, MASS),
    ("earthMass", 5.972_167_867_791_379e24, MASS),
    // time
    ("s", 1.0, TIME),
    ("min", 60.0, TIME),
    ("h", 3600.0, TIME),
    ("hr", 3600.0, TIME),
    ("d", 86_400.0, TIME),
    ("day", 86_400.0, TIME),
    ("yr", 3.155_76e7, TIME),
    ("year", 3.155_76e7, TIME),
    // temperature
    ("K", 1.0, TEMPERATURE),
    // angle
    ("rad", 1.0, ANGLE),
    ("deg", std::f64::consts::PI / 180.0, ANGLE),
    ("arcmin", std::f64::consts::PI / 10_800.0, ANGLE),
    ("arcsec", std::f64::consts::PI / 648_000.0, ANGLE),
    ("sr", 1.0, SOLID_ANGLE),
    // derived
    ("W", 1.0, POWER),
    ("J", 1.0, ENERGY),
    ("erg", 1e-7, ENERGY),
    ("N", 1.0, FORCE),
    ("Hz", 1.0, FREQUENCY),
    ("Lsun", 3.828e26, POWER),
    ("L_sun", 3.828e26, POWER),
    ("solLum", 3.828e26, POWER),
    // counting units
    ("ct", 1.0, NONE),
    ("count", 1.0, NONE),
    ("ph", 1.0, NONE),
    ("photon", 1.0, NONE),
    ("electron", 1.0, NONE),
    ("mag", 1.0, NONE),
];

const PREFIXES: &[(&str, f64)] = &[
    ("G", 1e9),
    ("M", 1e6),
    ("k", 1e3),
    ("c", 1e-2),
    ("m", 1e-3),
    ("u", 1e-6),
    ("n", 1e-9),
    ("p", 1e-12),
];

const PREFIXABLE: &[&str] = &["m", "g", "s", "W", "J", "Hz", "N"];

// ---------------------------------------------------------------------------
// Unit
// ---------------------------------------------------------------------------

/// A parsed physical unit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Unit {
    symbol: String,
    scale: f64,
    dimension: [i8; 5],
}

impl Unit {
    pub fn dimensionless() -> Self {
        Unit {
            symbol: String::new(),
            scale: 1.0,
            dimension: NONE,
        }
    }

    /// Strict parse: empty input is dimensionless, anything unknown is an error.
    pub fn parse(raw: &str) -> Result<Self> {
        match classify_unit(raw) {
            UnitParse::Empty => Ok(Unit::dimensionless()),
            UnitParse::Parsed(unit) => Ok(unit),
            UnitParse::Unrecognised => Err(PipelineError::UnrecognisedUnit(raw.to_string())),
        }
    }

    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    /// Factor converting one of this unit into SI base units.
    pub fn scale(&self) -> f64 {
        self.scale
    }

    pub fn is_dimensionless(&self) -> bool {
        self.dimension == NONE && self.scale == 1.0
    }

    pub fn is_compatible(&self, other: &Unit) -> bool {
        self.dimension == other.dimension
    }

    /// Attach this unit to a raw value.
    pub fn quantity(&self, value: f64) -> Quantity {
        Quantity::new(value, self.clone())
    }
}

impl fmt::Display for Unit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.symbol)
    }
}

impl TryFrom<String> for Unit {
    type Error = PipelineError;

    fn try_from(symbol: String) -> Result<Self> {
        Unit::parse(&symbol)
    }
}

impl From<Unit> for String {
    fn from(unit: Unit) -> Self {
        unit.symbol
    }
}

// ---------------------------------------------------------------------------
// Parsing
// ---------------------------------------------------------------------------

/// Outcome of looking at a unit annotation.
#[derive(Debug, Clone, PartialEq)]
pub enum UnitParse {
    Empty,
    Parsed(Unit),
    Unrecognised,
}

/// Remove the square brackets catalogs wrap unit annotations in.
pub fn strip_unit_brackets(raw: &str) -> String {
    raw.replace(['[', ']'], "")
}

/// Classify a unit string without logging.
pub fn classify_unit(raw: &str) -> UnitParse {
    let text = raw.trim();
    if text.is_empty() {
        return UnitParse::Empty;
    }
    match parse_expression(text) {
        Some((scale, dimension)) => UnitParse::Parsed(Unit {
            symbol: text.to_string(),
            scale,
            dimension,
        }),
        None => UnitParse::Unrecognised,
    }
}

/// Lenient parse used during ingestion: never fails, warns on garbage.
pub fn parse_unit(raw: &str) -> Unit {
    match classify_unit(raw) {
        UnitParse::Parsed(unit) => unit,
        UnitParse::Empty => Unit::dimensionless(),
        UnitParse::Unrecognised => {
            warn!("Unrecognised physical units: '{raw}'");
            Unit::dimensionless()
        }
    }
}

fn lookup(name: &str) -> Option<(f64, [i8; 5])> {
    if let Some((_, scale, dim)) = NAMED_UNITS.iter().find(|(sym, _, _)| *sym == name) {
        return Some((*scale, *dim));
    }
    PREFIXES.iter().find_map(|(prefix, factor)| {
        let base = name.strip_prefix(prefix)?;
        if !PREFIXABLE.contains(&base) {
            return None;
        }
        NAMED_UNITS
            .iter()
            .find(|(sym, _, _)| *sym == base)
            .map(|(_, scale, dim)| (factor * scale, *dim))
    })
}

/// Parse products, quotients and integer powers of named units,
/// e.g. `W/m**2/um`, `cm s-2`, `erg s^-1 cm^-2`.
fn parse_expression(text: &str) -> Option<(f64, [i8; 5])> {
    let chars: Vec<char> = text.chars().collect();
    let mut i = 0;
    let mut scale = 1.0;
    let mut dimension = NONE;
    let mut divide = false;
    let mut factors = 0;

    while i < chars.len() {
        let c = chars[i];
        if c.is_whitespace() || c == '.' {
            i += 1;
            continue;
        }
        if c == '*' {
            i += 1;
            continue;
        }
        if c == '/' {
            if divide {
                return None;
            }
            divide = true;
            i += 1;
            continue;
        }
        if !(c.is_ascii_alphabetic() || c == '_') {
            return None;
        }

        let start = i;
        while i < chars.len() && (chars[i].is_ascii_alphabetic() || chars[i] == '_') {
            i += 1;
        }
        let name: String = chars[start..i].iter().collect();
        let (unit_scale, unit_dim) = lookup(&name)?;

        // optional power: `**2`, `^2`, or a bare `2` / `-1`
        if i + 1 < chars.len() && chars[i] == '*' && chars[i + 1] == '*' {
            i += 2;
        } else if i < chars.len() && chars[i] == '^' {
            i += 1;
        }
        let power_start = i;
        if i < chars.len() && (chars[i] == '-' || chars[i] == '+') {
            i += 1;
        }
        while i < chars.len() && chars[i].is_ascii_digit() {
            i += 1;
        }
        let power_text: String = chars[power_start..i].iter().collect();
        let mut power: i32 = if power_text.is_empty() {
            1
        } else {
            power_text.parse().ok()?
        };
        if divide {
            power = power.checked_neg()?;
            divide = false;
        }

        scale *= unit_scale.powi(power);
        for (acc, d) in dimension.iter_mut().zip(unit_dim) {
            let step = i32::from(d).checked_mul(power)?;
            *acc = acc.checked_add(i8::try_from(step).ok()?)?;
        }
        factors += 1;
    }

    if divide || factors == 0 {
        return None;
    }
    Some((scale, dimension))
}

// ---------------------------------------------------------------------------
// Quantity
// ---------------------------------------------------------------------------

/// A numeric value paired with a unit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Quantity {
    pub value: f64,
    pub unit: Unit,
}

impl Quantity {
    pub fn new(value: f64, unit: Unit) -> Self {
        Quantity { value, unit }
    }

    pub fn dimensionless(value: f64) -> Self {
        Quantity::new(value, Unit::dimensionless())
    }

    /// Value expressed in SI base units.
    pub fn si(&self) -> f64 {
        self.value * self.unit.scale
    }

    /// Convert to another compatible unit.
    pub fn to(&self, target: &Unit) -> Result<Quantity> {
        if !self.unit.is_compatible(target) {
            return Err(PipelineError::IncompatibleUnits {
                from: self.unit.symbol.clone(),
                to: target.symbol.clone(),
            });
        }
        Ok(Quantity::new(self.si() / target.scale, target.clone()))
    }

    /// Convert to the unit written as `symbol`.
    pub fn to_unit(&self, symbol: &str) -> Result<Quantity> {
        self.to(&Unit::parse(symbol)?)
    }
}

impl fmt::Display for Quantity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.unit.symbol.is_empty() {
            write!(f, "{}", self.value)
        } else {
            write!(f, "{} {}", self.value, self.unit.symbol)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_empty_is_dimensionless() {
        assert_eq!(classify_unit(""), UnitParse::Empty);
        assert_eq!(classify_unit("   "), UnitParse::Empty);
        assert!(parse_unit("").is_dimensionless());
    }

    #[test]
    fn test_garbage_degrades_to_dimensionless() {
        for raw in ["furlongs", "m//s", "kg^x", "/", "3", "(m)", "m**200", "s^-130", "W^2000000000"] {
            assert_eq!(classify_unit(raw), UnitParse::Unrecognised, "{raw}");
            assert!(parse_unit(raw).is_dimensionless());
        }
    }

    #[test]
    fn test_strict_parse_errors_on_garbage() {
        assert!(matches!(
            Unit::parse("bananas"),
            Err(PipelineError::UnrecognisedUnit(_))
        ));
    }

    #[test]
    fn test_bracket_stripping() {
        assert_eq!(strip_unit_brackets("[Rsun]"), "Rsun");
        assert_eq!(strip_unit_brackets("K"), "K");
    }

    #[test]
    fn test_compound_units() {
        let flux = parse_unit("W/m**2/um");
        assert_relative_eq!(flux.scale(), 1e6, max_relative = 1e-12);
        assert!(flux.is_compatible(&parse_unit("erg s^-1 cm-2 m-1")));

        let accel = parse_unit("cm s-2");
        assert_relative_eq!(accel.scale(), 1e-2, max_relative = 1e-12);
        assert!(accel.is_compatible(&parse_unit("m/s**2")));
    }

    #[test]
    fn test_prefixes() {
        assert_relative_eq!(parse_unit("ms").scale(), 1e-3);
        assert_relative_eq!(parse_unit("kW").scale(), 1e3);
        assert!(parse_unit("GHz").is_compatible(&parse_unit("Hz")));
    }

    #[test]
    fn test_round_trip_conversions() {
        let cases = [
            (1.0, "Rjup", "km"),
            (5700.0, "K", "K"),
            (0.55, "micron", "nm"),
            (1.3, "Msun", "Mjup"),
            (2.0, "AU", "pc"),
            (3.0, "deg", "arcsec"),
        ];
        for (value, from, to) in cases {
            let q = Quantity::new(value, parse_unit(from));
            let there = q.to_unit(to).unwrap();
            let back = there.to_unit(from).unwrap();
            assert_relative_eq!(back.value, value, max_relative = 1e-12);
        }
    }

    #[test]
    fn test_incompatible_conversion() {
        let q = Quantity::new(1.0, parse_unit("K"));
        assert!(matches!(
            q.to_unit("m"),
            Err(PipelineError::IncompatibleUnits { .. })
        ));
    }

    #[test]
    fn test_quantity_serde() {
        let q = Quantity::new(1.5, parse_unit("Rsun"));
        let json = serde_json::to_string(&q).unwrap();
        assert_eq!(json, r#"{"value":1.5,"unit":"Rsun"}"#);
        let back: Quantity = serde_json::from_str(&json).unwrap();
        assert_eq!(back, q);
    }
}
