use std::fmt;

use serde::ser::SerializeMap;
use serde::{Deserialize, Serialize, Serializer};

use crate::error::Result;
use crate::units::{Quantity, Unit};

// ---------------------------------------------------------------------------
// CellValue – a raw cell from a worksheet or delimited file
// ---------------------------------------------------------------------------

/// A dynamically-typed raw cell, before any unit is attached.
#[derive(Debug, Clone, PartialEq)]
pub enum CellValue {
    String(String),
    Integer(i64),
    Float(f64),
    Bool(bool),
    Null,
}

impl CellValue {
    /// Guess the type of a text cell (delimited sources carry no types).
    pub fn guess(s: &str) -> Self {
        let s = s.trim();
        if s.is_empty() {
            return CellValue::Null;
        }
        if let Ok(i) = s.parse::<i64>() {
            return CellValue::Integer(i);
        }
        if let Ok(f) = s.parse::<f64>() {
            return CellValue::Float(f);
        }
        if s == "true" || s == "false" {
            return CellValue::Bool(s == "true");
        }
        CellValue::String(s.to_string())
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            CellValue::Float(v) => Some(*v),
            CellValue::Integer(i) => Some(*i as f64),
            _ => None,
        }
    }

    /// Header / unit cells are read as text whatever their stored type.
    pub fn as_text(&self) -> String {
        match self {
            CellValue::Null => String::new(),
            other => other.to_string(),
        }
    }

    /// Attach `unit` to a numeric cell; text and booleans pass through.
    pub fn into_field(self, unit: &Unit) -> FieldValue {
        match self {
            CellValue::Float(v) => FieldValue::Quantity(unit.quantity(v)),
            CellValue::Integer(i) => FieldValue::Quantity(unit.quantity(i as f64)),
            CellValue::String(s) => FieldValue::Text(s),
            CellValue::Bool(b) => FieldValue::Text(b.to_string()),
            CellValue::Null => FieldValue::Null,
        }
    }
}

impl fmt::Display for CellValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CellValue::String(s) => write!(f, "{s}"),
            CellValue::Integer(i) => write!(f, "{i}"),
            CellValue::Float(v) => write!(f, "{v}"),
            CellValue::Bool(b) => write!(f, "{b}"),
            CellValue::Null => write!(f, "<null>"),
        }
    }
}

// ---------------------------------------------------------------------------
// FieldValue – one named attribute of a star or planet
// ---------------------------------------------------------------------------

/// A star/planet attribute: a quantity, free text, or an empty cell.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    Quantity(Quantity),
    Text(String),
    Null,
}

impl FieldValue {
    pub fn as_quantity(&self) -> Option<&Quantity> {
        match self {
            FieldValue::Quantity(q) => Some(q),
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            FieldValue::Text(s) => Some(s),
            _ => None,
        }
    }
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldValue::Quantity(q) => write!(f, "{q}"),
            FieldValue::Text(s) => write!(f, "{s}"),
            FieldValue::Null => write!(f, "<null>"),
        }
    }
}

// ---------------------------------------------------------------------------
// Record – the attribute set of a star or planet
// ---------------------------------------------------------------------------

const TEMPERATURE_KEYS: &[&str] = &["Teff", "T", "temperature"];
const RADIUS_KEYS: &[&str] = &["R", "Radius", "radius"];
const MASS_KEYS: &[&str] = &["M", "Mass", "mass"];
const DISTANCE_KEYS: &[&str] = &["D", "d", "Distance", "distance"];

/// Ordered field-name → value mapping whose shape comes from the catalog
/// header. The first parsed column is always `name`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Record {
    fields: Vec<(String, FieldValue)>,
}

impl Record {
    /// Zip catalog keys with one data row.
    pub fn from_row(keys: &[String], row: Vec<FieldValue>) -> Self {
        let mut record = Record::default();
        for (key, value) in keys.iter().zip(row) {
            record.insert(key.clone(), value);
        }
        record
    }

    /// Insert or replace a field, keeping first-insertion order.
    pub fn insert(&mut self, key: impl Into<String>, value: FieldValue) {
        let key = key.into();
        match self.fields.iter_mut().find(|(k, _)| *k == key) {
            Some((_, slot)) => *slot = value,
            None => self.fields.push((key, value)),
        }
    }

    pub fn get(&self, key: &str) -> Option<&FieldValue> {
        self.fields.iter().find(|(k, _)| k == key).map(|(_, v)| v)
    }

    pub fn quantity(&self, key: &str) -> Option<&Quantity> {
        self.get(key).and_then(FieldValue::as_quantity)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|(k, _)| k.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &FieldValue)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// The `name` field rendered as text (numeric names included).
    pub fn name(&self) -> String {
        match self.get("name") {
            Some(FieldValue::Quantity(q)) => q.value.to_string(),
            Some(FieldValue::Text(s)) => s.clone(),
            _ => String::new(),
        }
    }

    fn first_quantity(&self, keys: &[&str]) -> Option<&Quantity> {
        keys.iter().find_map(|k| self.quantity(k))
    }

    pub fn temperature(&self) -> Option<&Quantity> {
        self.first_quantity(TEMPERATURE_KEYS)
    }

    pub fn radius(&self) -> Option<&Quantity> {
        self.first_quantity(RADIUS_KEYS)
    }

    pub fn mass(&self) -> Option<&Quantity> {
        self.first_quantity(MASS_KEYS)
    }

    pub fn distance(&self) -> Option<&Quantity> {
        self.first_quantity(DISTANCE_KEYS)
    }

    /// log10 of the surface gravity in cm/s², from the mass and radius fields.
    pub fn log_g(&self) -> Result<Option<f64>> {
        let (Some(mass), Some(radius)) = (self.mass(), self.radius()) else {
            return Ok(None);
        };
        Ok(Some(log_g(mass, radius)?))
    }
}

/// Gravitational constant, m³ kg⁻¹ s⁻².
const G: f64 = 6.674_30e-11;

/// log10 of g = G M / R² expressed in cm/s².
pub fn log_g(mass: &Quantity, radius: &Quantity) -> Result<f64> {
    let m = mass.to_unit("kg")?.value;
    let r = radius.to_unit("m")?.value;
    let g = G * m / (r * r);
    Ok((g * 100.0).log10())
}

impl Serialize for Record {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.fields.len()))?;
        for (k, v) in &self.fields {
            map.serialize_entry(k, v)?;
        }
        map.end()
    }
}
