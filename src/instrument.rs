//! Channel instruments and the registry of instrument kinds.
//!
//! The numeric instrument models are reference implementations: they lay
//! out the wavelength grid of a channel and record what was built, which is
//! what the pipeline persists, reloads and merges.

use std::fmt;

use log::{debug, error};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{PipelineError, Result};
use crate::payload::{quantity_at, text_at, Payload};
use crate::store::{load, Group};
use crate::table::{ColumnData, Table};
use crate::units::{Quantity, Unit};

const WAVELENGTH_UNIT: &str = "um";

// ---------------------------------------------------------------------------
// Registry
// ---------------------------------------------------------------------------

/// The closed set of instrument classes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InstrumentKind {
    Photometer,
    Spectrometer,
}

impl InstrumentKind {
    /// Resolve a `channelClass` tag, ignoring case.
    pub fn from_tag(tag: &str) -> Result<Self> {
        match tag.trim().to_ascii_lowercase().as_str() {
            "photometer" => Ok(InstrumentKind::Photometer),
            "spectrometer" => Ok(InstrumentKind::Spectrometer),
            _ => {
                error!("invalid instrument class: {tag}");
                Err(PipelineError::UnknownInstrument(tag.to_string()))
            }
        }
    }
}

impl fmt::Display for InstrumentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InstrumentKind::Photometer => write!(f, "photometer"),
            InstrumentKind::Spectrometer => write!(f, "spectrometer"),
        }
    }
}

// ---------------------------------------------------------------------------
// Instrument
// ---------------------------------------------------------------------------

/// Metadata recorded by `build()` and stored as `built_instr`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BuiltInstrument {
    pub kind: InstrumentKind,
    pub wl_min: Quantity,
    pub wl_max: Quantity,
    pub n_bins: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resolving_power: Option<f64>,
}

/// One payload channel.
#[derive(Debug, Clone)]
pub struct Instrument {
    kind: InstrumentKind,
    name: String,
    description: Value,
    common: Value,
    pub table: Option<Table>,
    pub built: Option<BuiltInstrument>,
}

impl Instrument {
    pub fn new(kind: InstrumentKind, name: &str, description: &Value, payload: &Payload) -> Self {
        Instrument {
            kind,
            name: name.to_string(),
            description: description.clone(),
            common: payload.get("common").cloned().unwrap_or(Value::Null),
            table: None,
            built: None,
        }
    }

    pub fn kind(&self) -> InstrumentKind {
        self.kind
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn description(&self) -> &Value {
        &self.description
    }

    /// Channel band edges in microns; the channel's own `wl_min`/`wl_max`
    /// win over the payload's `common` ones.
    fn band(&self) -> Result<(f64, f64)> {
        let um = Unit::parse(WAVELENGTH_UNIT)?;
        let edge = |key: &str| -> Result<f64> {
            let q = match quantity_at(&self.description, key) {
                Ok(q) => q,
                Err(_) => quantity_at(&self.common, key)?,
            };
            let q = if q.unit.is_dimensionless() {
                Quantity::new(q.value, um.clone())
            } else {
                q.to(&um)?
            };
            Ok(q.value)
        };
        let (lo, hi) = (edge("wl_min")?, edge("wl_max")?);
        if !(lo > 0.0 && hi > lo) {
            return Err(PipelineError::InvalidPayload(format!(
                "channel {}: bad band {lo}..{hi} {WAVELENGTH_UNIT}",
                self.name
            )));
        }
        Ok((lo, hi))
    }

    /// Lay out the channel's wavelength grid and fill `table`.
    pub fn build(&mut self) -> Result<()> {
        let (lo, hi) = self.band()?;
        let (edges, resolving_power) = match self.kind {
            InstrumentKind::Photometer => (vec![lo, hi], None),
            InstrumentKind::Spectrometer => {
                let r = quantity_at(&self.description, "targetR")
                    .map_err(|_| {
                        PipelineError::InvalidPayload(format!(
                            "spectrometer {} needs targetR",
                            self.name
                        ))
                    })?
                    .value;
                let edges = resolution_edges(lo, hi, r).ok_or_else(|| {
                    PipelineError::InvalidPayload(format!(
                        "spectrometer {}: targetR {r} gives no usable binning of {lo}..{hi} {WAVELENGTH_UNIT}",
                        self.name
                    ))
                })?;
                (edges, Some(r))
            }
        };

        let left: Vec<f64> = edges[..edges.len() - 1].to_vec();
        let right: Vec<f64> = edges[1..].to_vec();
        let centre: Vec<f64> = left.iter().zip(&right).map(|(l, r)| 0.5 * (l + r)).collect();
        let n_bins = centre.len();

        let table = Table::new()
            .with_column("chName", None, ColumnData::Text(vec![self.name.clone(); n_bins]))?
            .with_column("Wavelength", Some(WAVELENGTH_UNIT), ColumnData::Float(centre))?
            .with_column("LeftBinEdge", Some(WAVELENGTH_UNIT), ColumnData::Float(left))?
            .with_column("RightBinEdge", Some(WAVELENGTH_UNIT), ColumnData::Float(right))?;

        let um = Unit::parse(WAVELENGTH_UNIT)?;
        self.built = Some(BuiltInstrument {
            kind: self.kind,
            wl_min: Quantity::new(lo, um.clone()),
            wl_max: Quantity::new(hi, um),
            n_bins,
            resolving_power,
        });
        self.table = Some(table);
        debug!("{} {} built with {n_bins} bins", self.kind, self.name);
        Ok(())
    }

    /// Persist under `output/<name>`: description, built metadata and table.
    pub fn write(&self, output: &mut Group) -> Result<()> {
        let (Some(table), Some(built)) = (&self.table, &self.built) else {
            return Err(PipelineError::Store(format!(
                "instrument {} written before build",
                self.name
            )));
        };
        let group = output.create_group(&self.name)?;
        group.store_dictionary(&self.description, "description")?;
        group.store_dictionary(built, "built_instr")?;
        group.store_table(table, &self.name);
        debug!("{} written", self.name);
        Ok(())
    }

    /// Restore the state produced by `build()` from persisted parts.
    pub fn load(&mut self, table: Table, built: BuiltInstrument) {
        self.table = Some(table);
        self.built = Some(built);
    }

    /// Rebuild an instrument from its group in a store.
    pub fn from_group(name: &str, group: &Group, payload: &Payload) -> Result<Self> {
        let description: Value = load(group.node("description")?)?;
        let tag = text_at(&description, "channelClass")?;
        let kind = InstrumentKind::from_tag(tag)?;
        let mut instrument = Instrument::new(kind, name, &description, payload);
        let table = group.table(name)?.clone();
        let built: BuiltInstrument = load(group.node("built_instr")?)?;
        instrument.load(table, built);
        Ok(instrument)
    }
}

/// Upper bound on the bins a single channel may be split into.
const MAX_BINS: usize = 1_000_000;

/// Bin edges at constant resolving power `r` = λ/Δλ, covering [lo, hi].
///
/// `None` when `r` is not a positive finite number, when the step
/// `1 + 1/r` rounds to 1, or when the band would need more than
/// [`MAX_BINS`] bins.
fn resolution_edges(lo: f64, hi: f64, r: f64) -> Option<Vec<f64>> {
    if !(r.is_finite() && r > 0.0) {
        return None;
    }
    let step = 1.0 + 1.0 / r;
    if step <= 1.0 {
        return None;
    }
    let n = ((hi / lo).ln() / (1.0 / r).ln_1p()).ceil();
    if !(n.is_finite() && n >= 1.0 && n <= MAX_BINS as f64) {
        return None;
    }

    let n = n as usize;
    let mut edges = Vec::with_capacity(n + 1);
    edges.push(lo);
    edges.extend(
        (1..n)
            .map(|i| lo * step.powi(i as i32))
            .take_while(|wl| *wl < hi),
    );
    edges.push(hi);
    Some(edges)
}

// ---------------------------------------------------------------------------
// Channels
// ---------------------------------------------------------------------------

/// Built channels keyed by name, in payload order.
#[derive(Debug, Clone, Default)]
pub struct Channels {
    instruments: Vec<Instrument>,
}

impl Channels {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a channel; a channel with the same name is replaced.
    pub fn insert(&mut self, instrument: Instrument) {
        match self.instruments.iter_mut().find(|i| i.name == instrument.name) {
            Some(slot) => *slot = instrument,
            None => self.instruments.push(instrument),
        }
    }

    pub fn get(&self, name: &str) -> Option<&Instrument> {
        self.instruments.iter().find(|i| i.name == name)
    }

    pub fn names(&self) -> Vec<&str> {
        self.instruments.iter().map(|i| i.name.as_str()).collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Instrument> {
        self.instruments.iter()
    }

    pub fn len(&self) -> usize {
        self.instruments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.instruments.is_empty()
    }
}
