use log::{debug, info, warn};
use serde::Serialize;

use crate::error::{PipelineError, Result};
use crate::store::Group;
use crate::units::{Quantity, Unit};

use super::model::Record;
use super::search::search_targets;
use super::source::TabularSource;

// ---------------------------------------------------------------------------
// Stellar sources a target can be updated from
// ---------------------------------------------------------------------------

/// Spectral energy distribution sampled on a wavelength grid.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Sed {
    pub wavelength: Vec<f64>,
    pub flux: Vec<f64>,
    pub wavelength_unit: Unit,
    pub flux_unit: Unit,
}

/// What a stellar source contributes to a target.
#[derive(Debug, Clone, PartialEq)]
pub struct StellarProperties {
    pub luminosity: Option<Quantity>,
    pub sed: Sed,
    pub model: String,
}

/// Anything that may be handed to [`Target::update_target`].
pub trait SourceObject {
    /// Type name used in log messages.
    fn kind(&self) -> &str;

    /// `None` for objects a target cannot take stellar properties from.
    fn stellar_properties(&self) -> Option<StellarProperties> {
        None
    }
}

/// A star modelled from a synthetic spectrum library or a black body.
#[derive(Debug, Clone, PartialEq)]
pub struct Star {
    pub luminosity: Quantity,
    pub sed: Sed,
    pub model: String,
}

impl SourceObject for Star {
    fn kind(&self) -> &str {
        "Star"
    }

    fn stellar_properties(&self) -> Option<StellarProperties> {
        Some(StellarProperties {
            luminosity: Some(self.luminosity.clone()),
            sed: self.sed.clone(),
            model: self.model.clone(),
        })
    }
}

/// A user-supplied SED read from file.
#[derive(Debug, Clone, PartialEq)]
pub struct CustomSed {
    pub sed: Sed,
    pub filename: String,
}

impl SourceObject for CustomSed {
    fn kind(&self) -> &str {
        "CustomSed"
    }

    fn stellar_properties(&self) -> Option<StellarProperties> {
        Some(StellarProperties {
            luminosity: None,
            sed: self.sed.clone(),
            model: "custom".to_string(),
        })
    }
}

// ---------------------------------------------------------------------------
// Target
// ---------------------------------------------------------------------------

/// One catalog row: a star and, when the catalog has planets, its planet.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Target {
    pub id: usize,
    pub name: String,
    pub star: Record,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub planet: Option<Record>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub luminosity: Option<Quantity>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sed: Option<Sed>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
}

impl Target {
    pub fn new(id: usize, star: Record, planet: Option<Record>) -> Self {
        let name = planet.as_ref().unwrap_or(&star).name();
        Target {
            id,
            name,
            star,
            planet,
            luminosity: None,
            sed: None,
            model: None,
        }
    }

    /// Take luminosity, SED and model from a stellar source. Unsupported
    /// objects leave the target untouched.
    pub fn update_target(&mut self, source: &dyn SourceObject) {
        match source.stellar_properties() {
            Some(props) => {
                self.luminosity = props.luminosity;
                self.sed = Some(props.sed);
                self.model = Some(props.model);
                debug!("target {} updated", self.name);
            }
            None => warn!("Object type {} not implemented", source.kind()),
        }
    }

    pub fn to_dict(&self) -> Result<serde_json::Value> {
        Ok(serde_json::to_value(self)?)
    }

    /// Store this target under `targets/<name>`.
    pub fn write<'a>(&self, output: &'a mut Group) -> Result<&'a mut Group> {
        let targets = output.create_group("targets")?;
        targets.store_dictionary(&self.to_dict()?, &self.name)?;
        info!("target {} saved", self.name);
        Ok(output)
    }
}

// ---------------------------------------------------------------------------
// TargetList – assembles targets from a tabular source
// ---------------------------------------------------------------------------

/// Targets built from a catalog, in catalog row order.
#[derive(Debug, Clone, Default)]
pub struct TargetList {
    targets: Vec<Target>,
}

impl TargetList {
    /// Pair star row *i* with planet row *i*. Rows are matched by position
    /// only; the catalog must keep both blocks aligned.
    pub fn from_source<S: TabularSource + ?Sized>(source: &S) -> Result<Self> {
        let star_keys = source.star_keys();
        let star_data = source.star_data();

        let targets = match (source.planet_keys(), source.planet_data()) {
            (Some(planet_keys), Some(planet_data)) => {
                if planet_data.len() != star_data.len() {
                    return Err(PipelineError::CatalogShape(format!(
                        "{} star rows but {} planet rows",
                        star_data.len(),
                        planet_data.len()
                    )));
                }
                star_data
                    .into_iter()
                    .zip(planet_data)
                    .enumerate()
                    .map(|(i, (star, planet))| {
                        Target::new(
                            i,
                            Record::from_row(star_keys, star),
                            Some(Record::from_row(planet_keys, planet)),
                        )
                    })
                    .collect()
            }
            _ => star_data
                .into_iter()
                .enumerate()
                .map(|(i, star)| Target::new(i, Record::from_row(star_keys, star), None))
                .collect(),
        };

        Ok(TargetList { targets })
    }

    pub fn targets(&self) -> &[Target] {
        &self.targets
    }

    pub fn get_mut(&mut self, id: usize) -> Option<&mut Target> {
        self.targets.get_mut(id)
    }

    pub fn len(&self) -> usize {
        self.targets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.targets.is_empty()
    }

    /// Case-, space- and hyphen-insensitive search on star and planet names.
    pub fn search_target(&self, name: &str) -> Vec<&Target> {
        search_targets(&self.targets, name)
    }
}

impl IntoIterator for TargetList {
    type Item = Target;
    type IntoIter = std::vec::IntoIter<Target>;

    fn into_iter(self) -> Self::IntoIter {
        self.targets.into_iter()
    }
}
