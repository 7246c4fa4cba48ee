//! Payload and target-catalog pipeline for exoplanet observation simulations.
//!
//! Two independent flows:
//!
//! * target catalogs (`.csv`, `.xlsx`) → [`data::target::TargetList`]
//! * payload description (`.xml`) or stored run (`*h5`) → built channels →
//!   merged result table, driven by the tasks in [`tasks`].

pub mod data;
pub mod error;
pub mod instrument;
pub mod payload;
pub mod store;
pub mod table;
pub mod tasks;
pub mod units;

pub use error::{PipelineError, Result};
