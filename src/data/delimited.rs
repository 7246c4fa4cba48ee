use std::io;
use std::path::Path;

use log::debug;

use crate::error::Result;
use crate::units::{parse_unit, strip_unit_brackets, Unit};

use super::model::{CellValue, FieldValue};
use super::source::{EntityTable, TabularSource};

/// Catalog read from delimited text whose headers look like
/// `"star Teff [K]"` or `"planet name"`.
///
/// A header belongs to the star block when it contains `star`, to the planet
/// block when it contains `planet`. The second whitespace token is the field
/// name and an optional third token is the unit applied to the whole column.
#[derive(Debug, Clone)]
pub struct DelimitedSource {
    star: EntityTable,
    planet: Option<EntityTable>,
}

impl DelimitedSource {
    pub fn open(path: &Path) -> Result<Self> {
        Self::open_with_delimiter(path, b',')
    }

    pub fn open_with_delimiter(path: &Path, delimiter: u8) -> Result<Self> {
        let reader = csv::ReaderBuilder::new()
            .delimiter(delimiter)
            .trim(csv::Trim::All)
            .from_path(path)?;
        Self::from_csv(reader)
    }

    pub fn from_reader<R: io::Read>(rdr: R, delimiter: u8) -> Result<Self> {
        let reader = csv::ReaderBuilder::new()
            .delimiter(delimiter)
            .trim(csv::Trim::All)
            .from_reader(rdr);
        Self::from_csv(reader)
    }

    fn from_csv<R: io::Read>(mut reader: csv::Reader<R>) -> Result<Self> {
        let headers: Vec<String> = reader.headers()?.iter().map(str::to_string).collect();

        let mut columns: Vec<Vec<CellValue>> = vec![Vec::new(); headers.len()];
        for record in reader.records() {
            let record = record?;
            for (idx, column) in columns.iter_mut().enumerate() {
                column.push(CellValue::guess(record.get(idx).unwrap_or("")));
            }
        }

        let star = entity_block(&headers, &columns, "star")?;
        let planet = entity_block(&headers, &columns, "planet")?;
        if planet.keys().is_empty() {
            debug!("no planet columns in delimited catalog");
        }

        Ok(DelimitedSource {
            star,
            planet: (!planet.keys().is_empty()).then_some(planet),
        })
    }
}

impl TabularSource for DelimitedSource {
    fn star(&self) -> &EntityTable {
        &self.star
    }

    fn planet(&self) -> Option<&EntityTable> {
        self.planet.as_ref()
    }
}

/// Collect every column whose header mentions `entity`.
fn entity_block(headers: &[String], columns: &[Vec<CellValue>], entity: &str) -> Result<EntityTable> {
    let mut table = EntityTable::new();
    for (header, cells) in headers.iter().zip(columns) {
        if !header.contains(entity) {
            continue;
        }
        let tokens: Vec<&str> = header.split_whitespace().collect();
        let Some(key) = tokens.get(1) else {
            debug!("skipping header '{header}' without a field name");
            continue;
        };
        let unit = match tokens.get(2) {
            Some(raw) => parse_unit(&strip_unit_brackets(raw)),
            None => Unit::dimensionless(),
        };
        let values = cells.iter().cloned().map(|c| c.into_field(&unit)).collect();
        table.push_column(*key, values)?;
    }
    Ok(table)
}
