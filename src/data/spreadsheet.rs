use std::path::Path;

use calamine::{open_workbook_auto, Data, Reader};
use log::debug;

use crate::error::{PipelineError, Result};
use crate::units::{parse_unit, strip_unit_brackets, Unit};

use super::model::{CellValue, FieldValue};
use super::source::{EntityTable, TabularSource};

// ---------------------------------------------------------------------------
// Layout
// ---------------------------------------------------------------------------

/// Fixed positions of the header, units and data inside a catalog worksheet.
/// All indices are zero-based; column ranges are inclusive.
#[derive(Debug, Clone, PartialEq)]
pub struct SpreadsheetLayout {
    pub sheet_name: String,
    pub header_row: usize,
    pub units_row: usize,
    pub data_row0: usize,
    pub star_columns: (usize, usize),
    pub planet_columns: Option<(usize, usize)>,
    /// Observation-count column appended to the planet fields as `Nobs`.
    pub nobs_column: Option<usize>,
}

impl SpreadsheetLayout {
    /// Star-only workbook layout.
    pub fn legacy() -> Self {
        Self {
            sheet_name: "Sheet1".to_string(),
            header_row: 2,
            units_row: 3,
            data_row0: 4,
            star_columns: (1, 6),
            planet_columns: None,
            nobs_column: None,
        }
    }

    /// Star + planet workbook layout with an observation-count column.
    pub fn modern() -> Self {
        Self {
            planet_columns: Some((8, 18)),
            nobs_column: Some(20),
            ..Self::legacy()
        }
    }
}

// ---------------------------------------------------------------------------
// Sheet – a dense grid of cells
// ---------------------------------------------------------------------------

/// A worksheet as rows of cells, addressed from cell A1.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Sheet {
    rows: Vec<Vec<CellValue>>,
}

impl Sheet {
    pub fn from_rows(rows: Vec<Vec<CellValue>>) -> Self {
        Sheet { rows }
    }

    /// Read one worksheet of an `.xlsx` / `.xls` / `.ods` workbook.
    pub fn open(path: &Path, sheet_name: &str) -> Result<Self> {
        let mut workbook = open_workbook_auto(path)?;
        let range = workbook.worksheet_range(sheet_name)?;
        let Some((end_row, end_col)) = range.end() else {
            return Ok(Sheet::default());
        };

        let rows = (0..=end_row)
            .map(|r| {
                (0..=end_col)
                    .map(|c| range.get_value((r, c)).map_or(CellValue::Null, cell_from_data))
                    .collect()
            })
            .collect();
        Ok(Sheet { rows })
    }

    pub fn height(&self) -> usize {
        self.rows.len()
    }

    pub fn width(&self) -> usize {
        self.rows.iter().map(Vec::len).max().unwrap_or(0)
    }

    /// Cell at (row, col); anything outside the grid reads as empty.
    pub fn cell(&self, row: usize, col: usize) -> &CellValue {
        const EMPTY: &CellValue = &CellValue::Null;
        self.rows.get(row).and_then(|r| r.get(col)).unwrap_or(EMPTY)
    }

    /// Cells of `col` from `row0` to the bottom of the sheet.
    pub fn column_from(&self, col: usize, row0: usize) -> Vec<CellValue> {
        (row0..self.height()).map(|r| self.cell(r, col).clone()).collect()
    }
}

fn cell_from_data(data: &Data) -> CellValue {
    match data {
        Data::Int(i) => CellValue::Integer(*i),
        Data::Float(f) => CellValue::Float(*f),
        Data::String(s) => CellValue::String(s.clone()),
        Data::Bool(b) => CellValue::Bool(*b),
        Data::Empty => CellValue::Null,
        other => CellValue::String(other.to_string()),
    }
}

// ---------------------------------------------------------------------------
// SpreadsheetSource
// ---------------------------------------------------------------------------

/// Catalog read from a fixed-layout worksheet.
#[derive(Debug, Clone)]
pub struct SpreadsheetSource {
    star: EntityTable,
    planet: Option<EntityTable>,
}

impl SpreadsheetSource {
    pub fn open(path: &Path, layout: &SpreadsheetLayout) -> Result<Self> {
        let sheet = Sheet::open(path, &layout.sheet_name)?;
        Self::from_sheet(&sheet, layout)
    }

    pub fn from_sheet(sheet: &Sheet, layout: &SpreadsheetLayout) -> Result<Self> {
        let star = parse_block(sheet, layout, layout.star_columns)?;
        if star.keys().is_empty() {
            return Err(PipelineError::CatalogShape(
                "no star columns found in header row".to_string(),
            ));
        }

        let mut planet = None;
        if let Some(range) = layout.planet_columns {
            let mut block = parse_block(sheet, layout, range)?;
            if block.keys().is_empty() {
                debug!("no planet block in columns {}..={}", range.0, range.1);
            } else {
                if let Some(col) = layout.nobs_column {
                    let nobs = sheet
                        .column_from(col, layout.data_row0)
                        .into_iter()
                        .map(|c| c.into_field(&Unit::dimensionless()))
                        .collect();
                    block.push_column("Nobs", nobs)?;
                }
                planet = Some(block);
            }
        }

        Ok(SpreadsheetSource { star, planet })
    }
}

impl TabularSource for SpreadsheetSource {
    fn star(&self) -> &EntityTable {
        &self.star
    }

    fn planet(&self) -> Option<&EntityTable> {
        self.planet.as_ref()
    }
}

/// Parse an inclusive column range. The first column is always `name`;
/// other columns with an empty header cell are skipped.
fn parse_block(
    sheet: &Sheet,
    layout: &SpreadsheetLayout,
    (first, last): (usize, usize),
) -> Result<EntityTable> {
    let mut table = EntityTable::new();
    if first >= sheet.width() {
        return Ok(table);
    }

    for col in first..=last {
        let key = if col == first {
            "name".to_string()
        } else {
            sheet.cell(layout.header_row, col).as_text().trim().to_string()
        };
        if key.is_empty() {
            continue;
        }

        let unit_text = strip_unit_brackets(&sheet.cell(layout.units_row, col).as_text());
        let unit = parse_unit(&unit_text);

        let values = sheet
            .column_from(col, layout.data_row0)
            .into_iter()
            .map(|cell| cell.into_field(&unit))
            .collect();
        table.push_column(key, values)?;
    }
    Ok(table)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn s(v: &str) -> CellValue {
        CellValue::String(v.to_string())
    }

    fn layout() -> SpreadsheetLayout {
        SpreadsheetLayout {
            star_columns: (0, 2),
            planet_columns: Some((3, 4)),
            nobs_column: Some(5),
            ..SpreadsheetLayout::modern()
        }
    }

    fn sheet() -> Sheet {
        use CellValue::*;
        Sheet::from_rows(vec![
            vec![s("catalog")],
            vec![],
            vec![s("Star"), s("Teff"), s("Radius"), s("Planet"), s("Mass"), s("N")],
            vec![Null, s("[K]"), s("[Rsun]"), Null, s("[Mjup]"), Null],
            vec![s("Star1"), Float(5700.0), Float(1.0), s("Star1 b"), Float(0.7), Integer(3)],
            vec![s("Star2"), Integer(4800), Float(0.8), s("Star2 b"), Float(1.2), Integer(5)],
        ])
    }

    #[test]
    fn test_modern_layout_constants() {
        let l = SpreadsheetLayout::modern();
        assert_eq!((l.header_row, l.units_row, l.data_row0), (2, 3, 4));
        assert_eq!(l.star_columns, (1, 6));
        assert_eq!(l.planet_columns, Some((8, 18)));
        assert_eq!(l.nobs_column, Some(20));
        assert_eq!(SpreadsheetLayout::legacy().planet_columns, None);
    }

    #[test]
    fn test_star_and_planet_blocks() {
        let src = SpreadsheetSource::from_sheet(&sheet(), &layout()).unwrap();
        assert_eq!(src.star_keys(), ["name", "Teff", "Radius"]);
        assert_eq!(src.planet_keys().unwrap(), ["name", "Mass", "Nobs"]);

        let stars = src.star_data();
        assert_eq!(stars.len(), 2);
        let teff = stars[1][1].as_quantity().unwrap();
        assert_eq!(teff.value, 4800.0);
        assert_eq!(teff.unit.symbol(), "K");

        let planets = src.planet_data().unwrap();
        assert_eq!(planets[0][0], FieldValue::Text("Star1 b".into()));
        assert_eq!(planets[1][2].as_quantity().unwrap().value, 5.0);
    }

    #[test]
    fn test_unknown_unit_is_dimensionless() {
        let mut rows = sheet().rows;
        rows[3][1] = s("[furlongs]");
        let src = SpreadsheetSource::from_sheet(&Sheet::from_rows(rows), &layout()).unwrap();
        let teff = src.star_data()[0][1].as_quantity().unwrap().clone();
        assert!(teff.unit.is_dimensionless());
        assert_eq!(teff.value, 5700.0);
    }

    #[test]
    fn test_missing_planet_block() {
        let narrow: Vec<Vec<CellValue>> = sheet()
            .rows
            .into_iter()
            .map(|r| r.into_iter().take(3).collect())
            .collect();
        let src = SpreadsheetSource::from_sheet(&Sheet::from_rows(narrow), &layout()).unwrap();
        assert!(src.planet().is_none());
        assert_eq!(src.star().len(), 2);
    }

    #[test]
    fn test_legacy_ignores_planet_columns() {
        let legacy = SpreadsheetLayout {
            star_columns: (0, 2),
            ..SpreadsheetLayout::legacy()
        };
        let src = SpreadsheetSource::from_sheet(&sheet(), &legacy).unwrap();
        assert!(src.planet_data().is_none());
    }
}
