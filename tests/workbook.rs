//! Reads `tests/fixtures/target_list.xlsx`: a "Notes" sheet followed by
//! "Sheet1", whose used range starts at B3 (header row 2, units row 3, two
//! data rows, star block in B..D, planet block in I..J, Nobs in U).

use std::path::PathBuf;

use exo_payload::data::loader::{load_target_list, CatalogFormat};
use exo_payload::data::model::CellValue;
use exo_payload::data::spreadsheet::Sheet;
use exo_payload::PipelineError;

fn fixture() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures/target_list.xlsx")
}

#[test]
fn sheet_cells_keep_absolute_positions() {
    let sheet = Sheet::open(&fixture(), "Sheet1").unwrap();
    assert_eq!(sheet.height(), 6);
    assert_eq!(sheet.width(), 21);

    assert_eq!(sheet.cell(0, 0), &CellValue::Null);
    assert_eq!(sheet.cell(2, 1), &CellValue::String("Star name".into()));
    assert_eq!(sheet.cell(3, 2), &CellValue::String("[K]".into()));
    assert_eq!(sheet.cell(4, 2).as_f64(), Some(6065.0));
    assert_eq!(sheet.cell(5, 20).as_f64(), Some(5.0));
}

#[test]
fn missing_sheet_is_an_error() {
    let err = Sheet::open(&fixture(), "Sheet9").unwrap_err();
    assert!(matches!(err, PipelineError::Spreadsheet(_)));
}

#[test]
fn modern_workbook_gives_star_planet_targets() {
    let targets = load_target_list(&fixture(), None).unwrap();
    assert_eq!(targets.len(), 2);

    let t = &targets.targets()[0];
    assert_eq!(t.name, "HD 209458 b");
    assert_eq!(t.star.name(), "HD 209458");
    assert_eq!(t.star.keys().collect::<Vec<_>>(), ["name", "Teff", "R"]);

    let teff = t.star.quantity("Teff").unwrap();
    assert_eq!((teff.value, teff.unit.symbol()), (6065.0, "K"));
    let radius = t.star.quantity("R").unwrap();
    assert_eq!((radius.value, radius.unit.symbol()), (1.2, "Rsun"));

    let planet = t.planet.as_ref().unwrap();
    assert_eq!(planet.keys().collect::<Vec<_>>(), ["name", "Mass", "Nobs"]);
    assert_eq!(planet.quantity("Mass").unwrap().unit.symbol(), "Mjup");
    let nobs = planet.quantity("Nobs").unwrap();
    assert_eq!(nobs.value, 3.0);
    assert!(nobs.unit.is_dimensionless());

    let second = &targets.targets()[1];
    assert_eq!(second.name, "WASP-12 b");
    assert_eq!(second.planet.as_ref().unwrap().quantity("Nobs").unwrap().value, 5.0);
}

#[test]
fn legacy_layout_reads_stars_only() {
    let targets = load_target_list(&fixture(), Some(CatalogFormat::LegacySpreadsheet)).unwrap();
    assert_eq!(targets.len(), 2);
    for t in targets.targets() {
        assert!(t.planet.is_none());
        assert_eq!(t.name, t.star.name());
    }
    assert_eq!(targets.targets()[1].name, "WASP-12");
}
