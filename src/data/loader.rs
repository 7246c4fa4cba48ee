use std::path::Path;

use log::{error, info};

use crate::error::{PipelineError, Result};

use super::delimited::DelimitedSource;
use super::source::TabularSource;
use super::spreadsheet::{SpreadsheetLayout, SpreadsheetSource};
use super::target::TargetList;

/// The catalog backends.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CatalogFormat {
    /// Star-only workbook.
    LegacySpreadsheet,
    /// Star + planet workbook with an observation-count column.
    Spreadsheet,
    /// `"<star|planet> <field> [<unit>]"` headed delimited text.
    DelimitedText,
}

fn extension(path: &Path) -> String {
    path.extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_ascii_lowercase()
}

impl CatalogFormat {
    /// Pick a backend from the file extension.
    ///
    /// * `.csv` / `.txt` – delimited text
    /// * `.xlsx` / `.xls` / `.ods` – modern spreadsheet
    pub fn from_path(path: &Path) -> Result<Self> {
        match extension(path).as_str() {
            "csv" | "txt" => Ok(CatalogFormat::DelimitedText),
            "xlsx" | "xls" | "ods" => Ok(CatalogFormat::Spreadsheet),
            _ => {
                error!("Wrong target list format: {}", path.display());
                Err(PipelineError::UnsupportedCatalogFormat(path.to_path_buf()))
            }
        }
    }
}

/// Open a catalog with an explicit backend.
pub fn open_source(path: &Path, format: CatalogFormat) -> Result<Box<dyn TabularSource>> {
    let source: Box<dyn TabularSource> = match format {
        CatalogFormat::DelimitedText => Box::new(DelimitedSource::open(path)?),
        CatalogFormat::Spreadsheet => {
            Box::new(SpreadsheetSource::open(path, &SpreadsheetLayout::modern())?)
        }
        CatalogFormat::LegacySpreadsheet => {
            if extension(path) != "xlsx" {
                error!("Wrong target list format: {}", path.display());
                return Err(PipelineError::UnsupportedCatalogFormat(path.to_path_buf()));
            }
            Box::new(SpreadsheetSource::open(path, &SpreadsheetLayout::legacy())?)
        }
    };
    Ok(source)
}

/// Read a catalog file into targets. With no explicit format the backend is
/// chosen from the extension.
pub fn load_target_list(path: &Path, format: Option<CatalogFormat>) -> Result<TargetList> {
    let format = match format {
        Some(f) => f,
        None => CatalogFormat::from_path(path)?,
    };
    let source = open_source(path, format)?;
    let targets = TargetList::from_source(source.as_ref())?;
    info!(
        "{} targets loaded from {} ({format:?})",
        targets.len(),
        path.display()
    );
    Ok(targets)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_from_extension() {
        assert_eq!(
            CatalogFormat::from_path(Path::new("targets.CSV")).unwrap(),
            CatalogFormat::DelimitedText
        );
        assert_eq!(
            CatalogFormat::from_path(Path::new("targets.xlsx")).unwrap(),
            CatalogFormat::Spreadsheet
        );
        assert!(matches!(
            CatalogFormat::from_path(Path::new("targets.json")),
            Err(PipelineError::UnsupportedCatalogFormat(_))
        ));
    }

    #[test]
    fn test_legacy_requires_xlsx() {
        let err = open_source(Path::new("targets.csv"), CatalogFormat::LegacySpreadsheet)
            .err()
            .unwrap();
        assert!(matches!(err, PipelineError::UnsupportedCatalogFormat(_)));
    }
}
