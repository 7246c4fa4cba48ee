use crate::error::{PipelineError, Result};

use super::model::FieldValue;

// ---------------------------------------------------------------------------
// EntityTable – column-oriented fields of one entity kind
// ---------------------------------------------------------------------------

/// The parsed columns for one entity kind (stars or planets).
///
/// Every column holds one value per catalog row, so all columns share the
/// same length.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EntityTable {
    keys: Vec<String>,
    columns: Vec<Vec<FieldValue>>,
}

impl EntityTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a column. Re-using a key replaces that column.
    pub fn push_column(&mut self, key: impl Into<String>, values: Vec<FieldValue>) -> Result<()> {
        let key = key.into();
        if let Some(first) = self.columns.first() {
            if first.len() != values.len() {
                return Err(PipelineError::CatalogShape(format!(
                    "column '{key}' has {} rows, expected {}",
                    values.len(),
                    first.len()
                )));
            }
        }
        match self.keys.iter().position(|k| *k == key) {
            Some(idx) => self.columns[idx] = values,
            None => {
                self.keys.push(key);
                self.columns.push(values);
            }
        }
        Ok(())
    }

    pub fn keys(&self) -> &[String] {
        &self.keys
    }

    pub fn column(&self, key: &str) -> Option<&[FieldValue]> {
        let idx = self.keys.iter().position(|k| k == key)?;
        Some(&self.columns[idx])
    }

    /// Number of catalog rows.
    pub fn len(&self) -> usize {
        self.columns.first().map_or(0, Vec::len)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Transpose into rows, each ordered like `keys()`.
    pub fn rows(&self) -> Vec<Vec<FieldValue>> {
        (0..self.len())
            .map(|row| self.columns.iter().map(|col| col[row].clone()).collect())
            .collect()
    }
}

// ---------------------------------------------------------------------------
// TabularSource – what every catalog backend hands the assembler
// ---------------------------------------------------------------------------

/// A catalog reader. Backends parse their file up front and expose the star
/// block and, when the catalog has one, the planet block.
pub trait TabularSource {
    fn star(&self) -> &EntityTable;

    /// `None` when the catalog carries no planet section.
    fn planet(&self) -> Option<&EntityTable>;

    fn star_keys(&self) -> &[String] {
        self.star().keys()
    }

    fn star_data(&self) -> Vec<Vec<FieldValue>> {
        self.star().rows()
    }

    fn planet_keys(&self) -> Option<&[String]> {
        self.planet().map(EntityTable::keys)
    }

    fn planet_data(&self) -> Option<Vec<Vec<FieldValue>>> {
        self.planet().map(EntityTable::rows)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn text(s: &str) -> FieldValue {
        FieldValue::Text(s.to_string())
    }

    #[test]
    fn test_rows_transpose_columns() {
        let mut t = EntityTable::new();
        t.push_column("name", vec![text("a"), text("b")]).unwrap();
        t.push_column("kind", vec![text("G"), text("K")]).unwrap();
        assert_eq!(t.len(), 2);
        assert_eq!(t.rows()[1], vec![text("b"), text("K")]);
    }

    #[test]
    fn test_ragged_column_rejected() {
        let mut t = EntityTable::new();
        t.push_column("name", vec![text("a"), text("b")]).unwrap();
        let err = t.push_column("kind", vec![text("G")]).unwrap_err();
        assert!(matches!(err, PipelineError::CatalogShape(_)));
    }
}
