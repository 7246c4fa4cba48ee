use serde::{Deserialize, Serialize};

use crate::error::{PipelineError, Result};

/// Values of one table column.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ColumnData {
    Float(Vec<f64>),
    Text(Vec<String>),
}

impl ColumnData {
    pub fn len(&self) -> usize {
        match self {
            ColumnData::Float(v) => v.len(),
            ColumnData::Text(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn filler(&self, rows: usize) -> ColumnData {
        match self {
            ColumnData::Float(_) => ColumnData::Float(vec![f64::NAN; rows]),
            ColumnData::Text(_) => ColumnData::Text(vec![String::new(); rows]),
        }
    }

    fn extend(&mut self, other: &ColumnData) -> bool {
        match (self, other) {
            (ColumnData::Float(a), ColumnData::Float(b)) => a.extend_from_slice(b),
            (ColumnData::Text(a), ColumnData::Text(b)) => a.extend_from_slice(b),
            _ => return false,
        }
        true
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Column {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unit: Option<String>,
    pub data: ColumnData,
}

/// A results table: named, equally long columns.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Table {
    columns: Vec<Column>,
}

impl Table {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_column(mut self, name: &str, unit: Option<&str>, data: ColumnData) -> Result<Self> {
        self.add_column(name, unit, data)?;
        Ok(self)
    }

    pub fn add_column(&mut self, name: &str, unit: Option<&str>, data: ColumnData) -> Result<()> {
        if !self.columns.is_empty() && data.len() != self.row_count() {
            return Err(PipelineError::Store(format!(
                "column '{name}' has {} rows, table has {}",
                data.len(),
                self.row_count()
            )));
        }
        if self.column(name).is_some() {
            return Err(PipelineError::Store(format!("duplicate column '{name}'")));
        }
        self.columns.push(Column {
            name: name.to_string(),
            unit: unit.map(str::to_string),
            data,
        });
        Ok(())
    }

    pub fn row_count(&self) -> usize {
        self.columns.first().map_or(0, |c| c.data.len())
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name == name)
    }

    pub fn column_names(&self) -> Vec<&str> {
        self.columns.iter().map(|c| c.name.as_str()).collect()
    }

    /// Stack tables vertically, keeping table order and row order.
    ///
    /// Columns are the union of all inputs in first-seen order; rows from
    /// tables lacking a column are filled with NaN or empty text.
    pub fn vstack<'a, I>(tables: I) -> Result<Table>
    where
        I: IntoIterator<Item = &'a Table>,
    {
        let mut out = Table::new();
        let mut rows = 0;

        for table in tables {
            let n = table.row_count();
            for col in &table.columns {
                if out.column(&col.name).is_none() {
                    out.columns.push(Column {
                        name: col.name.clone(),
                        unit: col.unit.clone(),
                        data: col.data.filler(rows),
                    });
                }
            }
            for col in &mut out.columns {
                let appended = match table.column(&col.name) {
                    Some(src) => {
                        if src.unit != col.unit {
                            return Err(PipelineError::Store(format!(
                                "column '{}' mixes units {:?} and {:?}",
                                col.name, col.unit, src.unit
                            )));
                        }
                        col.data.extend(&src.data)
                    }
                    None => {
                        let filler = col.data.filler(n);
                        col.data.extend(&filler)
                    }
                };
                if !appended {
                    return Err(PipelineError::Store(format!(
                        "column '{}' mixes text and numbers",
                        col.name
                    )));
                }
            }
            rows += n;
        }
        Ok(out)
    }
}
