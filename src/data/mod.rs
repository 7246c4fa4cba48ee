//! Target catalogs: raw cells, tabular readers, and target assembly.
//!
//! Architecture:
//! ```text
//!  .xlsx (legacy / modern layout)      .csv
//!        │                               │
//!        ▼                               ▼
//!   ┌──────────────────┐       ┌──────────────────┐
//!   │ SpreadsheetSource │       │ DelimitedSource  │   cells + unit strings → FieldValue
//!   └──────────────────┘       └──────────────────┘
//!        └──────────────┬────────────────┘
//!                       ▼
//!               ┌──────────────┐
//!               │ TabularSource │  star block, optional planet block
//!               └──────────────┘
//!                       │
//!                       ▼
//!               ┌──────────────┐
//!               │  TargetList   │  Vec<Target>, name search
//!               └──────────────┘
//! ```

pub mod delimited;
pub mod loader;
pub mod model;
pub mod search;
pub mod source;
pub mod spreadsheet;
pub mod target;
