use std::path::Path;

use crate::data::loader::{load_target_list, CatalogFormat};
use crate::data::target::TargetList;
use crate::error::Result;

use super::{param, Task, TaskParam};

/// Read a target catalog into a [`TargetList`].
#[derive(Debug, Clone, Copy)]
pub struct LoadTargetList<'a> {
    pub target_list: &'a Path,
    /// Backend override; picked from the extension when `None`.
    pub format: Option<CatalogFormat>,
}

impl Task for LoadTargetList<'_> {
    type Output = TargetList;

    const NAME: &'static str = "LoadTargetList";

    fn params() -> &'static [TaskParam] {
        const PARAMS: &[TaskParam] = &[
            param("target_list", "target list file"),
            param("format", "catalog backend"),
        ];
        PARAMS
    }

    fn execute(self) -> Result<TargetList> {
        load_target_list(self.target_list, self.format)
    }
}
