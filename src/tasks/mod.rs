//! Pipeline tasks.
//!
//! A task is a request struct whose fields are its parameters. Running it
//! consumes the request and yields the task's single output; tasks compose
//! by building and running child tasks inside `execute`, synchronously.
//!
//! ```text
//! PreparePayload ──► LoadOptions ──► BuildChannels ──► BuildInstrument × N
//!        │                                 │
//!        └──► LoadPayload (stored run)     └──► MergeChannelsOutput
//! ```

mod catalog;
mod instrument;
mod options;

pub use catalog::LoadTargetList;
pub use instrument::{
    BuildChannels, BuildInstrument, LoadPayload, MergeChannelsOutput, PreparePayload,
    PreparedPayload,
};
pub use options::{GetChannelList, LoadOptions};

use log::debug;

use crate::error::Result;

/// A declared task parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TaskParam {
    pub name: &'static str,
    pub description: &'static str,
}

/// Shorthand for building a parameter table.
pub const fn param(name: &'static str, description: &'static str) -> TaskParam {
    TaskParam { name, description }
}

/// A single unit of pipeline work.
pub trait Task: Sized {
    type Output;

    const NAME: &'static str;

    /// Parameters this task is configured with.
    fn params() -> &'static [TaskParam];

    fn execute(self) -> Result<Self::Output>;

    /// Run the task to completion and hand back its output.
    fn run(self) -> Result<Self::Output> {
        debug!("task {} started", Self::NAME);
        let output = self.execute()?;
        debug!("task {} done", Self::NAME);
        Ok(output)
    }
}
