use std::path::Path;

use log::{debug, error, info};
use serde_json::Value;

use crate::error::{PipelineError, Result};
use crate::instrument::{Channels, Instrument, InstrumentKind};
use crate::payload::{text_at, Payload};
use crate::store::{load, Group, OutputStore};
use crate::table::Table;
use crate::units::Quantity;

use super::{param, LoadOptions, Task, TaskParam};

// ---------------------------------------------------------------------------
// BuildInstrument
// ---------------------------------------------------------------------------

/// Initialize and build one channel instrument.
///
/// ```ignore
/// let phot = BuildInstrument {
///     kind: "photometer",
///     name: "Phot",
///     description: &payload.tree()["channel"]["Phot"],
///     payload: &payload,
///     output: None,
/// }
/// .run()?;
/// ```
pub struct BuildInstrument<'a> {
    /// Instrument class tag, matched case-insensitively.
    pub kind: &'a str,
    pub name: &'a str,
    pub description: &'a Value,
    pub payload: &'a Payload,
    /// When set, the built instrument is written into this group.
    pub output: Option<&'a mut Group>,
}

impl Task for BuildInstrument<'_> {
    type Output = Instrument;

    const NAME: &'static str = "BuildInstrument";

    fn params() -> &'static [TaskParam] {
        const PARAMS: &[TaskParam] = &[
            param("type", "instrument type"),
            param("name", "instrument name"),
            param("description", "instrument description dictionary"),
            param("payload", "main payload"),
            param("output", "output group; the instrument is written when set"),
        ];
        PARAMS
    }

    fn execute(self) -> Result<Instrument> {
        let kind = InstrumentKind::from_tag(self.kind)?;
        let mut instrument = Instrument::new(kind, self.name, self.description, self.payload);
        instrument.build()?;
        if let Some(output) = self.output {
            instrument.write(output)?;
        }
        Ok(instrument)
    }
}

// ---------------------------------------------------------------------------
// BuildChannels
// ---------------------------------------------------------------------------

/// Build every channel declared in a payload.
pub struct BuildChannels<'a> {
    pub payload: &'a Payload,
    /// When set, the payload description and each channel are written here.
    pub output: Option<&'a mut Group>,
}

impl Task for BuildChannels<'_> {
    type Output = Channels;

    const NAME: &'static str = "BuildChannels";

    fn params() -> &'static [TaskParam] {
        const PARAMS: &[TaskParam] = &[
            param("payload", "main payload"),
            param("output", "output group; channels are written when set"),
        ];
        PARAMS
    }

    fn execute(self) -> Result<Channels> {
        info!("building channels");
        let declared: Vec<&String> = self.payload.channels()?.map(|(name, _)| name).collect();
        debug!("detectors found : {declared:?}");

        let mut channel_group = match self.output {
            Some(output) => {
                let inst = output.create_group("payload")?;
                inst.store_dictionary(self.payload.tree(), "payload description")?;
                Some(inst.create_group("channels")?)
            }
            None => None,
        };

        let mut channels = Channels::new();
        for (name, description) in self.payload.channels()? {
            let kind = text_at(description, "channelClass")?;
            let instrument = BuildInstrument {
                kind,
                name,
                description,
                payload: self.payload,
                output: None,
            }
            .run()?;
            if let Some(group) = channel_group.as_deref_mut() {
                instrument.write(group)?;
            }
            channels.insert(instrument);
        }
        debug!("channels : {:?}", channels.names());
        Ok(channels)
    }
}

// ---------------------------------------------------------------------------
// LoadPayload
// ---------------------------------------------------------------------------

/// Rebuild a payload and its channels from a stored run.
pub struct LoadPayload<'a> {
    pub input: &'a Group,
}

impl Task for LoadPayload<'_> {
    type Output = (Payload, Channels);

    const NAME: &'static str = "LoadPayload";

    fn params() -> &'static [TaskParam] {
        const PARAMS: &[TaskParam] = &[param("input", "input data")];
        PARAMS
    }

    fn execute(self) -> Result<(Payload, Channels)> {
        let payload_dir = self.input.group("payload")?;
        let payload = Payload::from_value(load(payload_dir.node("payload description")?)?)?;

        let mut channels = Channels::new();
        for (name, ch_dir) in payload_dir.group("channels")?.groups() {
            channels.insert(Instrument::from_group(name, ch_dir, &payload)?);
        }
        debug!("channels loaded: {:?}", channels.names());
        Ok((payload, channels))
    }
}

// ---------------------------------------------------------------------------
// PreparePayload
// ---------------------------------------------------------------------------

/// Everything a simulation run needs from the payload.
#[derive(Debug)]
pub struct PreparedPayload {
    pub payload: Payload,
    pub channels: Channels,
    /// Global (`wl_min`, `wl_max`).
    pub wl_range: (Quantity, Quantity),
}

/// Load or build the payload and its channels.
///
/// `.xml` files are parsed and built (and written to `output` when given);
/// `*h5` files are reloaded from a previous run.
pub struct PreparePayload<'a> {
    pub payload_file: &'a Path,
    pub output: Option<&'a Path>,
}

enum PayloadSource {
    Description,
    StoredRun,
}

impl PreparePayload<'_> {
    fn source(&self) -> Result<PayloadSource> {
        let file = self.payload_file;
        let is_xml = file
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| e.eq_ignore_ascii_case("xml"));
        if is_xml {
            return Ok(PayloadSource::Description);
        }
        if file.to_string_lossy().ends_with("h5") {
            return Ok(PayloadSource::StoredRun);
        }
        error!("Unsupported payload format: {}", file.display());
        Err(PipelineError::UnsupportedPayloadFormat(file.to_path_buf()))
    }
}

impl Task for PreparePayload<'_> {
    type Output = PreparedPayload;

    const NAME: &'static str = "PreparePayload";

    fn params() -> &'static [TaskParam] {
        const PARAMS: &[TaskParam] = &[
            param("payload_file", "payload xml file or stored run"),
            param("output", "output file"),
        ];
        PARAMS
    }

    fn execute(self) -> Result<PreparedPayload> {
        let (payload, channels) = match self.source()? {
            PayloadSource::Description => {
                let payload = LoadOptions {
                    filename: self.payload_file,
                }
                .run()?;
                let channels = match self.output {
                    Some(path) => OutputStore::scoped(path, |out| {
                        BuildChannels {
                            payload: &payload,
                            output: Some(out),
                        }
                        .run()
                    })?,
                    None => BuildChannels {
                        payload: &payload,
                        output: None,
                    }
                    .run()?,
                };
                (payload, channels)
            }
            PayloadSource::StoredRun => {
                let root = OutputStore::open(self.payload_file)?;
                LoadPayload { input: &root }.run()?
            }
        };

        let wl_range = payload.wavelength_bounds()?;
        Ok(PreparedPayload {
            payload,
            channels,
            wl_range,
        })
    }
}

// ---------------------------------------------------------------------------
// MergeChannelsOutput
// ---------------------------------------------------------------------------

/// Stack every channel's result table into one.
pub struct MergeChannelsOutput<'a> {
    pub channels: &'a Channels,
}

impl Task for MergeChannelsOutput<'_> {
    type Output = Table;

    const NAME: &'static str = "MergeChannelsOutput";

    fn params() -> &'static [TaskParam] {
        const PARAMS: &[TaskParam] = &[param("channels", "built channels")];
        PARAMS
    }

    fn execute(self) -> Result<Table> {
        let tables = self
            .channels
            .iter()
            .map(|ch| {
                ch.table.as_ref().ok_or_else(|| {
                    PipelineError::Store(format!("channel {} has no table", ch.name()))
                })
            })
            .collect::<Result<Vec<&Table>>>()?;
        Table::vstack(tables)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn payload() -> Payload {
        Payload::from_value(json!({
            "common": {
                "wl_min": {"value": 0.5, "unit": "um"},
                "wl_max": {"value": 7.8, "unit": "um"}
            },
            "channel": {
                "Phot": {"channelClass": {"value": "Photometer"}},
                "Spec": {"channelClass": {"value": "spectrometer"}, "targetR": {"value": 10}}
            }
        }))
        .unwrap()
    }

    #[test]
    fn test_unknown_instrument_is_fatal() {
        let p = payload();
        let mut out = Group::new();
        let err = BuildInstrument {
            kind: "bolometer",
            name: "Bolo",
            description: &json!({}),
            payload: &p,
            output: Some(&mut out),
        }
        .run()
        .unwrap_err();
        assert!(matches!(err, PipelineError::UnknownInstrument(ref t) if t == "bolometer"));
        assert_eq!(out.keys().count(), 0);
    }

    #[test]
    fn test_build_instrument_writes_when_asked() {
        let p = payload();
        let mut out = Group::new();
        let phot = BuildInstrument {
            kind: "Photometer",
            name: "Phot",
            description: &p.tree()["channel"]["Phot"],
            payload: &p,
            output: Some(&mut out),
        }
        .run()
        .unwrap();
        assert_eq!(phot.table.as_ref().unwrap().row_count(), 1);
        assert!(out.group("Phot").is_ok());
    }

    #[test]
    fn test_build_channels_in_payload_order() {
        let p = payload();
        let channels = BuildChannels { payload: &p, output: None }.run().unwrap();
        assert_eq!(channels.names(), ["Phot", "Spec"]);
        assert_eq!(channels.get("Spec").unwrap().kind(), InstrumentKind::Spectrometer);
    }

    #[test]
    fn test_build_channels_layout_in_store() {
        let p = payload();
        let mut root = Group::new();
        BuildChannels { payload: &p, output: Some(&mut root) }.run().unwrap();
        let payload_dir = root.group("payload").unwrap();
        assert_eq!(
            payload_dir.keys().collect::<Vec<_>>(),
            ["payload description", "channels"]
        );
        let names: Vec<&str> = payload_dir.group("channels").unwrap().groups().map(|(n, _)| n).collect();
        assert_eq!(names, ["Phot", "Spec"]);
    }

    #[test]
    fn test_load_payload_inverts_build() {
        let p = payload();
        let mut root = Group::new();
        let built = BuildChannels { payload: &p, output: Some(&mut root) }.run().unwrap();
        let (loaded_payload, loaded) = LoadPayload { input: &root }.run().unwrap();
        assert_eq!(loaded_payload, p);
        assert_eq!(loaded.names(), built.names());
        for ch in built.iter() {
            assert_eq!(loaded.get(ch.name()).unwrap().table, ch.table);
        }
    }

    #[test]
    fn test_merge_row_counts() {
        let p = payload();
        let channels = BuildChannels { payload: &p, output: None }.run().unwrap();
        let merged = MergeChannelsOutput { channels: &channels }.run().unwrap();
        let expected: usize = channels.iter().map(|c| c.table.as_ref().unwrap().row_count()).sum();
        assert_eq!(merged.row_count(), expected);
    }

    #[test]
    fn test_unsupported_payload_format() {
        let err = PreparePayload {
            payload_file: Path::new("payload.json"),
            output: None,
        }
        .run()
        .unwrap_err();
        assert!(matches!(err, PipelineError::UnsupportedPayloadFormat(_)));
    }
}
