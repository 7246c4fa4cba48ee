use std::path::Path;

use log::{error, info};

use crate::error::{PipelineError, Result};
use crate::payload::{text_at, Payload};

use super::{param, Task, TaskParam};

/// Read an `.xml` payload description.
#[derive(Debug, Clone, Copy)]
pub struct LoadOptions<'a> {
    pub filename: &'a Path,
}

impl Task for LoadOptions<'_> {
    type Output = Payload;

    const NAME: &'static str = "LoadOptions";

    fn params() -> &'static [TaskParam] {
        const PARAMS: &[TaskParam] = &[param("filename", "payload xml file")];
        PARAMS
    }

    fn execute(self) -> Result<Payload> {
        let is_xml = self
            .filename
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| e.eq_ignore_ascii_case("xml"));
        if !is_xml {
            error!("Unsupported payload format: {}", self.filename.display());
            return Err(PipelineError::UnsupportedPayloadFormat(self.filename.to_path_buf()));
        }

        let text = std::fs::read_to_string(self.filename)?;
        let base_dir = self.filename.parent().unwrap_or_else(|| Path::new("."));
        let payload = Payload::from_xml(&text, base_dir)?;
        info!("payload loaded from {}", self.filename.display());
        Ok(payload)
    }
}

/// Names of the channels of one instrument class.
#[derive(Debug, Clone, Copy)]
pub struct GetChannelList<'a> {
    pub payload: &'a Payload,
    pub channel_type: &'a str,
}

impl Task for GetChannelList<'_> {
    type Output = Vec<String>;

    const NAME: &'static str = "GetChannelList";

    fn params() -> &'static [TaskParam] {
        const PARAMS: &[TaskParam] = &[
            param("options", "payload description"),
            param("channel_type", "channel class to select"),
        ];
        PARAMS
    }

    fn execute(self) -> Result<Vec<String>> {
        let mut names = Vec::new();
        for (name, description) in self.payload.channels()? {
            if text_at(description, "channelClass")?.eq_ignore_ascii_case(self.channel_type) {
                names.push(name.clone());
            }
        }
        Ok(names)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn options() -> Payload {
        Payload::from_value(json!({
            "channel": {
                "Phot": {"channelClass": {"value": "Photometer"}},
                "Spec": {"channelClass": {"value": "Spectrometer"}},
                "Spec1": {"channelClass": {"value": "Spectrometer"}}
            }
        }))
        .unwrap()
    }

    #[test]
    fn test_channel_types() {
        let payload = options();
        let list = |t: &str| {
            GetChannelList { payload: &payload, channel_type: t }.run().unwrap()
        };
        assert_eq!(list("Photometer"), ["Phot"]);
        assert_eq!(list("Spectrometer"), ["Spec", "Spec1"]);
        assert!(list("Bolometer").is_empty());
    }

    #[test]
    fn test_load_options_rejects_non_xml() {
        let err = LoadOptions { filename: Path::new("payload_example.csv") }
            .run()
            .unwrap_err();
        assert!(matches!(err, PipelineError::UnsupportedPayloadFormat(_)));
    }

    #[test]
    fn test_load_options_missing_file() {
        let err = LoadOptions { filename: Path::new("/nonexistent/payload.xml") }
            .run()
            .unwrap_err();
        assert!(matches!(err, PipelineError::Io(_)));
    }

    #[test]
    fn test_load_options_reads_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("payload.xml");
        std::fs::write(
            &path,
            r#"<root><channel name="Phot"><channelClass>Photometer</channelClass></channel></root>"#,
        )
        .unwrap();
        let payload = LoadOptions { filename: &path }.run().unwrap();
        assert_eq!(payload.channels().unwrap().count(), 1);
    }
}
