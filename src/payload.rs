//! Payload descriptions.
//!
//! A payload is an ordered JSON tree read from XML:
//!
//! ```xml
//! <root>
//!   <common>
//!     <wl_min unit="micron">0.5</wl_min>
//!     <wl_max unit="micron">7.8</wl_max>
//!   </common>
//!   <channel name="Phot">
//!     <channelClass>Photometer</channelClass>
//!   </channel>
//! </root>
//! ```
//!
//! becomes `{"common": {"wl_min": {"value": 0.5, "unit": "micron"}, ...},
//! "channel": {"Phot": {"name": "Phot", "channelClass": {"value": "Photometer"}}}}`.

use std::path::Path;

use log::{debug, error};
use serde_json::{Map, Value};

use crate::error::{PipelineError, Result};
use crate::units::{Quantity, Unit};

/// Placeholder for the directory holding the payload file.
pub const CONFIG_PATH_TOKEN: &str = "__ConfigPath__";

/// A loaded payload description. Read-only once built.
#[derive(Debug, Clone, PartialEq)]
pub struct Payload {
    tree: Map<String, Value>,
}

impl Payload {
    pub fn from_tree(tree: Map<String, Value>) -> Self {
        Payload { tree }
    }

    /// Accept any JSON object; used when a payload comes back from a store.
    pub fn from_value(value: Value) -> Result<Self> {
        match value {
            Value::Object(tree) => Ok(Payload { tree }),
            other => Err(PipelineError::InvalidPayload(format!(
                "payload must be a mapping, got {other}"
            ))),
        }
    }

    /// Parse XML text. `base_dir` replaces `__ConfigPath__` in data-file paths.
    pub fn from_xml(text: &str, base_dir: &Path) -> Result<Self> {
        let doc = roxmltree::Document::parse(text)?;
        let tree = parse_children(doc.root_element(), base_dir)?;
        Ok(Payload { tree })
    }

    pub fn tree(&self) -> &Map<String, Value> {
        &self.tree
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.tree.get(key)
    }

    /// Channel declarations in file order.
    pub fn channels(&self) -> Result<impl Iterator<Item = (&String, &Value)>> {
        match self.tree.get("channel") {
            Some(Value::Object(channels)) => Ok(channels.iter()),
            _ => Err(PipelineError::InvalidPayload("no channel section".into())),
        }
    }

    /// Global wavelength bounds from `common.wl_min` / `common.wl_max`.
    pub fn wavelength_bounds(&self) -> Result<(Quantity, Quantity)> {
        let common = self
            .tree
            .get("common")
            .ok_or_else(|| PipelineError::InvalidPayload("no common section".into()))?;
        Ok((
            quantity_at(common, "wl_min")?,
            quantity_at(common, "wl_max")?,
        ))
    }
}

/// Read `node[key]` as a `{"value": .., "unit": ..}` quantity.
pub fn quantity_at(node: &Value, key: &str) -> Result<Quantity> {
    let entry = node
        .get(key)
        .ok_or_else(|| PipelineError::InvalidPayload(format!("missing '{key}'")))?;
    let value = entry
        .get("value")
        .and_then(Value::as_f64)
        .ok_or_else(|| PipelineError::InvalidPayload(format!("'{key}' has no numeric value")))?;
    let unit = match entry.get("unit").and_then(Value::as_str) {
        Some(symbol) => Unit::parse(symbol)?,
        None => Unit::dimensionless(),
    };
    Ok(Quantity::new(value, unit))
}

/// Read `node[key].value` as text.
pub fn text_at<'a>(node: &'a Value, key: &str) -> Result<&'a str> {
    node.get(key)
        .and_then(|v| v.get("value"))
        .and_then(Value::as_str)
        .ok_or_else(|| PipelineError::InvalidPayload(format!("'{key}' has no text value")))
}

// ---------------------------------------------------------------------------
// XML → tree
// ---------------------------------------------------------------------------

fn parse_children(node: roxmltree::Node<'_, '_>, base_dir: &Path) -> Result<Map<String, Value>> {
    let mut out = Map::new();
    for child in node.children().filter(|n| n.is_element()) {
        let tag = child.tag_name().name();
        let parsed = parse_element(child, base_dir)?;

        match child.attribute("name") {
            Some(name) => {
                let slot = out
                    .entry(tag.to_string())
                    .or_insert_with(|| Value::Object(Map::new()));
                let Value::Object(group) = slot else {
                    return Err(PipelineError::InvalidPayload(format!(
                        "'{tag}' mixes named and unnamed entries"
                    )));
                };
                if group.insert(name.to_string(), Value::Object(parsed)).is_some() {
                    return Err(PipelineError::InvalidPayload(format!(
                        "duplicate {tag} '{name}'"
                    )));
                }
            }
            None => {
                if out.insert(tag.to_string(), Value::Object(parsed)).is_some() {
                    return Err(PipelineError::InvalidPayload(format!("duplicate element '{tag}'")));
                }
            }
        }
    }
    Ok(out)
}

fn parse_element(node: roxmltree::Node<'_, '_>, base_dir: &Path) -> Result<Map<String, Value>> {
    let mut out = parse_children(node, base_dir)?;
    for attr in node.attributes() {
        out.insert(attr.name().to_string(), Value::String(attr.value().to_string()));
    }

    let has_children = node.children().any(|n| n.is_element());
    let text = node.text().map(str::trim).unwrap_or("");
    if !has_children && !text.is_empty() {
        let tag = node.tag_name().name();
        let value = if tag.to_ascii_lowercase().ends_with("datafile") {
            resolve_data_file(text, base_dir)?
        } else {
            typed_value(text)
        };
        out.insert("value".to_string(), value);
    }
    Ok(out)
}

fn typed_value(text: &str) -> Value {
    if let Ok(i) = text.parse::<i64>() {
        return Value::from(i);
    }
    if let Ok(f) = text.parse::<f64>() {
        return Value::from(f);
    }
    match text {
        "True" | "true" => Value::Bool(true),
        "False" | "false" => Value::Bool(false),
        _ => Value::String(text.to_string()),
    }
}

fn resolve_data_file(text: &str, base_dir: &Path) -> Result<Value> {
    let resolved = text.replace(CONFIG_PATH_TOKEN, &base_dir.to_string_lossy());
    let path = Path::new(&resolved);
    if !path.exists() {
        error!("data file not found: {}", path.display());
        return Err(PipelineError::MissingDataFile(path.to_path_buf()));
    }
    debug!("data file {} found", path.display());
    Ok(Value::String(resolved))
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    const PAYLOAD: &str = r#"
<root>
  <common>
    <wl_min unit="micron">0.5</wl_min>
    <wl_max unit="micron">7.8</wl_max>
  </common>
  <channel name="Phot">
    <channelClass>Photometer</channelClass>
    <wl_min unit="um">0.5</wl_min>
  </channel>
  <channel name="Spec">
    <channelClass>Spectrometer</channelClass>
    <targetR>50</targetR>
    <enabled>True</enabled>
  </channel>
</root>"#;

    fn payload() -> Payload {
        Payload::from_xml(PAYLOAD, Path::new(".")).unwrap()
    }

    #[test]
    fn test_channels_keyed_by_name() {
        let p = payload();
        let names: Vec<&String> = p.channels().unwrap().map(|(k, _)| k).collect();
        assert_eq!(names, ["Phot", "Spec"]);

        let spec = &p.tree()["channel"]["Spec"];
        assert_eq!(spec["channelClass"]["value"], "Spectrometer");
        assert_eq!(spec["targetR"]["value"], 50);
        assert_eq!(spec["enabled"]["value"], true);
        assert_eq!(spec["name"], "Spec");
    }

    #[test]
    fn test_wavelength_bounds() {
        let (lo, hi) = payload().wavelength_bounds().unwrap();
        assert_relative_eq!(lo.value, 0.5);
        assert_relative_eq!(hi.to_unit("nm").unwrap().value, 7800.0, max_relative = 1e-12);
    }

    #[test]
    fn test_duplicate_unnamed_element() {
        let err = Payload::from_xml("<r><a>1</a><a>2</a></r>", Path::new(".")).unwrap_err();
        assert!(matches!(err, PipelineError::InvalidPayload(_)));
    }

    #[test]
    fn test_data_file_resolution() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("qe.csv"), "wl,qe\n").unwrap();

        let ok = "<r><qe><datafile>__ConfigPath__/qe.csv</datafile></qe></r>";
        let p = Payload::from_xml(ok, dir.path()).unwrap();
        let resolved = p.tree()["qe"]["datafile"]["value"].as_str().unwrap();
        assert!(Path::new(resolved).exists());

        let missing = "<r><qe><datafile>__ConfigPath__/gone.csv</datafile></qe></r>";
        let err = Payload::from_xml(missing, dir.path()).unwrap_err();
        assert!(matches!(err, PipelineError::MissingDataFile(_)));
    }

    #[test]
    fn test_malformed_xml() {
        let err = Payload::from_xml("<root><common></root>", Path::new(".")).unwrap_err();
        assert!(matches!(err, PipelineError::Xml(_)));
    }
}
