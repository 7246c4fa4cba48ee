//! Hierarchical output store.
//!
//! Groups nest like directories and hold dictionaries (JSON values) and
//! result tables. A store lives in a single file and is written out when it
//! is flushed or closed.

use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use log::{debug, error, info};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{PipelineError, Result};
use crate::table::Table;

/// An entry inside a [`Group`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "data", rename_all = "snake_case")]
pub enum Node {
    Group(Group),
    Dictionary(Value),
    Table(Table),
}

/// A named collection of nodes, kept in insertion order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Group {
    children: Vec<(String, Node)>,
}

impl Group {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, name: &str) -> Option<&Node> {
        self.children.iter().find(|(k, _)| k == name).map(|(_, n)| n)
    }

    fn get_mut(&mut self, name: &str) -> Option<&mut Node> {
        self.children.iter_mut().find(|(k, _)| k == name).map(|(_, n)| n)
    }

    fn put(&mut self, name: &str, node: Node) {
        match self.get_mut(name) {
            Some(slot) => *slot = node,
            None => self.children.push((name.to_string(), node)),
        }
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.children.iter().map(|(k, _)| k.as_str())
    }

    /// Child groups in insertion order.
    pub fn groups(&self) -> impl Iterator<Item = (&str, &Group)> {
        self.children.iter().filter_map(|(k, n)| match n {
            Node::Group(g) => Some((k.as_str(), g)),
            _ => None,
        })
    }

    /// Return the child group `name`, creating it when missing.
    pub fn create_group(&mut self, name: &str) -> Result<&mut Group> {
        if self.get(name).is_none() {
            self.children.push((name.to_string(), Node::Group(Group::new())));
        }
        match self.get_mut(name) {
            Some(Node::Group(g)) => Ok(g),
            _ => Err(PipelineError::Store(format!("'{name}' exists and is not a group"))),
        }
    }

    /// Serialize `value` and store it as the dictionary `group_name`.
    pub fn store_dictionary<T: Serialize + ?Sized>(&mut self, value: &T, group_name: &str) -> Result<()> {
        let value = serde_json::to_value(value)?;
        self.put(group_name, Node::Dictionary(value));
        Ok(())
    }

    pub fn store_table(&mut self, table: &Table, name: &str) {
        self.put(name, Node::Table(table.clone()));
    }

    pub fn group(&self, name: &str) -> Result<&Group> {
        match self.get(name) {
            Some(Node::Group(g)) => Ok(g),
            _ => Err(missing("group", name)),
        }
    }

    pub fn node(&self, name: &str) -> Result<&Node> {
        self.get(name).ok_or_else(|| missing("entry", name))
    }

    pub fn table(&self, name: &str) -> Result<&Table> {
        match self.get(name) {
            Some(Node::Table(t)) => Ok(t),
            _ => Err(missing("table", name)),
        }
    }
}

fn missing(what: &str, name: &str) -> PipelineError {
    PipelineError::Store(format!("no {what} named '{name}'"))
}

/// Read a dictionary node back into a value.
pub fn load<T: DeserializeOwned>(node: &Node) -> Result<T> {
    match node {
        Node::Dictionary(v) => Ok(serde_json::from_value(v.clone())?),
        Node::Group(_) => Err(PipelineError::Store("expected a dictionary, found a group".into())),
        Node::Table(_) => Err(PipelineError::Store("expected a dictionary, found a table".into())),
    }
}

// ---------------------------------------------------------------------------
// OutputStore – the file-backed root group
// ---------------------------------------------------------------------------

/// A writable store file. Dropping an open store flushes it.
#[derive(Debug)]
pub struct OutputStore {
    path: PathBuf,
    root: Group,
    closed: bool,
}

impl OutputStore {
    /// Create (or truncate) the store file.
    pub fn create(path: &Path) -> Result<Self> {
        File::create(path)?;
        debug!("output store {} opened", path.display());
        Ok(OutputStore {
            path: path.to_path_buf(),
            root: Group::new(),
            closed: false,
        })
    }

    /// Read a store file back as its root group.
    pub fn open(path: &Path) -> Result<Group> {
        let reader = BufReader::new(File::open(path)?);
        let root = serde_json::from_reader(reader)?;
        debug!("output store {} loaded", path.display());
        Ok(root)
    }

    /// Acquire a store, run `f` on its root, then close it whatever `f`
    /// returned.
    pub fn scoped<T, F>(path: &Path, f: F) -> Result<T>
    where
        F: FnOnce(&mut Group) -> Result<T>,
    {
        let mut store = OutputStore::create(path)?;
        let result = f(store.root());
        let closed = store.close();
        let value = result?;
        closed?;
        Ok(value)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn root(&mut self) -> &mut Group {
        &mut self.root
    }

    pub fn flush(&mut self) -> Result<()> {
        let mut writer = BufWriter::new(File::create(&self.path)?);
        serde_json::to_writer(&mut writer, &self.root)?;
        writer.flush()?;
        Ok(())
    }

    pub fn close(mut self) -> Result<()> {
        self.closed = true;
        self.flush()?;
        info!("output store {} closed", self.path.display());
        Ok(())
    }
}

impl Drop for OutputStore {
    fn drop(&mut self) {
        if !self.closed {
            if let Err(e) = self.flush() {
                error!("failed to flush output store {}: {e}", self.path.display());
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::table::ColumnData;
    use serde_json::json;

    #[test]
    fn test_create_group_is_idempotent() {
        let mut root = Group::new();
        root.create_group("targets").unwrap().store_dictionary(&json!({"a": 1}), "t1").unwrap();
        root.create_group("targets").unwrap().store_dictionary(&json!({"a": 2}), "t2").unwrap();
        let targets = root.group("targets").unwrap();
        assert_eq!(targets.keys().collect::<Vec<_>>(), vec!["t1", "t2"]);
    }

    #[test]
    fn test_group_name_clash() {
        let mut root = Group::new();
        root.store_dictionary(&json!(1), "x").unwrap();
        assert!(matches!(root.create_group("x"), Err(PipelineError::Store(_))));
    }

    #[test]
    fn test_load_dictionary() {
        let mut root = Group::new();
        root.store_dictionary(&json!({"wl_min": {"value": 0.5}}), "common").unwrap();
        let v: Value = load(root.node("common").unwrap()).unwrap();
        assert_eq!(v["wl_min"]["value"], 0.5);
        assert!(load::<Value>(&Node::Group(Group::new())).is_err());
    }

    #[test]
    fn test_scoped_store_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("run.h5");
        let table = Table::new()
            .with_column("Wavelength", Some("um"), ColumnData::Float(vec![1.0, 2.0]))
            .unwrap();

        OutputStore::scoped(&path, |root| {
            let g = root.create_group("channels")?;
            g.store_table(&table, "Spec");
            Ok(())
        })
        .unwrap();

        let root = OutputStore::open(&path).unwrap();
        let loaded = root.group("channels").unwrap().table("Spec").unwrap();
        assert_eq!(loaded, &table);
    }

    #[test]
    fn test_scoped_store_flushes_on_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("run.h5");

        let result: Result<()> = OutputStore::scoped(&path, |root| {
            root.store_dictionary(&json!("partial"), "before")?;
            Err(PipelineError::InvalidPayload("boom".into()))
        });
        assert!(matches!(result, Err(PipelineError::InvalidPayload(_))));

        let root = OutputStore::open(&path).unwrap();
        assert!(root.get("before").is_some());
    }
}
