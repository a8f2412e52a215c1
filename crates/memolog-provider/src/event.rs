//! Event identity and structured state carried alongside a message.

use std::collections::{BTreeMap, HashMap};
use std::fmt;

use serde_json::{Map, Value};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EventId {
    pub id: i32,
    pub name: Option<String>,
}

impl EventId {
    pub fn new(id: i32) -> Self {
        Self { id, name: None }
    }

    pub fn named(id: i32, name: impl Into<String>) -> Self {
        Self {
            id,
            name: Some(name.into()),
        }
    }
}

impl From<i32> for EventId {
    fn from(id: i32) -> Self {
        Self::new(id)
    }
}

impl fmt::Display for EventId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.id)
    }
}

/// State passed to `Handler::emit`. Its fields travel to storage as extra parameters.
pub trait EventState {
    fn fields(&self) -> Map<String, Value> {
        Map::new()
    }
}

impl EventState for () {}
impl EventState for str {}
impl EventState for String {}
impl EventState for &str {}

impl EventState for Map<String, Value> {
    fn fields(&self) -> Map<String, Value> {
        self.clone()
    }
}

impl EventState for Vec<(String, Value)> {
    fn fields(&self) -> Map<String, Value> {
        self.iter().cloned().collect()
    }
}

impl EventState for HashMap<String, Value> {
    fn fields(&self) -> Map<String, Value> {
        self.iter().map(|(k, v)| (k.clone(), v.clone())).collect()
    }
}

impl EventState for BTreeMap<String, Value> {
    fn fields(&self) -> Map<String, Value> {
        self.iter().map(|(k, v)| (k.clone(), v.clone())).collect()
    }
}
