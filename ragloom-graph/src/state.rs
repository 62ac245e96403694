//! Slot maps threaded between nodes.

use std::collections::HashMap;

use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::error::NodeError;

/// Named slots (`"query"`, `"documents"`, ...) flowing along graph edges.
pub type State = HashMap<String, Value>;

/// Typed accessors for required slots.
pub trait StateExt {
    /// Borrow a required slot.
    fn require(&self, key: &str) -> Result<&Value, NodeError>;

    /// Borrow a required string slot.
    fn require_str(&self, key: &str) -> Result<&str, NodeError>;

    /// Deserialize a required slot.
    fn require_as<T: DeserializeOwned>(&self, key: &str) -> Result<T, NodeError>;

    /// Deserialize a slot that may be absent.
    fn optional_as<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>, NodeError>;
}

impl StateExt for State {
    fn require(&self, key: &str) -> Result<&Value, NodeError> {
        self.get(key).ok_or_else(|| NodeError::MissingInput(key.to_string()))
    }

    fn require_str(&self, key: &str) -> Result<&str, NodeError> {
        self.require(key)?
            .as_str()
            .ok_or_else(|| NodeError::invalid_input(key, "expected a string"))
    }

    fn require_as<T: DeserializeOwned>(&self, key: &str) -> Result<T, NodeError> {
        let value = self.require(key)?.clone();
        serde_json::from_value(value).map_err(|e| NodeError::invalid_input(key, e.to_string()))
    }

    fn optional_as<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>, NodeError> {
        match self.get(key) {
            Some(_) => self.require_as(key).map(Some),
            None => Ok(None),
        }
    }
}

/// Merge predecessor outputs in order; later keys overwrite earlier ones.
pub(crate) fn merge<'a>(outputs: impl IntoIterator<Item = &'a State>) -> State {
    let mut merged = State::new();
    for output in outputs {
        merged.extend(output.iter().map(|(k, v)| (k.clone(), v.clone())));
    }
    merged
}
