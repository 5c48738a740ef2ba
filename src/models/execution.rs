//! Execution result models
//!
//! Produced by a runner once per partition and only read afterwards.

use serde::{Deserialize, Serialize};
use std::fmt;

use super::Collection;

/// Outcome of running one partition
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct ExecutionResult {
    /// Engine-owned copy of the partition tree, with an id on every node
    pub result_tree: Collection,

    /// One record per executed request, in engine order
    pub executions: Vec<Execution>,
}

/// Outcome of one request
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct Execution {
    /// Id of the request node in `result_tree`
    pub item_id: String,
    pub item_name: String,
    pub assertions: Vec<Assertion>,
}

/// A single check attached to a request
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Assertion {
    pub name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<AssertionError>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AssertionError {
    pub name: String,
    pub message: String,
}

impl Assertion {
    pub fn pass(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            error: None,
        }
    }

    pub fn fail(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            error: Some(AssertionError {
                name: "AssertionError".to_string(),
                message: message.into(),
            }),
        }
    }

    pub fn is_failure(&self) -> bool {
        self.error.is_some()
    }
}

impl fmt::Display for Assertion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.error {
            Some(error) => write!(f, "{}: {}", self.name, error.message),
            None => write!(f, "{}", self.name),
        }
    }
}

impl Execution {
    /// Assertions that carry an error
    pub fn failures(&self) -> impl Iterator<Item = &Assertion> {
        self.assertions.iter().filter(|a| a.is_failure())
    }
}

/// A partition result tagged with the partition's source position
#[derive(Clone, Debug)]
pub struct TaggedResult {
    pub original_index: usize,
    pub partition: String,
    pub result: ExecutionResult,
}

/// One request with failed assertions, located by its path in the source tree
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FailureReport {
    /// Names from the partition root down to and including the request
    pub path: Vec<String>,
    pub request_name: String,
    pub failures: Vec<Assertion>,
}

impl FailureReport {
    /// Path joined with `" / "`
    pub fn path_string(&self) -> String {
        self.path.join(" / ")
    }
}

#[cfg(test)]
impl Execution {
    pub fn new(item_id: impl Into<String>, item_name: impl Into<String>) -> Self {
        Self {
            item_id: item_id.into(),
            item_name: item_name.into(),
            assertions: Vec::new(),
        }
    }

    pub fn with_assertion(mut self, assertion: Assertion) -> Self {
        self.assertions.push(assertion);
        self
    }
}
