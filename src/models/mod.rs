//! Data models for collection runs
//!
//! This module contains the collection tree and the execution results produced for it.

mod collection;
mod execution;

pub(crate) use collection::is_yaml_file;
pub use collection::{
    Body, Collection, Container, Expectation, Folder, Header, Info, Item, Request,
    RequestDefinition, RequestSpec, UrlSpec,
};
pub use execution::{
    Assertion, AssertionError, Execution, ExecutionResult, FailureReport, TaggedResult,
};
