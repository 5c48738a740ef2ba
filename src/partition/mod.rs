//! Collection partitioning
//!
//! Splits a collection into its top-level folders, each promoted to a
//! stand-alone collection that can run independently of its siblings.

use thiserror::Error;
use tracing::debug;

use crate::models::{Collection, Info, Item};

/// Malformed input collection
#[derive(Error, Debug, PartialEq, Eq)]
pub enum ValidationError {
    #[error("The collection is invalid because it lacks a top-level `info` object")]
    MissingInfo,

    #[error("The collection is invalid because it lacks a top-level `item` list")]
    MissingItems,

    #[error(
        "Top-level request '{name}' (position {position}) is not supported; \
         all top-level items must be folders"
    )]
    TopLevelRequest { name: String, position: usize },
}

/// A top-level folder promoted to a runnable collection
#[derive(Clone, Debug)]
pub struct Partition {
    /// Position among the top-level folders of the source collection
    pub original_index: usize,
    pub collection: Collection,
}

impl Partition {
    pub fn name(&self) -> &str {
        self.collection.name()
    }

    pub fn request_count(&self) -> usize {
        self.collection
            .item
            .iter()
            .flatten()
            .map(Item::request_count)
            .sum()
    }
}

/// Split `collection` into one partition per top-level folder
///
/// Each top-level folder gets its synthesized `info` written back onto it.
/// Nothing is touched unless every top-level item is a folder.
pub fn partition(collection: &mut Collection) -> Result<Vec<Partition>, ValidationError> {
    let root_info = collection
        .info
        .clone()
        .ok_or(ValidationError::MissingInfo)?;
    let items = collection
        .item
        .as_mut()
        .ok_or(ValidationError::MissingItems)?;

    if let Some((position, request)) = items.iter().enumerate().find(|(_, i)| !i.is_folder()) {
        return Err(ValidationError::TopLevelRequest {
            name: request.name().to_string(),
            position,
        });
    }

    let mut partitions = Vec::with_capacity(items.len());

    for (index, item) in items.iter_mut().enumerate() {
        let Item::Folder(folder) = item else {
            continue;
        };

        let suffix = match folder.name.as_deref() {
            Some(name) if !name.is_empty() => name.to_string(),
            _ => (index + 1).to_string(),
        };
        let info = Info {
            name: format!("{} {}", root_info.name, suffix),
            original_index: Some(index),
            ..root_info.clone()
        };
        folder.info = Some(info.clone());

        debug!("Partition {}: {}", index, info.name);

        partitions.push(Partition {
            original_index: index,
            collection: Collection {
                id: None,
                info: Some(info),
                item: Some(folder.item.clone()),
                extra: folder.extra.clone(),
            },
        });
    }

    Ok(partitions)
}
