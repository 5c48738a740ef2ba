//! Tree path resolution
//!
//! Runners report executions as a flat list that references request nodes by
//! id. These helpers turn such an id back into the chain of folder names that
//! leads to it inside the runner's copy of the partition tree.

use std::collections::HashMap;
use thiserror::Error;

use crate::models::{Container, Item};

/// An execution refers to a node its own result tree does not contain
#[derive(Error, Debug, PartialEq, Eq)]
pub enum ResolveError {
    #[error("Item '{item_id}' not found in result tree of '{partition}'")]
    UnknownItem { item_id: String, partition: String },
}

/// Ancestor names of the node with `target_id`, from `node` downwards
///
/// Depth-first, pre-order, first match wins. The returned path always ends at
/// the target's parent; callers append the target's own name themselves.
///
/// Aggregation looks ids up through [`PathIndex`]; this search is the
/// reference the index is tested against.
#[allow(dead_code)]
pub fn resolve_path<C>(node: &C, target_id: &str, path_so_far: &[String]) -> Option<Vec<String>>
where
    C: Container + ?Sized,
{
    if node.id() == Some(target_id) {
        return Some(path_so_far.to_vec());
    }

    let mut path = path_so_far.to_vec();
    path.push(node.label().to_string());

    for child in node.children() {
        if child.id() == Some(target_id) {
            return Some(path);
        }
        if let Item::Folder(folder) = child {
            if let Some(found) = resolve_path(folder, target_id, &path) {
                return Some(found);
            }
        }
    }

    None
}

/// Id to ancestor-path map for one result tree
///
/// Built with a single walk so each lookup is a hash probe. Agrees with
/// [`resolve_path`] started from the same root with an empty path.
#[derive(Clone, Debug, Default)]
pub struct PathIndex {
    paths: HashMap<String, Vec<String>>,
}

impl PathIndex {
    pub fn build<C>(root: &C) -> Self
    where
        C: Container + ?Sized,
    {
        let mut index = Self::default();
        if let Some(id) = root.id() {
            index.paths.insert(id.to_string(), Vec::new());
        }
        index.walk(root, &mut Vec::new());
        index
    }

    fn walk<C>(&mut self, node: &C, path: &mut Vec<String>)
    where
        C: Container + ?Sized,
    {
        path.push(node.label().to_string());

        // Same visiting order as `resolve_path`, so the first entry wins.
        for child in node.children() {
            if let Some(id) = child.id() {
                self.paths
                    .entry(id.to_string())
                    .or_insert_with(|| path.clone());
            }
            if let Item::Folder(folder) = child {
                self.walk(folder, path);
            }
        }

        path.pop();
    }

    /// Ancestor names for `item_id`
    pub fn lookup(&self, item_id: &str) -> Option<&[String]> {
        self.paths.get(item_id).map(Vec::as_slice)
    }

    pub fn len(&self) -> usize {
        self.paths.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Collection;

    fn tree() -> Collection {
        let mut root = Collection::new(
            "API Users",
            vec![
                Item::request("List", "http://x").with_id("r-list"),
                Item::folder(
                    "Admin",
                    vec![
                        Item::folder(
                            "Roles",
                            vec![Item::request("Grant", "http://x").with_id("r-grant")],
                        )
                        .with_id("f-roles"),
                        Item::request("Ban", "http://x").with_id("r-ban"),
                    ],
                )
                .with_id("f-admin"),
                Item::folder("Empty", vec![]).with_id("f-empty"),
            ],
        );
        root.id = Some("root".to_string());
        root
    }

    fn names(path: &[&str]) -> Vec<String> {
        path.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_resolve_at_each_depth() {
        let root = tree();

        assert_eq!(resolve_path(&root, "r-list", &[]), Some(names(&["API Users"])));
        assert_eq!(
            resolve_path(&root, "r-ban", &[]),
            Some(names(&["API Users", "Admin"]))
        );
        assert_eq!(
            resolve_path(&root, "r-grant", &[]),
            Some(names(&["API Users", "Admin", "Roles"]))
        );
    }

    #[test]
    fn test_resolve_folder_ids() {
        let root = tree();
        assert_eq!(
            resolve_path(&root, "f-roles", &[]),
            Some(names(&["API Users", "Admin"]))
        );
        assert_eq!(resolve_path(&root, "root", &[]), Some(Vec::new()));
    }

    #[test]
    fn test_resolve_missing_id() {
        let root = tree();
        assert_eq!(resolve_path(&root, "nope", &[]), None);
    }

    #[test]
    fn test_resolve_keeps_prefix() {
        let root = tree();
        let prefix = names(&["outer"]);
        assert_eq!(
            resolve_path(&root, "r-ban", &prefix),
            Some(names(&["outer", "API Users", "Admin"]))
        );
    }

    #[test]
    fn test_planted_id_at_depth() {
        for depth in 0..6 {
            let mut node = Item::request("Target", "http://x").with_id("target");
            for level in (0..depth).rev() {
                node = Item::folder(format!("level-{level}"), vec![node]);
            }
            let root = Collection::new("root", vec![node]);

            let expected: Vec<String> = std::iter::once("root".to_string())
                .chain((0..depth).map(|level| format!("level-{level}")))
                .collect();
            assert_eq!(resolve_path(&root, "target", &[]), Some(expected));
        }
    }

    #[test]
    fn test_index_agrees_with_search() {
        let root = tree();
        let index = PathIndex::build(&root);

        for id in ["root", "r-list", "f-admin", "f-roles", "r-grant", "r-ban", "f-empty"] {
            assert_eq!(
                index.lookup(id).map(<[String]>::to_vec),
                resolve_path(&root, id, &[]),
                "mismatch for {id}"
            );
        }
        assert_eq!(index.len(), 7);
        assert!(index.lookup("nope").is_none());
    }

    #[test]
    fn test_index_first_match_wins() {
        let root = Collection::new(
            "root",
            vec![
                Item::folder("A", vec![Item::request("x", "http://x").with_id("dup")]),
                Item::folder("B", vec![Item::request("y", "http://x").with_id("dup")]),
                Item::request("z", "http://x").with_id("dup"),
            ],
        );

        let index = PathIndex::build(&root);
        assert_eq!(index.lookup("dup"), Some(&names(&["root", "A"])[..]));
        assert_eq!(
            resolve_path(&root, "dup", &[]),
            Some(names(&["root", "A"]))
        );
    }
}
