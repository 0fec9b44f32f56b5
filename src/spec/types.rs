use std::collections::BTreeMap;
use std::fmt;

use crate::dispatcher::{compose, Stage};

/// One node of the route tree: either a stage bound at this key, or a nested
/// group of keys.
#[derive(Clone)]
pub enum RouteNode {
    Handler(Stage),
    Group(BTreeMap<String, RouteNode>),
}

impl fmt::Debug for RouteNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Handler(_) => f.write_str("Handler"),
            Self::Group(map) => f.debug_map().entries(map.iter()).finish(),
        }
    }
}

impl From<Stage> for RouteNode {
    fn from(stage: Stage) -> Self {
        Self::Handler(stage)
    }
}

impl From<RouteSpec> for RouteNode {
    fn from(spec: RouteSpec) -> Self {
        Self::Group(spec.entries)
    }
}

/// The declarative route tree handed to [`Router::compile`](crate::router::Router::compile).
///
/// Keys follow the registration conventions: `*` binds the group's wildcard,
/// a trailing `.` marks the index form of a name (`"foo."` registers `/foo`
/// even when a group `"foo"` also exists), a `._VERB` suffix binds a single
/// non-GET method, and a leading `/` is stripped.
///
/// Values are plain data; compiling never mutates the spec, and merging two
/// specs produces a new value.
#[derive(Clone, Debug, Default)]
pub struct RouteSpec {
    entries: BTreeMap<String, RouteNode>,
}

impl RouteSpec {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn from_entries(entries: BTreeMap<String, RouteNode>) -> Self {
        Self { entries }
    }

    pub(crate) fn entries(&self) -> &BTreeMap<String, RouteNode> {
        &self.entries
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Builder-style insertion. The node replaces whatever was previously at
    /// `key`; use [`merge`](Self::merge) for combining semantics.
    pub fn route(mut self, key: impl Into<String>, node: impl Into<RouteNode>) -> Self {
        self.entries.insert(key.into(), node.into());
        self
    }

    /// Combine two trees into a new one. Groups merge recursively. Two
    /// handlers at the same key compose (the existing stage runs first; its
    /// descend invokes the incoming one). A handler colliding with a group
    /// key is relocated to the trailing-dot index key of that name.
    pub fn merge(&self, other: &Self) -> Self {
        let mut entries = self.entries.clone();
        for (key, node) in &other.entries {
            merge_into(&mut entries, key, node.clone());
        }
        Self { entries }
    }

    /// Insert a handler under a chain of group keys, creating groups as
    /// needed and composing on key collision. Used by the directory loader.
    pub(crate) fn add_handler(&mut self, dirs: &[String], key: &str, stage: Stage) {
        let mut group = &mut self.entries;
        for dir in dirs {
            if matches!(group.get(dir), Some(RouteNode::Handler(_))) {
                if let Some(node) = group.remove(dir) {
                    merge_into(group, &format!("{dir}."), node);
                }
            }
            let entry = group
                .entry(dir.clone())
                .or_insert_with(|| RouteNode::Group(BTreeMap::new()));
            group = match entry {
                RouteNode::Group(sub) => sub,
                // cannot happen after the relocation above
                RouteNode::Handler(_) => return,
            };
        }
        merge_into(group, key, RouteNode::Handler(stage));
    }
}

fn merge_into(out: &mut BTreeMap<String, RouteNode>, key: &str, incoming: RouteNode) {
    match (out.remove(key), incoming) {
        (None, incoming) => {
            out.insert(key.to_string(), incoming);
        }
        (Some(RouteNode::Group(mut base)), RouteNode::Group(add)) => {
            for (k, n) in add {
                merge_into(&mut base, &k, n);
            }
            out.insert(key.to_string(), RouteNode::Group(base));
        }
        (Some(RouteNode::Handler(first)), RouteNode::Handler(second)) => {
            out.insert(key.to_string(), RouteNode::Handler(compose(first, second)));
        }
        (Some(group @ RouteNode::Group(_)), RouteNode::Handler(stage)) => {
            out.insert(key.to_string(), group);
            merge_into(out, &format!("{key}."), RouteNode::Handler(stage));
        }
        (Some(RouteNode::Handler(existing)), RouteNode::Group(add)) => {
            merge_into(out, &format!("{key}."), RouteNode::Handler(existing));
            out.insert(key.to_string(), RouteNode::Group(add));
        }
    }
}
