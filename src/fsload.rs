//! Filesystem route discovery.
//!
//! Walks a directory tree and builds a [`RouteSpec`] from it: directories
//! become groups, files become handlers. File naming follows the key
//! conventions of the spec tree:
//!
//! - `_INDEX.<ext>` registers the group's index (`/`) key; a verb suffix is
//!   preserved, so `_INDEX._POST.<ext>` registers the POST index.
//! - `_DEFAULT.<ext>` registers the group's wildcard (`*`) key.
//! - `name._VERB.<ext>` binds `name` for one non-GET method.
//! - A file whose stem collides with a sibling directory lands on the
//!   trailing-dot index key of that name; two files producing the same key
//!   are composed into one stage.
//!
//! Rust cannot load code from disk at runtime, so the mapping from file to
//! stage is delegated to a caller-supplied [`StageSource`].

use std::path::{Component, Path};

use anyhow::Context as _;
use tracing::{debug, info};
use walkdir::WalkDir;

use crate::dispatcher::Stage;
use crate::spec::RouteSpec;

/// Resolves discovered files to stages.
pub trait StageSource: Send + Sync {
    /// File extensions (without the dot) the scan should consider; anything
    /// else is skipped silently.
    fn extensions(&self) -> &[&str];

    /// Produce the stage for one discovered file.
    fn load(&self, path: &Path) -> anyhow::Result<Stage>;
}

/// Scan `root` recursively and merge every discovered handler into `spec`,
/// returning the combined tree. The input spec is not modified; recompile
/// the result to make it live.
pub fn add_modules(
    spec: &RouteSpec,
    root: impl AsRef<Path>,
    source: &dyn StageSource,
) -> anyhow::Result<RouteSpec> {
    let root = root.as_ref();
    let mut tree = RouteSpec::new();
    let mut count = 0usize;
    for entry in WalkDir::new(root).min_depth(1).sort_by_file_name() {
        let entry = entry.with_context(|| format!("failed to scan {}", root.display()))?;
        if !entry.file_type().is_file() {
            continue;
        }
        let path = entry.path();
        let Some(ext) = path.extension().and_then(|e| e.to_str()) else {
            continue;
        };
        if !source.extensions().contains(&ext) {
            continue;
        }
        let Some(stem) = path.file_stem().and_then(|s| s.to_str()) else {
            continue;
        };
        let rel = path
            .strip_prefix(root)
            .with_context(|| format!("path {} escapes scan root", path.display()))?;
        let dirs: Vec<String> = rel
            .parent()
            .map(|p| {
                p.components()
                    .filter_map(|c| match c {
                        Component::Normal(s) => s.to_str().map(String::from),
                        _ => None,
                    })
                    .collect()
            })
            .unwrap_or_default();
        let key = key_for_stem(stem);
        let stage = source
            .load(path)
            .with_context(|| format!("failed to load stage from {}", path.display()))?;
        debug!(file = %path.display(), key = %key, "registered route module");
        tree.add_handler(&dirs, &key, stage);
        count += 1;
    }
    info!(root = %root.display(), modules = count, "scanned route modules");
    Ok(spec.merge(&tree))
}

/// [`add_modules`] starting from an empty tree.
pub fn load_modules(root: impl AsRef<Path>, source: &dyn StageSource) -> anyhow::Result<RouteSpec> {
    add_modules(&RouteSpec::new(), root, source)
}

fn key_for_stem(stem: &str) -> String {
    if let Some(rest) = stem.strip_prefix("_INDEX") {
        format!("/{rest}")
    } else if stem == "_DEFAULT" {
        "*".to_string()
    } else {
        stem.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_for_stem_conventions() {
        assert_eq!(key_for_stem("_INDEX"), "/");
        assert_eq!(key_for_stem("_INDEX._POST"), "/._POST");
        assert_eq!(key_for_stem("_DEFAULT"), "*");
        assert_eq!(key_for_stem("pets"), "pets");
        assert_eq!(key_for_stem("pets._DELETE"), "pets._DELETE");
    }
}
