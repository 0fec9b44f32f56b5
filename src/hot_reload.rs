//! # Hot Reload Module
//!
//! Live rebuilding of the compiled router when its source changes, without
//! restarting the host.
//!
//! ## Overview
//!
//! Two sources can be watched:
//! - a route modules directory (see [`crate::fsload`]), rescanned on change
//! - a JSON/YAML route document, reparsed against a [`HandlerRegistry`]
//!
//! On every modify/create event the source is reloaded, recompiled, and the
//! fresh [`Router`] is swapped into an `ArcSwap` that in-flight dispatch
//! loads lock-free. A reload callback runs after each successful swap.
//!
//! ## Error Handling
//!
//! If the changed source fails to load or compile, the error is logged and
//! the previous router stays active. Requests keep being served.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use arc_swap::ArcSwap;
//! use treeroute::hot_reload::watch_modules;
//!
//! let shared = Arc::new(ArcSwap::from_pointee(router));
//! let watcher = watch_modules("routes/", source, shared.clone(), |router| {
//!     router.dump_routes();
//! })?;
//! // Keep the watcher alive for as long as reloading should work.
//! ```

use std::path::{Path, PathBuf};
use std::sync::Arc;

use arc_swap::ArcSwap;
use notify::{Config, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use tracing::{error, info};

use crate::fsload::{load_modules, StageSource};
use crate::router::Router;
use crate::spec::{load_spec, HandlerRegistry};

/// Watch a route modules directory and swap a freshly compiled [`Router`]
/// into `shared` whenever it changes.
///
/// The returned watcher stops watching when dropped.
pub fn watch_modules<F>(
    root: impl AsRef<Path>,
    source: Arc<dyn StageSource>,
    shared: Arc<ArcSwap<Router>>,
    mut on_reload: F,
) -> notify::Result<RecommendedWatcher>
where
    F: FnMut(&Router) + Send + 'static,
{
    let root: PathBuf = root.as_ref().to_path_buf();
    let scan_root = root.clone();

    let mut watcher = RecommendedWatcher::new(
        move |res: Result<notify::Event, notify::Error>| match res {
            Ok(event) => {
                if matches!(event.kind, EventKind::Modify(_) | EventKind::Create(_)) {
                    let compiled = load_modules(&scan_root, source.as_ref())
                        .and_then(|spec| Router::compile(&spec).map_err(anyhow::Error::from));
                    match compiled {
                        Ok(router) => {
                            info!(root = %scan_root.display(), "hot-reload: router rebuilt");
                            let router = Arc::new(router);
                            shared.store(Arc::clone(&router));
                            on_reload(&router);
                        }
                        Err(err) => {
                            // Keep the previous router live.
                            error!(root = %scan_root.display(), error = %err, "hot-reload failed");
                        }
                    }
                }
            }
            Err(e) => error!(error = %e, "watch error"),
        },
        Config::default(),
    )?;

    watcher.watch(&root, RecursiveMode::Recursive)?;
    Ok(watcher)
}

/// Watch a route document file and swap a freshly compiled [`Router`] into
/// `shared` whenever it changes. Handler names are resolved against
/// `registry` on every reload.
pub fn watch_spec<F>(
    spec_path: impl AsRef<Path>,
    registry: Arc<HandlerRegistry>,
    shared: Arc<ArcSwap<Router>>,
    mut on_reload: F,
) -> notify::Result<RecommendedWatcher>
where
    F: FnMut(&Router) + Send + 'static,
{
    let path: PathBuf = spec_path.as_ref().to_path_buf();
    let watch_path = path.clone();

    let mut watcher = RecommendedWatcher::new(
        move |res: Result<notify::Event, notify::Error>| match res {
            Ok(event) => {
                if matches!(event.kind, EventKind::Modify(_) | EventKind::Create(_)) {
                    let compiled = load_spec(&watch_path, &registry)
                        .and_then(|spec| Router::compile(&spec).map_err(anyhow::Error::from));
                    match compiled {
                        Ok(router) => {
                            info!(path = %watch_path.display(), "hot-reload: router rebuilt");
                            let router = Arc::new(router);
                            shared.store(Arc::clone(&router));
                            on_reload(&router);
                        }
                        Err(err) => {
                            error!(path = %watch_path.display(), error = %err, "hot-reload failed");
                        }
                    }
                }
            }
            Err(e) => error!(error = %e, "watch error"),
        },
        Config::default(),
    )?;

    watcher.watch(&path, RecursiveMode::NonRecursive)?;
    Ok(watcher)
}
