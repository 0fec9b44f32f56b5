//! # Router Module
//!
//! The router module compiles a [`RouteSpec`](crate::spec::RouteSpec) tree
//! into an immutable lookup structure and resolves requests against it.
//!
//! ## Overview
//!
//! The router is responsible for:
//! - Validating the route tree (wildcard misuse, duplicate keys)
//! - Flattening the tree into a determinate table and a specificity-ordered
//!   wildcard list
//! - Building one combined anchored regex over all wildcard prefixes
//! - Resolving `(method, path)` to the ordered stage chain that would run
//!
//! ## Architecture
//!
//! The router uses a two-phase approach:
//!
//! 1. **Compilation**: A single recursive descent over the tree produces the
//!    exact-match table and the wildcard list. Wildcard chains inherit their
//!    ancestors (outermost first), and every exact entry is merged with the
//!    most specific wildcard chain covering it, so resolution is a plain
//!    lookup with no per-request tree walk.
//!
//! 2. **Resolution**: An exact-key probe (with lexical `._VERB` method
//!    qualification; HEAD folds into GET) followed, on miss, by one regex
//!    match to find the most specific wildcard prefix.
//!
//! ## Example
//!
//! ```rust,ignore
//! use treeroute::router::Router;
//! use treeroute::spec::RouteSpec;
//!
//! let router = Router::compile(&spec)?;
//! if let Some(res) = router.resolve(&http::Method::GET, "/foo/bar") {
//!     for entry in res.chain.iter() {
//!         println!("{} ({:?})", entry.path, entry.kind);
//!     }
//! }
//! ```

mod core;
mod matcher;

pub use core::{CompileError, Resolution, Router, StageChain, StageEntry, StageKind};
