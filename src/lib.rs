//! # treeroute
//!
//! **treeroute** compiles a tree-shaped route specification into an
//! immutable lookup structure and drives requests through the resulting
//! stage chains with a continuation-passing dispatcher.
//!
//! ## Overview
//!
//! Routes are declared as a recursive tree of string keys. A key either
//! binds a handler stage or opens a nested group; the reserved `*` key binds
//! a group's wildcard, which runs for every request under that prefix and
//! decides per request whether to pass control deeper. Compilation flattens
//! the tree once, so resolution is an exact-key probe plus at most one regex
//! match, with no per-request tree walk.
//!
//! ## Architecture
//!
//! - **[`spec`]** - The declarative route tree, merging, and loading from
//!   JSON/YAML documents
//! - **[`router`]** - Tree compilation and `(method, path)` resolution
//! - **[`dispatcher`]** - Stage invocation: per-request context, one-shot
//!   advance tokens, and dispatch outcomes
//! - **[`fsload`]** - Filesystem route discovery (directories to groups,
//!   files to handlers)
//! - **[`hot_reload`]** - Watch a routes directory or document and swap in
//!   a freshly compiled router
//! - **[`static_files`]** - Static file fallback with optional template
//!   rendering
//! - **[`ids`]** - ULID-backed request identifiers
//! - **[`runtime_config`]** - Environment-derived dispatcher settings
//!
//! ## Example
//!
//! ```rust
//! use http::Method;
//! use treeroute::dispatcher::{stage, Dispatcher};
//! use treeroute::router::Router;
//! use treeroute::spec::RouteSpec;
//!
//! # fn main() -> Result<(), treeroute::router::CompileError> {
//! let spec = RouteSpec::new().route(
//!     "pets",
//!     RouteSpec::new()
//!         .route("*", stage(|_ctx, advance| advance.descend()))
//!         .route("/", stage(|_ctx, _advance| { /* respond */ })),
//! );
//! let router = Router::compile(&spec)?;
//! let dispatcher = Dispatcher::new();
//! let outcome = dispatcher.dispatch(&router, Method::GET, "/pets/");
//! # let _ = outcome;
//! # Ok(())
//! # }
//! ```

pub mod dispatcher;
pub mod fsload;
pub mod hot_reload;
pub mod ids;
pub mod router;
pub mod runtime_config;
pub mod spec;
pub mod static_files;

pub use dispatcher::{Dispatcher, DispatchOutcome};
pub use router::{CompileError, Router};
pub use spec::{RouteNode, RouteSpec};
