//! # Spec Module
//!
//! The declarative route tree ([`RouteSpec`]) plus ways to obtain one:
//! programmatic construction, merging, and loading from a JSON/YAML document
//! whose leaves are handler names resolved through a [`HandlerRegistry`].

mod load;
mod types;

pub use load::{from_value, load_spec, HandlerRegistry};
pub use types::{RouteNode, RouteSpec};
