use std::collections::{BTreeMap, HashMap};
use std::path::Path;
use std::sync::Arc;

use anyhow::Context as _;
use serde_json::Value;
use tracing::info;

use super::types::{RouteNode, RouteSpec};
use crate::dispatcher::Stage;
use crate::router::CompileError;

/// Named stages a route document can refer to. Leaves in a JSON/YAML route
/// file are handler names; the registry resolves them.
#[derive(Default)]
pub struct HandlerRegistry {
    handlers: HashMap<String, Stage>,
}

impl HandlerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, name: impl Into<String>, stage: Stage) {
        self.handlers.insert(name.into(), stage);
    }

    pub fn get(&self, name: &str) -> Option<&Stage> {
        self.handlers.get(name)
    }
}

/// Build a [`RouteSpec`] from an in-memory document. Objects become groups,
/// strings are handler names resolved against `registry`; anything else is
/// rejected.
pub fn from_value(value: &Value, registry: &HandlerRegistry) -> Result<RouteSpec, CompileError> {
    match value {
        Value::Object(map) => Ok(RouteSpec::from_entries(convert_group(map, "", registry)?)),
        _ => Err(CompileError::InvalidSpec {
            at: "/".to_string(),
            reason: "route document root must be an object".to_string(),
        }),
    }
}

fn convert_group(
    map: &serde_json::Map<String, Value>,
    at: &str,
    registry: &HandlerRegistry,
) -> Result<BTreeMap<String, RouteNode>, CompileError> {
    let mut out = BTreeMap::new();
    for (key, val) in map {
        let here = format!("{at}/{key}");
        let node = match val {
            Value::String(name) => match registry.get(name) {
                Some(stage) => RouteNode::Handler(Arc::clone(stage)),
                None => {
                    return Err(CompileError::InvalidSpec {
                        at: here,
                        reason: format!("unknown handler '{name}'"),
                    })
                }
            },
            Value::Object(sub) => RouteNode::Group(convert_group(sub, &here, registry)?),
            _ => {
                return Err(CompileError::InvalidSpec {
                    at: here,
                    reason: "expected a handler name or a nested group".to_string(),
                })
            }
        };
        out.insert(key.clone(), node);
    }
    Ok(out)
}

/// Load a route document from a JSON or YAML file (chosen by extension) and
/// resolve its handler names against `registry`.
pub fn load_spec(path: impl AsRef<Path>, registry: &HandlerRegistry) -> anyhow::Result<RouteSpec> {
    let path = path.as_ref();
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read route spec {}", path.display()))?;
    let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("");
    let value: Value = if matches!(ext, "yaml" | "yml") {
        serde_yaml::from_str(&content)
            .with_context(|| format!("failed to parse YAML route spec {}", path.display()))?
    } else {
        serde_json::from_str(&content)
            .with_context(|| format!("failed to parse JSON route spec {}", path.display()))?
    };
    let spec = from_value(&value, registry)?;
    info!(path = %path.display(), "route spec loaded");
    Ok(spec)
}
