//! Router core module - tree compilation and the resolve hot path.

use std::borrow::Cow;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::fmt;
use std::sync::Arc;

use http::Method;
use once_cell::sync::Lazy;
use regex::Regex;
use smallvec::SmallVec;
use thiserror::Error;
use tracing::{debug, info};

use super::matcher::PrefixMatcher;
use crate::dispatcher::Stage;
use crate::spec::{RouteNode, RouteSpec};

/// Lexical method qualifier on a determinate key, e.g. `/foo/bar._POST`.
static VERB_SUFFIX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(?P<path>.*)\._(?P<verb>[A-Z]+)$").expect("verb suffix regex"));

/// Compile-time failures. Both are fatal to router construction and surface
/// synchronously from [`Router::compile`]; a malformed spec never yields a
/// partially usable router.
#[derive(Debug, Error)]
pub enum CompileError {
    #[error("invalid route spec at '{at}': {reason}")]
    InvalidSpec { at: String, reason: String },
    #[error("unsupported wildcard prefix syntax: '{prefix}'")]
    UnsupportedPrefixSyntax { prefix: String },
}

/// Whether a chain entry is a wildcard ancestor or the exact leaf handler.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StageKind {
    Wildcard,
    Leaf,
}

/// One stage in a compiled chain, tagged with the path (or prefix, for
/// wildcards) it was registered under.
#[derive(Clone)]
pub struct StageEntry {
    pub path: Arc<str>,
    pub kind: StageKind,
    pub stage: Stage,
}

impl fmt::Debug for StageEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StageEntry")
            .field("path", &self.path)
            .field("kind", &self.kind)
            .finish()
    }
}

/// Ordered, immutable stage list shared between the router and in-flight
/// requests.
pub type StageChain = Arc<[StageEntry]>;

/// Result of resolving one request: the chain to run and whether an exact
/// leaf handler terminates it.
#[derive(Clone, Debug)]
pub struct Resolution {
    pub chain: StageChain,
    /// `true` when an exact (determinate) entry matched; `false` when only
    /// wildcard ancestors apply.
    pub determinate: bool,
}

impl Resolution {
    /// Registration paths of the chain's stages, outermost first. Nothing
    /// is executed.
    pub fn stage_paths(&self) -> Vec<&str> {
        self.chain.iter().map(|e| e.path.as_ref()).collect()
    }
}

#[derive(Default)]
struct Collected {
    determinate: Vec<(String, Stage)>,
    indeterminate: Vec<(Arc<str>, Stage)>,
}

/// Immutable output of compiling a [`RouteSpec`]: the determinate table with
/// inherited wildcard chains already attached, the specificity-ordered
/// wildcard list, and the combined prefix matcher.
///
/// Compilation happens once; concurrent requests then share the router
/// read-only. Recompiling an equal spec yields an equivalent router, and
/// independently compiled routers never interfere.
#[derive(Clone, Debug)]
pub struct Router {
    determinate: HashMap<String, StageChain>,
    indeterminate: Vec<(Arc<str>, StageChain)>,
    matcher: PrefixMatcher,
}

impl Router {
    /// Compile a route spec into the two lookup structures.
    ///
    /// Validation runs over the whole tree first, so no structure is built
    /// from a spec that would be rejected.
    pub fn compile(spec: &RouteSpec) -> Result<Self, CompileError> {
        let mut seen = HashSet::new();
        validate_group(spec.entries(), "", &mut seen)?;

        let mut collected = Collected::default();
        collect(spec.entries(), "", &mut collected);

        // Specificity order: longer prefixes are deeper and must be tried
        // before shallower ones; ties break lexicographically.
        collected
            .indeterminate
            .sort_by(|a, b| b.0.len().cmp(&a.0.len()).then_with(|| a.0.cmp(&b.0)));

        let index: HashMap<&str, usize> = collected
            .indeterminate
            .iter()
            .enumerate()
            .map(|(i, (prefix, _))| (prefix.as_ref(), i))
            .collect();

        // Attach inherited ancestor chains, outermost wildcard first. An
        // ancestor is found by stripping trailing segments one at a time;
        // depths without their own wildcard are skipped.
        let indeterminate: Vec<(Arc<str>, StageChain)> = collected
            .indeterminate
            .iter()
            .map(|(prefix, stage)| {
                let mut ancestors: Vec<usize> = Vec::new();
                if prefix.as_ref() != "/" {
                    let mut parts: Vec<&str> =
                        prefix.split('/').filter(|s| !s.is_empty()).collect();
                    while parts.pop().is_some() {
                        let pfx = if parts.is_empty() {
                            "/".to_string()
                        } else {
                            format!("/{}/", parts.join("/"))
                        };
                        if let Some(&i) = index.get(pfx.as_str()) {
                            ancestors.push(i);
                        }
                    }
                }
                let mut chain: SmallVec<[StageEntry; 4]> = ancestors
                    .iter()
                    .rev()
                    .map(|&i| {
                        let (p, s) = &collected.indeterminate[i];
                        StageEntry {
                            path: Arc::clone(p),
                            kind: StageKind::Wildcard,
                            stage: Arc::clone(s),
                        }
                    })
                    .collect();
                chain.push(StageEntry {
                    path: Arc::clone(prefix),
                    kind: StageKind::Wildcard,
                    stage: Arc::clone(stage),
                });
                (Arc::clone(prefix), StageChain::from(chain.into_vec()))
            })
            .collect();

        let prefixes: Vec<Arc<str>> = indeterminate.iter().map(|(p, _)| Arc::clone(p)).collect();
        let matcher = PrefixMatcher::build(&prefixes)?;

        // Merge step: every determinate entry inherits the chain of the most
        // specific wildcard whose prefix covers its literal key, leaf last.
        let determinate: HashMap<String, StageChain> = collected
            .determinate
            .into_iter()
            .map(|(path, stage)| {
                let leaf = StageEntry {
                    path: Arc::from(path.as_str()),
                    kind: StageKind::Leaf,
                    stage,
                };
                let chain = match matcher.best_match(&path) {
                    Some(i) => {
                        let mut merged: Vec<StageEntry> = indeterminate[i].1.to_vec();
                        merged.push(leaf);
                        StageChain::from(merged)
                    }
                    None => StageChain::from(vec![leaf]),
                };
                (path, chain)
            })
            .collect();

        info!(
            determinate_count = determinate.len(),
            indeterminate_count = indeterminate.len(),
            "route tree compiled"
        );

        Ok(Self {
            determinate,
            indeterminate,
            matcher,
        })
    }

    /// Resolve a request to its stage chain without executing anything.
    ///
    /// HEAD behaves as GET. Any other method looks up the method-qualified
    /// key only; a method-specific miss never falls back to the GET entry.
    /// A determinate miss falls back to the most specific wildcard chain, or
    /// `None` when no prefix applies either.
    pub fn resolve(&self, method: &Method, path: &str) -> Option<Resolution> {
        let key: Cow<'_, str> = if *method == Method::GET || *method == Method::HEAD {
            Cow::Borrowed(path)
        } else {
            Cow::Owned(format!("{}._{}", path, method.as_str().to_ascii_uppercase()))
        };
        if let Some(chain) = self.determinate.get(key.as_ref()) {
            debug!(method = %method, path = %path, stages = chain.len(), "determinate match");
            return Some(Resolution {
                chain: Arc::clone(chain),
                determinate: true,
            });
        }
        match self.matcher.best_match(path) {
            Some(i) => {
                let (prefix, chain) = &self.indeterminate[i];
                debug!(
                    method = %method,
                    path = %path,
                    prefix = %prefix,
                    stages = chain.len(),
                    "indeterminate match"
                );
                Some(Resolution {
                    chain: Arc::clone(chain),
                    determinate: false,
                })
            }
            None => {
                debug!(method = %method, path = %path, "no route matched");
                None
            }
        }
    }

    /// All determinate routes as `(method, path)` pairs, sorted by path.
    pub fn determinate_routes(&self) -> Vec<(Method, String)> {
        let mut routes: Vec<(Method, String)> = self
            .determinate
            .keys()
            .map(|key| match VERB_SUFFIX.captures(key) {
                Some(caps) => {
                    let method =
                        Method::from_bytes(caps["verb"].as_bytes()).unwrap_or(Method::GET);
                    (method, caps["path"].to_string())
                }
                None => (Method::GET, key.clone()),
            })
            .collect();
        routes.sort_by(|a, b| a.1.cmp(&b.1).then_with(|| a.0.as_str().cmp(b.0.as_str())));
        routes
    }

    /// Wildcard prefixes in specificity order (most specific first).
    pub fn wildcard_prefixes(&self) -> Vec<String> {
        self.indeterminate
            .iter()
            .map(|(p, _)| p.to_string())
            .collect()
    }

    /// Print every registered route to stdout. Debugging aid.
    pub fn dump_routes(&self) {
        println!(
            "[routes] determinate={} indeterminate={}",
            self.determinate.len(),
            self.indeterminate.len()
        );
        for (method, path) in self.determinate_routes() {
            println!("[route] {method} {path}");
        }
        for (prefix, chain) in &self.indeterminate {
            println!("[wildcard] {prefix} ({} stages)", chain.len());
        }
    }
}

/// Normalize a handler key into its determinate path: leading slash
/// stripped, joined under `left`, trailing index dot removed. A `._VERB`
/// suffix is kept verbatim; method qualification is lexical.
fn qualify(left: &str, key: &str) -> String {
    let key = key.strip_prefix('/').unwrap_or(key);
    let mut path = format!("{left}/{key}");
    if key.ends_with('.') {
        path.pop();
    }
    path
}

fn group_key(key: &str) -> &str {
    key.strip_prefix('/').unwrap_or(key)
}

fn validate_group(
    group: &BTreeMap<String, RouteNode>,
    left: &str,
    seen: &mut HashSet<String>,
) -> Result<(), CompileError> {
    for (key, node) in group {
        if key == "*" {
            match node {
                RouteNode::Handler(_) => {
                    let prefix = format!("{left}/");
                    if prefix.contains('(') || prefix.contains(')') {
                        return Err(CompileError::UnsupportedPrefixSyntax { prefix });
                    }
                }
                RouteNode::Group(_) => {
                    return Err(CompileError::InvalidSpec {
                        at: format!("{left}/*"),
                        reason: "wildcard key must bind a handler, not a group".to_string(),
                    });
                }
            }
            continue;
        }
        if key.contains('*') {
            return Err(CompileError::InvalidSpec {
                at: format!("{left}/{key}"),
                reason: "segment name collides with the wildcard marker".to_string(),
            });
        }
        match node {
            RouteNode::Handler(_) => {
                let path = qualify(left, key);
                if !seen.insert(path.clone()) {
                    return Err(CompileError::InvalidSpec {
                        at: path,
                        reason: "duplicate determinate route after qualification".to_string(),
                    });
                }
            }
            RouteNode::Group(sub) => {
                validate_group(sub, &format!("{left}/{}", group_key(key)), seen)?;
            }
        }
    }
    Ok(())
}

fn collect(group: &BTreeMap<String, RouteNode>, left: &str, out: &mut Collected) {
    if let Some(RouteNode::Handler(stage)) = group.get("*") {
        out.indeterminate
            .push((Arc::from(format!("{left}/")), Arc::clone(stage)));
    }
    for (key, node) in group {
        if key == "*" {
            continue;
        }
        match node {
            RouteNode::Handler(stage) => {
                out.determinate.push((qualify(left, key), Arc::clone(stage)));
            }
            RouteNode::Group(sub) => {
                collect(sub, &format!("{left}/{}", group_key(key)), out);
            }
        }
    }
}
