//! Dispatcher core module - hot path for driving resolved stage chains.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};

use http::Method;
use serde_json::Value;
use tracing::{debug, error, info};

use crate::ids::RequestId;
use crate::router::{Resolution, Router, StageKind};
use crate::runtime_config::RuntimeConfig;
use crate::static_files::StaticFiles;

/// Signature every stage is called with: the per-request [`Context`] and a
/// one-shot [`Advance`] token.
pub type StageFn = dyn Fn(&mut Context, Advance) + Send + Sync;

/// A single executable unit in a dispatch chain.
///
/// Stages are shared between the compiled router and every in-flight request,
/// so they live behind an `Arc` and are never mutated by this crate.
pub type Stage = Arc<StageFn>;

/// Wrap a closure as a [`Stage`].
pub fn stage<F>(f: F) -> Stage
where
    F: Fn(&mut Context, Advance) + Send + Sync + 'static,
{
    Arc::new(f)
}

/// Per-request mutable state created fresh by [`Dispatcher::dispatch`] and
/// discarded when dispatch finishes. Never shared across requests.
pub struct Context {
    /// Unique request ID for log correlation.
    pub request_id: RequestId,
    /// HTTP method of the request being dispatched.
    pub method: Method,
    /// Request path, `/`-delimited.
    pub path: String,
    /// Path with the current wildcard stage's prefix stripped. Updated before
    /// each wildcard stage runs; `None` until the first wildcard stage.
    pub remainder: Option<String>,
    /// Open field set for stages to pass values to later stages in the same
    /// chain. The dispatcher does not interpret these fields.
    pub fields: HashMap<String, Value>,
    cursor: usize,
    no_determinate_hook: Option<Stage>,
}

impl Context {
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            request_id: RequestId::new(),
            method,
            path: path.into(),
            remainder: None,
            fields: HashMap::new(),
            cursor: 0,
            no_determinate_hook: None,
        }
    }

    /// Portion of the path already consumed by wildcard prefixes.
    pub fn consumed(&self) -> &str {
        &self.path[..self.cursor]
    }

    /// Portion of the path not yet consumed.
    pub fn remaining(&self) -> &str {
        &self.path[self.cursor..]
    }

    /// Join the request path onto a resource directory, e.g. to locate a file
    /// that mirrors the URL layout.
    pub fn path_in(&self, dir: impl AsRef<Path>) -> PathBuf {
        dir.as_ref().join(self.path.trim_start_matches('/'))
    }

    /// Install a hook for this request that runs if the chain exhausts without
    /// reaching a leaf handler. Takes precedence over the dispatcher-level
    /// hook. Typically called from a wildcard stage.
    pub fn set_no_determinate_hook(&mut self, hook: Stage) {
        self.no_determinate_hook = Some(hook);
    }

    fn enter_prefix(&mut self, prefix: &str) {
        if let Some(rest) = self.path.strip_prefix(prefix) {
            self.remainder = Some(rest.to_string());
            self.cursor = prefix.len();
        }
    }

    fn enter_leaf(&mut self) {
        self.cursor = self.path.len();
    }
}

/// Decision a stage communicated through its [`Advance`] token.
#[derive(Debug)]
pub(crate) enum Decision {
    /// The stage delegated onward to the rest of the chain.
    Descend,
    /// The stage aborted the chain with an error.
    Abort(anyhow::Error),
    /// The stage terminated the response itself (token dropped uncalled).
    Respond,
}

struct AdvanceSlot {
    decision: Mutex<Option<Decision>>,
    ready: Condvar,
}

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(PoisonError::into_inner)
}

/// One-shot continuation handed to each stage.
///
/// A stage does exactly one of three things with it:
///
/// - call [`Advance::descend`] to invoke the next stage in the chain,
/// - call [`Advance::abort`] to skip the rest of the chain and surface an
///   error,
/// - drop it without calling either, which tells the dispatcher the stage
///   terminated the response itself.
///
/// Both methods consume the token, so calling it twice is unrepresentable.
/// The token is `Send`: a stage may move it into a timer or I/O callback and
/// settle it later; the dispatcher blocks until the single call arrives.
/// There is no built-in timeout - a stage that never settles its token stalls
/// the request indefinitely.
pub struct Advance {
    slot: Arc<AdvanceSlot>,
}

impl Advance {
    pub(crate) fn pair() -> (Advance, AdvanceProbe) {
        let slot = Arc::new(AdvanceSlot {
            decision: Mutex::new(None),
            ready: Condvar::new(),
        });
        (
            Advance {
                slot: Arc::clone(&slot),
            },
            AdvanceProbe { slot },
        )
    }

    /// Proceed to the next stage in the chain.
    pub fn descend(self) {
        self.settle(Decision::Descend);
    }

    /// Skip all remaining stages and surface `err` as the dispatch outcome.
    pub fn abort(self, err: impl Into<anyhow::Error>) {
        self.settle(Decision::Abort(err.into()));
    }

    fn settle(&self, decision: Decision) {
        let mut slot = lock(&self.slot.decision);
        if slot.is_none() {
            *slot = Some(decision);
            self.slot.ready.notify_one();
        }
    }
}

impl Drop for Advance {
    fn drop(&mut self) {
        // Dropping an unsettled token means the stage finished the response.
        self.settle(Decision::Respond);
    }
}

pub(crate) struct AdvanceProbe {
    slot: Arc<AdvanceSlot>,
}

impl AdvanceProbe {
    /// Block until the paired [`Advance`] is settled or dropped.
    pub(crate) fn wait(self) -> Decision {
        let mut decision = lock(&self.slot.decision);
        loop {
            if let Some(d) = decision.take() {
                return d;
            }
            decision = self
                .slot
                .ready
                .wait(decision)
                .unwrap_or_else(PoisonError::into_inner);
        }
    }
}

/// Combine two stages into one: `first` runs, and if it descends, `second`
/// runs with the outer continuation. Errors and terminal responses from
/// `first` propagate unchanged.
pub fn compose(first: Stage, second: Stage) -> Stage {
    Arc::new(move |ctx: &mut Context, advance: Advance| {
        let (inner, probe) = Advance::pair();
        first(ctx, inner);
        match probe.wait() {
            Decision::Descend => second(ctx, advance),
            Decision::Abort(err) => advance.abort(err),
            Decision::Respond => drop(advance),
        }
    })
}

/// Strategy for invoking a stage. The dispatcher carries one strategy for
/// leaf stages and one for wildcard stages, independently swappable, so
/// callers can adapt the calling convention (e.g. stages that return a
/// future-like value instead of taking a continuation) without touching
/// matching or ordering logic.
pub trait StageInvoker: Send + Sync {
    fn invoke(&self, stage: &Stage, ctx: &mut Context, advance: Advance);
}

/// Default strategy: call the stage with `(context, advance)` directly.
pub struct DirectInvoker;

impl StageInvoker for DirectInvoker {
    fn invoke(&self, stage: &Stage, ctx: &mut Context, advance: Advance) {
        stage(ctx, advance);
    }
}

/// Terminal result of dispatching one request.
#[derive(Debug)]
pub enum DispatchOutcome {
    /// Some stage terminated the response.
    Handled,
    /// No stage handled the request; the caller's not-found path applies.
    NotFound,
    /// The path resolves with a trailing slash added; the caller should
    /// redirect there (conventionally a 302).
    Redirect(String),
    /// The static-file fallback served the request.
    Static {
        bytes: Vec<u8>,
        content_type: &'static str,
    },
    /// A stage aborted the chain; the caller's error path applies.
    Error(anyhow::Error),
}

impl DispatchOutcome {
    pub fn is_handled(&self) -> bool {
        matches!(
            self,
            DispatchOutcome::Handled | DispatchOutcome::Static { .. }
        )
    }
}

/// Drives resolved stage chains against a compiled [`Router`].
///
/// The dispatcher owns no routing state, so one dispatcher can serve several
/// routers (or a hot-reloaded router behind `ArcSwap`) and is reentrant:
/// every call to [`Dispatcher::dispatch`] builds its own [`Context`].
pub struct Dispatcher {
    determinate_invoker: Arc<dyn StageInvoker>,
    indeterminate_invoker: Arc<dyn StageInvoker>,
    no_determinate_hook: Option<Stage>,
    static_files: Option<StaticFiles>,
    dir_redirect: bool,
}

impl Default for Dispatcher {
    fn default() -> Self {
        Self::new()
    }
}

impl Dispatcher {
    pub fn new() -> Self {
        Self {
            determinate_invoker: Arc::new(DirectInvoker),
            indeterminate_invoker: Arc::new(DirectInvoker),
            no_determinate_hook: None,
            static_files: None,
            dir_redirect: false,
        }
    }

    /// Swap the strategy used to invoke leaf stages.
    pub fn set_determinate_invoker(&mut self, invoker: Arc<dyn StageInvoker>) {
        self.determinate_invoker = invoker;
    }

    /// Swap the strategy used to invoke wildcard stages.
    pub fn set_indeterminate_invoker(&mut self, invoker: Arc<dyn StageInvoker>) {
        self.indeterminate_invoker = invoker;
    }

    /// Install the dispatcher-level hook that runs when a chain exhausts
    /// without a leaf handler. A hook installed on the [`Context`] by a stage
    /// takes precedence.
    pub fn set_no_determinate_hook(&mut self, hook: Stage) {
        self.no_determinate_hook = Some(hook);
    }

    /// Serve files from `static_files` when resolution yields nothing at all.
    pub fn set_static_files(&mut self, static_files: StaticFiles) {
        self.static_files = Some(static_files);
    }

    /// When enabled, a miss on `path` redirects to `path + "/"` if that
    /// resolves to a determinate entry for the same method.
    pub fn set_dir_redirect(&mut self, enabled: bool) {
        self.dir_redirect = enabled;
    }

    /// Apply environment-derived settings.
    pub fn configure(&mut self, config: &RuntimeConfig) {
        self.dir_redirect = config.dir_redirect;
        if let Some(root) = &config.static_root {
            self.static_files = Some(StaticFiles::new(root.clone()));
        }
    }

    /// Resolve `method` + `path` against `router` and drive the resulting
    /// stage chain to one of the terminal outcomes.
    pub fn dispatch(&self, router: &Router, method: Method, path: &str) -> DispatchOutcome {
        self.dispatch_with_id(router, method, path, None)
    }

    /// Like [`dispatch`](Self::dispatch), adopting a caller-supplied request
    /// id (e.g. an inbound `X-Request-Id` header) for log correlation. An
    /// unparseable id is replaced with a fresh one.
    pub fn dispatch_with_id(
        &self,
        router: &Router,
        method: Method,
        path: &str,
        inbound_id: Option<&str>,
    ) -> DispatchOutcome {
        let mut ctx = Context::new(method, path);
        ctx.request_id = RequestId::from_header_or_new(inbound_id);
        info!(
            request_id = %ctx.request_id,
            method = %ctx.method,
            path = %ctx.path,
            "dispatch start"
        );
        let outcome = match router.resolve(&ctx.method, &ctx.path) {
            Some(resolution) => self.run_chain(router, resolution, &mut ctx),
            None => self.fall_through(router, &mut ctx, false),
        };
        debug!(
            request_id = %ctx.request_id,
            handled = outcome.is_handled(),
            "dispatch end"
        );
        outcome
    }

    fn run_chain(
        &self,
        router: &Router,
        resolution: Resolution,
        ctx: &mut Context,
    ) -> DispatchOutcome {
        for entry in resolution.chain.iter() {
            let invoker = match entry.kind {
                StageKind::Wildcard => {
                    ctx.enter_prefix(&entry.path);
                    &self.indeterminate_invoker
                }
                StageKind::Leaf => {
                    ctx.enter_leaf();
                    &self.determinate_invoker
                }
            };
            let (advance, probe) = Advance::pair();
            invoker.invoke(&entry.stage, ctx, advance);
            match probe.wait() {
                Decision::Descend => continue,
                Decision::Respond => return DispatchOutcome::Handled,
                Decision::Abort(err) => {
                    error!(
                        request_id = %ctx.request_id,
                        stage_path = %entry.path,
                        error = %err,
                        "stage aborted chain"
                    );
                    return DispatchOutcome::Error(err);
                }
            }
        }

        // Every stage descended. Without a leaf in the chain the configured
        // hook gets one chance to finish the response.
        if !resolution.determinate {
            let hook = ctx
                .no_determinate_hook
                .clone()
                .or_else(|| self.no_determinate_hook.clone());
            if let Some(hook) = hook {
                debug!(request_id = %ctx.request_id, "running no-determinate hook");
                let (advance, probe) = Advance::pair();
                hook(ctx, advance);
                return match probe.wait() {
                    Decision::Respond => DispatchOutcome::Handled,
                    Decision::Abort(err) => DispatchOutcome::Error(err),
                    Decision::Descend => self.fall_through(router, ctx, true),
                };
            }
        }
        self.fall_through(router, ctx, true)
    }

    fn fall_through(&self, router: &Router, ctx: &mut Context, had_chain: bool) -> DispatchOutcome {
        if self.dir_redirect && !ctx.path.ends_with('/') {
            let slashed = format!("{}/", ctx.path);
            let determinate = router
                .resolve(&ctx.method, &slashed)
                .is_some_and(|r| r.determinate);
            if determinate {
                debug!(request_id = %ctx.request_id, location = %slashed, "redirecting to directory");
                return DispatchOutcome::Redirect(slashed);
            }
        }
        if !had_chain {
            if let Some(static_files) = &self.static_files {
                let render_ctx = Value::Object(
                    ctx.fields
                        .iter()
                        .map(|(k, v)| (k.clone(), v.clone()))
                        .collect(),
                );
                if let Ok(file) = static_files.serve(&ctx.path, Some(&render_ctx)) {
                    debug!(request_id = %ctx.request_id, path = %ctx.path, "served static fallback");
                    return DispatchOutcome::Static {
                        bytes: file.bytes,
                        content_type: file.content_type,
                    };
                }
            }
        }
        debug!(request_id = %ctx.request_id, path = %ctx.path, "no handler for request");
        DispatchOutcome::NotFound
    }
}
