//! # Dispatcher Module
//!
//! The dispatcher module drives a resolved stage chain for one request. It
//! owns the Stage Invocation Protocol: each stage receives the per-request
//! [`Context`] and a one-shot [`Advance`] continuation, and either delegates
//! onward, aborts with an error, or finishes the response itself.
//!
//! ## Overview
//!
//! The dispatcher is responsible for:
//! - Creating a fresh [`Context`] per request (reentrant, nothing shared)
//! - Invoking stages strictly in chain order via pluggable [`StageInvoker`]
//!   strategies (one for leaf stages, one for wildcard stages)
//! - Short-circuiting the chain when a stage aborts
//! - Running the "no terminal handler" hook when a wildcard-only chain
//!   exhausts
//! - Falling back to the trailing-slash redirect and the static-file serve
//!   when resolution misses entirely
//!
//! ## Control Flow
//!
//! The continuation-passing protocol is realized as a small state machine: an
//! index into the ordered stage list plus the [`Advance`] token. The
//! dispatcher blocks on each token until the stage settles it, so a stage may
//! finish its work on another thread (timer, I/O) before deciding. There is
//! no fan-out and no scheduler inside this module; stage execution within one
//! request is strictly sequential.
//!
//! ## Outcomes
//!
//! Every dispatch terminates in exactly one [`DispatchOutcome`]: `Handled`,
//! `NotFound`, `Redirect`, `Static`, or `Error`. Translating these into
//! status codes is the host adapter's job, not this crate's.

mod core;

pub use core::{
    compose, stage, Advance, Context, DirectInvoker, DispatchOutcome, Dispatcher, Stage, StageFn,
    StageInvoker,
};
