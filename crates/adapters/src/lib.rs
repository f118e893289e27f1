// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! Parsing and sampling adapters: the Unicode sanitizer, the CLI backend
//! (argv/stdin/event translation), the stdout decode pipeline, and the
//! per-process resource monitor. Nothing here owns a child process.

pub mod backend;
pub mod env;
pub mod pipeline;
pub mod resource;
pub mod sanitize;

pub use backend::{AgentBackend, BackendError, ClaudeBackend};
pub use pipeline::{OutputFrame, StdoutPipeline};
pub use sanitize::sanitize;
