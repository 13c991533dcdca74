// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # `hive-swarm` - Task Workers
//!
//! Runs the worker side of the shared task queue: poll for work assigned to
//! a role, claim it, dispatch to a handler, record the result.
//!
//! ## Crate Layout
//!
//! | Module | Layer | Contents |
//! |--------|-------|----------|
//! | [`domain`] | Domain | `TaskHandler`, `HandlerRegistry` |
//! | [`application`] | Application | `PollingWorker`, `LeaseReaper`, built-in handlers |
//!
//! Workers never coordinate with each other directly. Two workers polling
//! the same role may both see a task; the queue's conditional claim lets
//! exactly one of them run it.

pub mod domain;
pub mod application;

pub use domain::*;
