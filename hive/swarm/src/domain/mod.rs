// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # Swarm Domain Layer
//!
//! | Module | Key Types |
//! |--------|-----------|
//! | [`handler`] | `TaskHandler`, `HandlerRegistry`, `HandlerError` |

pub mod handler;

pub use handler::*;
