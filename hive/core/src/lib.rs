// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Hive Core
//!
//! Shared coordination memory for agent swarms: a namespaced record store,
//! a claimable task queue built on it, a ranked context index and an
//! append-only audit trail.
//!
//! # Architecture
//!
//! - **Layer:** Core System
//! - **Purpose:** Domain model, services, storage adapters and HTTP surface

pub mod domain;
pub mod application;
pub mod infrastructure;
pub mod presentation;

pub use domain::*;
