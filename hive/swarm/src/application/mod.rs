// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

pub mod handlers;
pub mod reaper;
pub mod worker;

pub use handlers::{builtin_handler, builtin_registry, BUILTIN_HANDLERS};
pub use reaper::LeaseReaper;
pub use worker::{PollReport, PollingWorker, WorkerSettings};
