// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use thiserror::Error;

#[derive(Debug, Error)]
pub enum SupervisorError {
    #[error("analysis call failed: {0}")]
    Analysis(String),
    #[error("analysis call timed out after {0}ms")]
    Timeout(u64),
    #[error("could not parse analysis response: {0}")]
    InvalidResponse(String),
    #[error("persistence error: {0}")]
    Persist(#[from] tc_core::persist::PersistError),
}
