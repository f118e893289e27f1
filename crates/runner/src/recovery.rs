// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Recovery Store (C8): persist the live-process table to a single JSON
//! file on a 10 s cadence (and on graceful `stopAll`), and reload it at
//! boot.

use std::path::PathBuf;

use tc_core::persist;
use tc_core::{RecoveryEntry, RecoverySnapshot};

use crate::RunnerError;

pub struct RecoveryStore {
    path: PathBuf,
}

impl RecoveryStore {
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self { path: data_dir.into().join("recovery.json") }
    }

    pub fn save(&self, entries: Vec<RecoveryEntry>) -> Result<(), RunnerError> {
        let snapshot = RecoverySnapshot { entries };
        persist::save(&self.path, &snapshot)?;
        Ok(())
    }

    pub fn load(&self) -> Result<RecoverySnapshot, RunnerError> {
        Ok(persist::load(&self.path)?.unwrap_or_default())
    }

    pub fn clear(&self) -> Result<(), RunnerError> {
        self.save(Vec::new())
    }
}

#[cfg(test)]
#[path = "recovery_tests.rs"]
mod tests;
