// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use super::TestRule;
use crate::{
    description::Description,
    failure::{MultipleFailures, TestError},
    helpers::lock,
    statement::{SharedStatement, statement},
};
use camino::{Utf8Path, Utf8PathBuf};
use camino_tempfile::Utf8TempDir;
use std::{
    fs, io,
    sync::{Arc, Mutex},
};
use tracing::debug;

/// Creates a fresh temporary directory before a statement and deletes it afterwards.
///
/// Clones share the directory, so a clone captured by the test body can create files in the
/// directory created for the running unit.
#[derive(Clone, Debug, Default)]
pub struct TemporaryDirectory {
    parent: Option<Utf8PathBuf>,
    dir: Arc<Mutex<Option<Utf8TempDir>>>,
}

impl TemporaryDirectory {
    /// Creates a rule whose directories live in the system temporary directory.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a rule whose directories live in `parent`.
    pub fn new_in(parent: impl Into<Utf8PathBuf>) -> Self {
        Self {
            parent: Some(parent.into()),
            dir: Arc::default(),
        }
    }

    /// Returns the path of the current directory, or `None` outside of a run.
    pub fn path(&self) -> Option<Utf8PathBuf> {
        lock(&self.dir).as_ref().map(|dir| dir.path().to_owned())
    }

    /// Creates an empty file with the given name in the current directory.
    pub fn new_file(&self, name: impl AsRef<Utf8Path>) -> Result<Utf8PathBuf, TestError> {
        let path = self.root()?.join(name);
        fs::File::create_new(&path).map_err(TestError::unexpected)?;
        Ok(path)
    }

    /// Creates a directory, and any missing parents, at the given relative path in the current
    /// directory.
    pub fn new_folder(&self, path: impl AsRef<Utf8Path>) -> Result<Utf8PathBuf, TestError> {
        let path = self.root()?.join(path);
        fs::create_dir_all(&path).map_err(TestError::unexpected)?;
        Ok(path)
    }

    fn root(&self) -> Result<Utf8PathBuf, TestError> {
        self.path().ok_or_else(|| {
            TestError::unexpected(io::Error::other(
                "temporary directory has not been created yet",
            ))
        })
    }

    fn create(&self) -> io::Result<()> {
        let mut builder = camino_tempfile::Builder::new();
        builder.prefix("trial-");
        let dir = match &self.parent {
            Some(parent) => builder.tempdir_in(parent)?,
            None => builder.tempdir()?,
        };
        debug!(path = %dir.path(), "created temporary directory");
        *lock(&self.dir) = Some(dir);
        Ok(())
    }

    fn delete(&self) -> io::Result<()> {
        match lock(&self.dir).take() {
            Some(dir) => dir.close(),
            None => Ok(()),
        }
    }
}

impl TestRule for TemporaryDirectory {
    fn apply(&self, base: SharedStatement, _description: &Description) -> SharedStatement {
        let rule = self.clone();
        statement(move || {
            rule.create().map_err(TestError::unexpected)?;

            let mut errors = Vec::new();
            if let Err(error) = base.evaluate() {
                errors.push(error);
            }
            if let Err(error) = rule.delete() {
                errors.push(TestError::unexpected(error));
            }
            MultipleFailures::assert_empty(errors)
        })
    }
}
