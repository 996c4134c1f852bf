use std::ops::Deref;

use tempfile::TempDir;

use super::{Limits, Sandbox};
use crate::error::{Error, Result};

/// An ephemeral sandbox whose directory is removed when the jail is dropped,
/// whether grading finished, failed, or panicked.
#[derive(Debug)]
pub struct Jail {
    sandbox: Sandbox,
    dir: TempDir,
}

impl Jail {
    const DIR_PREFIX: &str = "gradekit-jail-";

    /// Remove the jail directory now, reporting any failure.
    pub fn close(self) -> Result<()> {
        let Self { sandbox, dir } = self;
        dir.close().map_err(|e| {
            Error::Fs(fsutil::Error::SingleIO(
                "Cannot remove jail dir",
                sandbox.root().to_owned(),
                e,
            ))
        })
    }
}

impl Deref for Jail {
    type Target = Sandbox;

    fn deref(&self) -> &Self::Target {
        &self.sandbox
    }
}

pub fn make_jail(limits: Limits) -> Result<Jail> {
    let dir = tempfile::Builder::new()
        .prefix(Jail::DIR_PREFIX)
        .tempdir()
        .map_err(Error::TempFile)?;
    log::info!("Jail dir is {}", dir.path().to_string_lossy());
    let sandbox = Sandbox::new(dir.path(), limits);
    Ok(Jail { sandbox, dir })
}
