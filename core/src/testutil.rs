use std::{
    os::unix::fs::PermissionsExt,
    path::{Path, PathBuf},
};

/// Write an executable `/bin/sh` script and return its absolute path.
pub(crate) fn write_script(dir: &Path, name: &str, body: &str) -> PathBuf {
    let path = dir.join(name);
    fsutil::write_with_mkdir(&path, format!("#!/bin/sh\n{}\n", body)).unwrap();
    std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
    path
}
