use serde::Serialize;
use std::{
    fs::{self, ReadDir},
    path::{Path, PathBuf},
    time::SystemTime,
};

pub mod error {
    use std::{io, path::PathBuf};

    pub type Result<T> = std::result::Result<T, self::Error>;

    type Msg = &'static str;

    #[derive(Debug, thiserror::Error)]
    pub enum Error {
        #[error("{0} ({1}): {2}")]
        SingleIO(Msg, PathBuf, #[source] io::Error),

        #[error("{0} (from='{1}', to='{2}'): {3}")]
        FromToIO(Msg, PathBuf, PathBuf, #[source] io::Error),

        #[error("Cannot serialize to JSON (dest='{0}'): {1}")]
        SerializeToJson(PathBuf, #[source] serde_json::Error),
    }
}
pub use error::{Error, Result};

#[must_use]
pub fn mkdir_all(path: impl AsRef<Path>) -> Result<()> {
    let dir = path.as_ref();
    fs::create_dir_all(dir).map_err(|e| Error::SingleIO("Cannot create dir", dir.to_owned(), e))
}

#[must_use]
pub fn write<P, C>(filepath: P, contents: C) -> Result<()>
where
    P: AsRef<Path>,
    C: AsRef<[u8]>,
{
    fs::write(&filepath, contents)
        .map_err(|e| Error::SingleIO("Cannot write file", filepath.as_ref().to_owned(), e))
}

#[must_use]
pub fn write_with_mkdir<P, C>(filepath: P, contents: C) -> Result<()>
where
    P: AsRef<Path>,
    C: AsRef<[u8]>,
{
    if let Some(dir) = filepath.as_ref().parent() {
        self::mkdir_all(dir)?;
    }
    self::write(filepath, contents)
}

#[must_use]
pub fn read_to_string(filepath: impl AsRef<Path>) -> Result<String> {
    fs::read_to_string(&filepath)
        .map_err(|e| Error::SingleIO("Cannot read file", filepath.as_ref().to_owned(), e))
}

#[must_use]
pub fn write_json_with_mkdir<P, T>(filepath: P, data: &T) -> Result<()>
where
    P: AsRef<Path>,
    T: Serialize,
{
    let s = serde_json::to_string_pretty(data)
        .map_err(|e| Error::SerializeToJson(filepath.as_ref().to_owned(), e))?;
    write_with_mkdir(filepath, &s)
}

#[must_use]
pub fn copy_file(from: impl AsRef<Path>, to: impl AsRef<Path>) -> Result<u64> {
    fs::copy(&from, &to).map_err(|e| {
        Error::FromToIO(
            "Cannot copy file",
            from.as_ref().to_owned(),
            to.as_ref().to_owned(),
            e,
        )
    })
}

#[derive(Debug, Clone)]
pub struct OptCopyContents {
    pub overwrite_existing_file: bool,
}

/// Copy everything inside `src_dir` into `dst_dir` (like `cp -r src/* dst`).
/// Entries whose file name starts with `.` are copied as well.
#[must_use]
pub fn copy_contents_all(
    src_dir: impl AsRef<Path>,
    dst_dir: impl AsRef<Path>,
    opt: &OptCopyContents,
) -> Result<()> {
    self::mkdir_all(&dst_dir)?;
    for entry in self::read_dir(&src_dir)? {
        let entry = entry.map_err(|e| {
            Error::FromToIO(
                "Cannot access dir entry on `copy_contents_all()`",
                src_dir.as_ref().to_owned(),
                dst_dir.as_ref().to_owned(),
                e,
            )
        })?;
        let dst = dst_dir.as_ref().join(entry.file_name());
        let ty = entry.file_type().map_err(|e| {
            Error::SingleIO(
                "Cannot get filetype on `copy_contents_all()`",
                entry.path(),
                e,
            )
        })?;
        if ty.is_dir() {
            self::copy_contents_all(entry.path(), dst, opt)?;
        } else if opt.overwrite_existing_file || !dst.exists() {
            self::copy_file(entry.path(), dst)?;
        }
    }
    Ok(())
}

/// Copy a file or a whole directory to `dst`, overwriting existing files.
#[must_use]
pub fn copy_recursively(src: impl AsRef<Path>, dst: impl AsRef<Path>) -> Result<()> {
    let src = src.as_ref();
    if src.is_dir() {
        let opt = OptCopyContents {
            overwrite_existing_file: true,
        };
        self::copy_contents_all(src, dst, &opt)
    } else {
        self::copy_file(src, dst).map(|_| ())
    }
}

#[must_use]
pub fn read_dir(dir: impl AsRef<Path>) -> Result<ReadDir> {
    fs::read_dir(&dir).map_err(|e| Error::SingleIO("Cannot read dir", dir.as_ref().to_owned(), e))
}

#[must_use]
pub fn modified_time(filepath: impl AsRef<Path>) -> Result<SystemTime> {
    let filepath = filepath.as_ref();
    fs::metadata(filepath)
        .and_then(|info| info.modified())
        .map_err(|e| Error::SingleIO("Cannot get modified time", filepath.to_owned(), e))
}

/// Returns the names of regular files directly inside `dir` matching `filename_pattern`,
/// sorted by name.
#[must_use]
pub fn find_files(dir: impl AsRef<Path>, filename_pattern: &::glob::Pattern) -> Result<Vec<String>> {
    let mut names = Vec::new();
    for entry in self::read_dir(&dir)?.filter_map(std::result::Result::ok) {
        let Ok(file_type) = entry.file_type() else {
            continue
        };
        if file_type.is_dir() {
            continue;
        }
        let filename = entry.file_name().to_string_lossy().into_owned();
        if filename_pattern.matches(&filename) {
            names.push(filename);
        }
    }
    names.sort();
    Ok(names)
}

pub struct SingleFileDriver {
    pub filepath: PathBuf,
}

impl SingleFileDriver {
    pub fn new(filepath: impl AsRef<Path>) -> Self {
        Self {
            filepath: filepath.as_ref().to_owned(),
        }
    }

    pub fn write(&self, contents: &str) -> Result<()> {
        self::write_with_mkdir(&self.filepath, contents)
    }

    pub fn read(&self) -> Result<String> {
        self::read_to_string(&self.filepath)
    }

    pub fn exists(&self) -> bool {
        self.filepath.is_file()
    }

    pub fn modified(&self) -> Result<SystemTime> {
        self::modified_time(&self.filepath)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn find_files_matches_only_files() {
        let tmp = tempfile::tempdir().unwrap();
        let dir = tmp.path();
        write(dir.join("test-2.txt"), "").unwrap();
        write(dir.join("test-1.txt"), "").unwrap();
        write(dir.join("test-1.out"), "").unwrap();
        write(dir.join("notes.txt"), "").unwrap();
        mkdir_all(dir.join("test-dir.txt")).unwrap();

        let pat = ::glob::Pattern::new("test-*.txt").unwrap();
        assert_eq!(
            find_files(dir, &pat).unwrap(),
            vec!["test-1.txt".to_owned(), "test-2.txt".to_owned()]
        );
    }

    #[test]
    fn copy_contents_all_copies_nested_dirs() {
        let tmp = tempfile::tempdir().unwrap();
        let src = tmp.path().join("src");
        let dst = tmp.path().join("dst");
        write_with_mkdir(src.join("a/b/c.txt"), "hello").unwrap();
        write_with_mkdir(src.join("top.txt"), "top").unwrap();
        write_with_mkdir(dst.join("top.txt"), "keep").unwrap();

        let opt = OptCopyContents {
            overwrite_existing_file: false,
        };
        copy_contents_all(&src, &dst, &opt).unwrap();
        assert_eq!(read_to_string(dst.join("a/b/c.txt")).unwrap(), "hello");
        assert_eq!(read_to_string(dst.join("top.txt")).unwrap(), "keep");

        copy_recursively(src.join("top.txt"), dst.join("top.txt")).unwrap();
        assert_eq!(read_to_string(dst.join("top.txt")).unwrap(), "top");
    }

    #[test]
    fn errors_carry_the_path() {
        let err = read_to_string("/nonexistent/gradekit/file").unwrap_err();
        let msg = err.to_string();
        assert!(msg.starts_with("Cannot read file (/nonexistent/gradekit/file)"), "{}", msg);
    }
}
