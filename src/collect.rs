use crate::error::CollectError;
use crate::observe::Observer;
use std::collections::BTreeSet;
use std::ffi::OsString;
use std::path::{Path, PathBuf};

/// Extensions picked up when expanding a directory.
pub const SUPPORTED_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "tiff", "bmp"];

pub fn is_supported(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| SUPPORTED_EXTENSIONS.iter().any(|s| s.eq_ignore_ascii_case(e)))
        .unwrap_or(false)
}

/// Deduplicated candidates, ordered by path string.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CandidateSet(Vec<PathBuf>);

impl CandidateSet {
    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, PathBuf> {
        self.0.iter()
    }

    pub fn as_slice(&self) -> &[PathBuf] {
        &self.0
    }
}

impl FromIterator<PathBuf> for CandidateSet {
    fn from_iter<I: IntoIterator<Item = PathBuf>>(iter: I) -> Self {
        let set: BTreeSet<OsString> = iter.into_iter().map(PathBuf::into_os_string).collect();
        Self(set.into_iter().map(PathBuf::from).collect())
    }
}

impl<'a> IntoIterator for &'a CandidateSet {
    type Item = &'a PathBuf;
    type IntoIter = std::slice::Iter<'a, PathBuf>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

/// Expands `inputs` into the set of images to process.
///
/// Directories contribute their direct children with a supported extension,
/// files are taken as given. Anything else is reported to `observer` and
/// skipped.
pub fn collect<P: AsRef<Path>>(inputs: &[P], observer: &dyn Observer) -> CandidateSet {
    collect_with(inputs, observer, expand_dir)
}

fn collect_with<P, L>(inputs: &[P], observer: &dyn Observer, list: L) -> CandidateSet
where
    P: AsRef<Path>,
    L: Fn(&Path) -> std::io::Result<Vec<PathBuf>>,
{
    let mut found = Vec::new();
    for input in inputs {
        let input = input.as_ref();
        if input.is_dir() {
            match list(input) {
                Ok(images) => found.extend(images),
                Err(source) => observer.path_skipped(&CollectError::ReadDir {
                    path: input.to_path_buf(),
                    source,
                }),
            }
        } else if input.is_file() {
            found.push(input.to_path_buf());
        } else if std::fs::symlink_metadata(input).is_ok() {
            // fifos, sockets, dangling symlinks
            observer.path_skipped(&CollectError::NotFileOrDir(input.to_path_buf()));
        } else {
            observer.path_skipped(&CollectError::PathNotFound(input.to_path_buf()));
        }
    }
    found.into_iter().collect()
}

fn expand_dir(dir: &Path) -> std::io::Result<Vec<PathBuf>> {
    let mut images = Vec::new();
    for entry in std::fs::read_dir(dir)? {
        let Ok(entry) = entry else { continue };
        let path = entry.path();
        if is_supported(&path) && path.is_file() {
            images.push(path);
        }
    }
    log::debug!("{}: {} image(s)", dir.display(), images.len());
    Ok(images)
}
