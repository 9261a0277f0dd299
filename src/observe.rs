use crate::error::{CollectError, ItemError};
use crate::process::Summary;
use std::path::Path;

/// Receives the diagnostics of one run.
///
/// Every method has a no-op default so callers only override what they need.
pub trait Observer {
    fn path_skipped(&self, _error: &CollectError) {}
    fn batch_started(&self, _total: usize, _out_dir: &Path) {}
    fn item_started(&self, _index: usize, _total: usize, _path: &Path) {}
    fn item_written(&self, _path: &Path, _artifact: &Path) {}
    fn item_failed(&self, _path: &Path, _error: &ItemError) {}
    fn artifact_overwritten(&self, _path: &Path, _artifact: &Path) {}
    fn batch_finished(&self, _summary: &Summary) {}
}

/// Forwards diagnostics to the `log` facade.
#[derive(Clone, Copy, Debug, Default)]
pub struct LogObserver;

impl Observer for LogObserver {
    fn path_skipped(&self, error: &CollectError) {
        log::warn!("skipping input: {error}");
    }

    fn batch_started(&self, total: usize, out_dir: &Path) {
        log::info!(
            "starting batch of {total} image(s), writing to {}",
            out_dir.display()
        );
    }

    fn item_started(&self, index: usize, total: usize, path: &Path) {
        log::info!("processing [{}/{total}] {}", index + 1, path.display());
    }

    fn item_written(&self, path: &Path, artifact: &Path) {
        log::debug!("{} -> {}", path.display(), artifact.display());
    }

    fn item_failed(&self, path: &Path, error: &ItemError) {
        log::error!("{}: {} ({error})", path.display(), error.kind());
    }

    fn artifact_overwritten(&self, path: &Path, artifact: &Path) {
        log::warn!(
            "{} overwrites {} written earlier in this batch",
            path.display(),
            artifact.display()
        );
    }

    fn batch_finished(&self, summary: &Summary) {
        log::info!(
            "batch finished: {} processed, {} succeeded, {} failed",
            summary.total,
            summary.written.len(),
            summary.failed.len()
        );
    }
}

impl<O: Observer + ?Sized> Observer for &O {
    fn path_skipped(&self, error: &CollectError) {
        (**self).path_skipped(error)
    }
    fn batch_started(&self, total: usize, out_dir: &Path) {
        (**self).batch_started(total, out_dir)
    }
    fn item_started(&self, index: usize, total: usize, path: &Path) {
        (**self).item_started(index, total, path)
    }
    fn item_written(&self, path: &Path, artifact: &Path) {
        (**self).item_written(path, artifact)
    }
    fn item_failed(&self, path: &Path, error: &ItemError) {
        (**self).item_failed(path, error)
    }
    fn artifact_overwritten(&self, path: &Path, artifact: &Path) {
        (**self).artifact_overwritten(path, artifact)
    }
    fn batch_finished(&self, summary: &Summary) {
        (**self).batch_finished(summary)
    }
}
