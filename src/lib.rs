pub mod collect;
pub mod decode;
pub mod engine;
pub mod error;
pub mod observe;
pub mod process;

pub use collect::{collect, CandidateSet, SUPPORTED_EXTENSIONS};
pub use engine::{Recognizer, Settings, Tesseract, Word};
pub use error::{CollectError, FailureKind, ItemError, NoCandidatesFound};
pub use observe::{LogObserver, Observer};
pub use process::{OutputFormat, Processor, Summary};

use anyhow::Result;
use std::path::{Path, PathBuf};

/// Collects images from `inputs` and runs them through `processor`.
///
/// Fails with [`NoCandidatesFound`] before touching `output` when there is
/// nothing to process. Per-image failures are reported through the
/// processor's observer and counted in the returned summary.
pub fn image_to_text<R: Recognizer, O: Observer>(
    processor: &Processor<R, O>,
    inputs: &[PathBuf],
    settings: &Settings,
    output: &Path,
) -> Result<Summary> {
    let candidates = collect(inputs, processor.observer());
    if candidates.is_empty() {
        return Err(NoCandidatesFound.into());
    }
    processor.process(&candidates, settings, output)
}
