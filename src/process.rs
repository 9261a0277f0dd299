use crate::collect::CandidateSet;
use crate::decode::read_image;
use crate::engine::{Recognizer, Settings};
use crate::error::{FailureKind, ItemError};
use crate::observe::{LogObserver, Observer};
use anyhow::{Context, Result};
use std::collections::HashSet;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

/// What gets written for each recognized image.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum OutputFormat {
    /// Plain text, `<stem>.txt`.
    #[default]
    Text,
    /// Word boxes, `<stem>.json`.
    Json,
}

impl OutputFormat {
    pub fn extension(self) -> &'static str {
        match self {
            Self::Text => "txt",
            Self::Json => "json",
        }
    }
}

/// Outcome counts of one batch.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Summary {
    pub total: usize,
    /// `(input, artifact)` for every success.
    pub written: Vec<(PathBuf, PathBuf)>,
    pub failed: Vec<(PathBuf, FailureKind)>,
}

impl Summary {
    pub fn failures_of(&self, kind: FailureKind) -> usize {
        self.failed.iter().filter(|(_, k)| *k == kind).count()
    }
}

/// Fills a temp file next to `output` and renames it over `output` once
/// flushed. On error the temp file is removed and `output` is untouched.
fn write_atomic<F>(output: &Path, fill: F) -> std::io::Result<()>
where
    F: FnOnce(&mut dyn Write) -> std::io::Result<()>,
{
    let dir = match output.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    let mut tmp = NamedTempFile::new_in(dir)?;
    {
        let mut w = BufWriter::new(tmp.as_file_mut());
        fill(&mut w)?;
        w.flush()?;
    }
    tmp.persist(output).map_err(|e| e.error)?;
    Ok(())
}

pub struct Processor<R, O = LogObserver> {
    recognizer: R,
    observer: O,
    format: OutputFormat,
}

impl<R: Recognizer> Processor<R> {
    pub fn new(recognizer: R) -> Self {
        Self::with_observer(recognizer, LogObserver)
    }
}

impl<R: Recognizer, O: Observer> Processor<R, O> {
    pub fn with_observer(recognizer: R, observer: O) -> Self {
        Self {
            recognizer,
            observer,
            format: OutputFormat::default(),
        }
    }

    pub fn format(mut self, format: OutputFormat) -> Self {
        self.format = format;
        self
    }

    pub fn observer(&self) -> &O {
        &self.observer
    }

    /// Name of the artifact written for `input`.
    pub fn artifact_path(&self, input: &Path, out_dir: &Path) -> Option<PathBuf> {
        let stem = input.file_stem()?;
        let mut name = stem.to_os_string();
        name.push(".");
        name.push(self.format.extension());
        Some(out_dir.join(name))
    }

    fn render(&self, image: &image::DynamicImage, settings: &Settings) -> Result<String, ItemError> {
        match self.format {
            OutputFormat::Text => self
                .recognizer
                .recognize(image, settings)
                .map_err(ItemError::Engine),
            OutputFormat::Json => {
                let words = self
                    .recognizer
                    .words(image, settings)
                    .map_err(ItemError::Engine)?;
                let words = words
                    .into_iter()
                    .map(|w| {
                        serde_json::json!({
                            "word": w.text,
                            "left": w.left,
                            "top": w.top,
                            "width": w.width,
                            "height": w.height,
                            "conf": w.conf,
                        })
                    })
                    .collect::<Vec<_>>();
                let doc = serde_json::json!({ "words": words });
                serde_json::to_string_pretty(&doc).map_err(|e| ItemError::Write(e.into()))
            }
        }
    }

    fn write_artifact(&self, output: &Path, contents: &str) -> Result<(), ItemError> {
        write_atomic(output, |w| w.write_all(contents.as_bytes()))?;
        Ok(())
    }

    /// Decode, recognize, write. The image is dropped on return.
    pub fn process_one(
        &self,
        input: &Path,
        settings: &Settings,
        out_dir: &Path,
    ) -> Result<PathBuf, ItemError> {
        let output = self.artifact_path(input, out_dir).ok_or_else(|| {
            ItemError::Write(std::io::Error::new(
                std::io::ErrorKind::InvalidInput,
                "input has no file name to derive an output name from",
            ))
        })?;
        let image = read_image(input).map_err(ItemError::Decode)?;
        let text = self.render(&image, settings)?;
        drop(image);
        self.write_artifact(&output, &text)?;
        Ok(output)
    }

    /// Runs every candidate once, in order. Only a failure to create
    /// `out_dir` is returned as an error; per-item failures land in the
    /// summary.
    pub fn process(
        &self,
        candidates: &CandidateSet,
        settings: &Settings,
        out_dir: &Path,
    ) -> Result<Summary> {
        std::fs::create_dir_all(out_dir)
            .with_context(|| format!("cannot create output directory {}", out_dir.display()))?;

        let total = candidates.len();
        self.observer.batch_started(total, out_dir);
        let mut summary = Summary {
            total,
            ..Summary::default()
        };
        let mut seen = HashSet::new();
        for (index, input) in candidates.iter().enumerate() {
            self.observer.item_started(index, total, input);
            match self.process_one(input, settings, out_dir) {
                Ok(artifact) => {
                    if !seen.insert(artifact.clone()) {
                        self.observer.artifact_overwritten(input, &artifact);
                    }
                    self.observer.item_written(input, &artifact);
                    summary.written.push((input.clone(), artifact));
                }
                Err(err) => {
                    self.observer.item_failed(input, &err);
                    summary.failed.push((input.clone(), err.kind()));
                }
            }
        }
        self.observer.batch_finished(&summary);
        Ok(summary)
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::collect::collect;
    use crate::engine::Word;
    use crate::error::BoxError;
    use crate::observe::testing::{Event, Recorder};
    use image::{DynamicImage, GrayImage, ImageFormat, Luma};
    use std::fs;

    /// Answers with a fixed text, or fails for images of a given width.
    pub struct FakeEngine {
        pub text: String,
        pub fail_width: Option<u32>,
    }

    impl FakeEngine {
        pub fn new(text: &str) -> Self {
            Self {
                text: text.into(),
                fail_width: None,
            }
        }

        fn check(&self, image: &DynamicImage) -> Result<(), BoxError> {
            if Some(image.width()) == self.fail_width {
                return Err("failed loading language 'xxx'".into());
            }
            Ok(())
        }
    }

    impl Recognizer for FakeEngine {
        fn recognize(&self, image: &DynamicImage, _settings: &Settings) -> Result<String, BoxError> {
            self.check(image)?;
            Ok(self.text.clone())
        }

        fn words(&self, image: &DynamicImage, _settings: &Settings) -> Result<Vec<Word>, BoxError> {
            self.check(image)?;
            Ok(vec![Word {
                text: self.text.clone(),
                left: 1,
                top: 2,
                width: image.width() as i32,
                height: image.height() as i32,
                conf: 91.5,
            }])
        }
    }

    pub fn write_png(dir: &Path, name: &str, width: u32) -> anyhow::Result<PathBuf> {
        let path = dir.join(name);
        GrayImage::from_pixel(width, 1, Luma([255])).save_with_format(&path, ImageFormat::Png)?;
        Ok(path)
    }

    #[test]
    fn test_end_to_end_directory() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        let input = dir.path().join("in");
        fs::create_dir(&input)?;
        let a = write_png(&input, "a.png", 1)?;
        fs::write(input.join("b.txt"), "not an image")?;
        let out = dir.path().join("out");

        let recorder = Recorder::default();
        let candidates = collect(&[&input], &recorder);
        assert_eq!(candidates.as_slice(), &[a.clone()]);

        let processor = Processor::with_observer(FakeEngine::new("X"), &recorder);
        let summary = processor.process(&candidates, &Settings::default(), &out)?;

        assert_eq!(fs::read_to_string(out.join("a.txt"))?, "X");
        assert_eq!(summary.total, 1);
        assert_eq!(summary.written, vec![(a, out.join("a.txt"))]);
        assert!(summary.failed.is_empty());
        assert!(!recorder
            .events()
            .iter()
            .any(|e| format!("{e:?}").contains("b.txt")));
        Ok(())
    }

    #[test]
    fn test_failures_are_isolated() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        let corrupt = dir.path().join("a.png");
        fs::write(&corrupt, b"garbage")?;
        let engine_fail = write_png(dir.path(), "b.png", 7)?;
        let good = write_png(dir.path(), "c.png", 2)?;
        let missing = dir.path().join("d.png");
        let out = dir.path().join("out");

        let candidates: CandidateSet = vec![
            missing.clone(),
            good.clone(),
            engine_fail.clone(),
            corrupt.clone(),
        ]
        .into_iter()
        .collect();
        let recorder = Recorder::default();
        let engine = FakeEngine {
            text: "ok".into(),
            fail_width: Some(7),
        };
        let processor = Processor::with_observer(engine, &recorder);
        let summary = processor.process(&candidates, &Settings::default(), &out)?;

        assert_eq!(summary.total, 4);
        assert_eq!(summary.written.len(), 1);
        assert_eq!(summary.failures_of(FailureKind::Decode), 2);
        assert_eq!(summary.failures_of(FailureKind::Engine), 1);
        assert_eq!(
            recorder.count(|e| matches!(e, Event::Processing(_))),
            candidates.len()
        );
        assert_eq!(
            recorder.count(|e| *e == Event::Failed(corrupt.clone(), FailureKind::Decode)),
            1
        );
        assert!(!out.join("a.txt").exists());
        assert!(!out.join("b.txt").exists());
        assert!(!out.join("d.txt").exists());
        assert_eq!(fs::read_to_string(out.join("c.txt"))?, "ok");
        Ok(())
    }

    #[test]
    fn test_rerun_overwrites() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        let a = write_png(dir.path(), "a.png", 1)?;
        let out = dir.path().join("out");
        fs::create_dir(&out)?;
        fs::write(out.join("a.txt"), "stale content that is much longer")?;

        let candidates: CandidateSet = std::iter::once(a).collect();
        let processor = Processor::with_observer(FakeEngine::new("fresh"), Recorder::default());
        processor.process(&candidates, &Settings::default(), &out)?;
        let first = fs::read_to_string(out.join("a.txt"))?;
        processor.process(&candidates, &Settings::default(), &out)?;
        let second = fs::read_to_string(out.join("a.txt"))?;

        assert_eq!(first, "fresh");
        assert_eq!(first, second);
        Ok(())
    }

    #[test]
    fn test_empty_text_is_success() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        let a = write_png(dir.path(), "blank.png", 1)?;
        let out = dir.path().join("out");
        let candidates: CandidateSet = std::iter::once(a).collect();
        let summary = Processor::with_observer(FakeEngine::new(""), Recorder::default())
            .process(&candidates, &Settings::default(), &out)?;
        assert_eq!(summary.written.len(), 1);
        assert_eq!(fs::read_to_string(out.join("blank.txt"))?, "");
        Ok(())
    }

    #[test]
    fn test_write_failure() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        let a = write_png(dir.path(), "a.png", 1)?;
        let b = write_png(dir.path(), "b.png", 1)?;
        let out = dir.path().join("out");
        // A directory where the artifact should go makes the open fail.
        fs::create_dir_all(out.join("a.txt"))?;

        let candidates: CandidateSet = vec![a, b].into_iter().collect();
        let recorder = Recorder::default();
        let summary = Processor::with_observer(FakeEngine::new("t"), &recorder).process(
            &candidates,
            &Settings::default(),
            &out,
        )?;
        assert_eq!(summary.failures_of(FailureKind::Write), 1);
        assert!(out.join("b.txt").is_file());
        Ok(())
    }

    #[test]
    fn test_failed_write_keeps_previous_artifact() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        let artifact = dir.path().join("a.txt");
        fs::write(&artifact, "previous good result")?;

        let err = write_atomic(&artifact, |w| {
            w.write_all(&[b'x'; 64 * 1024])?;
            Err(std::io::Error::new(
                std::io::ErrorKind::Other,
                "file size limit exceeded",
            ))
        })
        .expect_err("fill error must surface");
        assert_eq!(err.to_string(), "file size limit exceeded");

        assert_eq!(fs::read_to_string(&artifact)?, "previous good result");
        let names = fs::read_dir(dir.path())?
            .map(|e| e.map(|e| e.file_name()))
            .collect::<std::io::Result<Vec<_>>>()?;
        assert_eq!(names, vec![std::ffi::OsString::from("a.txt")]);
        Ok(())
    }

    #[test]
    fn test_failed_write_leaves_no_artifact() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        let artifact = dir.path().join("fresh.txt");
        assert!(write_atomic(&artifact, |w| {
            w.write_all(b"partial")?;
            Err(std::io::Error::from(std::io::ErrorKind::WriteZero))
        })
        .is_err());
        assert!(!artifact.exists());
        assert_eq!(fs::read_dir(dir.path())?.count(), 0);

        write_atomic(&artifact, |w| w.write_all(b"complete"))?;
        assert_eq!(fs::read_to_string(&artifact)?, "complete");
        Ok(())
    }

    #[test]
    fn test_stem_collision_warns() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        let png = write_png(dir.path(), "scan.png", 1)?;
        let bmp = dir.path().join("scan.bmp");
        GrayImage::from_pixel(1, 1, Luma([0])).save_with_format(&bmp, ImageFormat::Bmp)?;
        let out = dir.path().join("out");

        let candidates: CandidateSet = vec![png, bmp.clone()].into_iter().collect();
        let recorder = Recorder::default();
        let summary = Processor::with_observer(FakeEngine::new("t"), &recorder).process(
            &candidates,
            &Settings::default(),
            &out,
        )?;
        assert_eq!(summary.written.len(), 2);
        assert_eq!(
            recorder.count(|e| matches!(e, Event::Overwritten(_))),
            1
        );
        // scan.bmp sorts first, so scan.png is the overwriting one.
        assert!(!recorder.events().contains(&Event::Overwritten(bmp)));
        Ok(())
    }

    #[test]
    fn test_json_format() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        let a = write_png(dir.path(), "page.png", 4)?;
        let out = dir.path().join("out");
        let candidates: CandidateSet = std::iter::once(a).collect();
        Processor::with_observer(FakeEngine::new("word"), Recorder::default())
            .format(OutputFormat::Json)
            .process(&candidates, &Settings::default(), &out)?;

        let doc: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(out.join("page.json"))?)?;
        assert_eq!(doc["words"][0]["word"], "word");
        assert_eq!(doc["words"][0]["width"], 4);
        assert_eq!(doc["words"][0]["top"], 2);
        Ok(())
    }

    #[test]
    fn test_artifact_path() {
        let processor = Processor::new(FakeEngine::new(""));
        assert_eq!(
            processor.artifact_path(Path::new("in/photo.v2.JPG"), Path::new("out")),
            Some(PathBuf::from("out/photo.v2.txt"))
        );
        assert_eq!(
            processor.artifact_path(Path::new("noext"), Path::new("out")),
            Some(PathBuf::from("out/noext.txt"))
        );
        assert_eq!(processor.artifact_path(Path::new(".."), Path::new("out")), None);
    }
}
