use crate::error::BoxError;
use image::DynamicImage;
use rusty_tesseract::{Args, Image};
use std::collections::HashMap;

/// Recognition settings passed through to the engine untouched.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Settings {
    pub lang: String,
    /// Engine mode, 0..=3.
    pub oem: u8,
    /// Page segmentation mode, 0..=13.
    pub psm: u8,
    pub dpi: Option<i32>,
    pub variables: HashMap<String, String>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            lang: "eng".into(),
            oem: 3,
            psm: 6,
            dpi: None,
            variables: HashMap::new(),
        }
    }
}

/// A recognized word with its bounding box in image pixels.
#[derive(Clone, Debug, PartialEq)]
pub struct Word {
    pub text: String,
    pub left: i32,
    pub top: i32,
    pub width: i32,
    pub height: i32,
    pub conf: f32,
}

/// The OCR collaborator.
pub trait Recognizer {
    fn recognize(&self, image: &DynamicImage, settings: &Settings) -> Result<String, BoxError>;

    /// Word-level output. Blank words are dropped.
    fn words(&self, image: &DynamicImage, settings: &Settings) -> Result<Vec<Word>, BoxError>;
}

/// Runs the system `tesseract` binary.
///
/// The binary is looked up on `PATH`; there is no separate command override,
/// so put the wanted installation first on `PATH` to select it.
#[derive(Clone, Copy, Debug, Default)]
pub struct Tesseract;

impl Tesseract {
    fn args(settings: &Settings) -> Args {
        Args {
            lang: settings.lang.clone(),
            config_variables: settings.variables.clone(),
            dpi: settings.dpi,
            psm: Some(settings.psm.into()),
            oem: Some(settings.oem.into()),
        }
    }
}

impl Recognizer for Tesseract {
    fn recognize(&self, image: &DynamicImage, settings: &Settings) -> Result<String, BoxError> {
        let image = Image::from_dynamic_image(image)?;
        Ok(rusty_tesseract::image_to_string(&image, &Self::args(settings))?)
    }

    fn words(&self, image: &DynamicImage, settings: &Settings) -> Result<Vec<Word>, BoxError> {
        let image = Image::from_dynamic_image(image)?;
        let output = rusty_tesseract::image_to_data(&image, &Self::args(settings))?;
        Ok(output
            .data
            .into_iter()
            .filter(|d| !d.text.trim().is_empty())
            .map(|d| Word {
                text: d.text,
                left: d.left,
                top: d.top,
                width: d.width,
                height: d.height,
                conf: d.conf,
            })
            .collect())
    }
}
