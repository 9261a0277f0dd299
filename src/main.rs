use anyhow::{anyhow, Result};
use clap::{Parser, ValueEnum};
use ocrbatch::{OutputFormat, Processor, Settings, Tesseract};
use std::path::PathBuf;

#[derive(Clone, Copy, ValueEnum)]
enum Format {
    Text,
    Json,
}

impl From<Format> for OutputFormat {
    fn from(format: Format) -> Self {
        match format {
            Format::Text => OutputFormat::Text,
            Format::Json => OutputFormat::Json,
        }
    }
}

/// Convert images to text with Tesseract.
#[derive(Parser)]
#[clap(version, about)]
struct Opts {
    /// Image files or directories of images.
    #[clap(required = true)]
    input: Vec<PathBuf>,
    /// Directory the text files are written to.
    #[clap(short, long, default_value = ".")]
    output_dir: PathBuf,
    /// Tesseract language code, e.g. `eng` or `eng+deu`.
    #[clap(short, long, default_value = "eng")]
    lang: String,
    /// Page segmentation mode.
    #[clap(long, default_value_t = 6, value_parser = clap::value_parser!(u8).range(0..=13))]
    psm: u8,
    /// OCR engine mode.
    #[clap(long, default_value_t = 3, value_parser = clap::value_parser!(u8).range(0..=3))]
    oem: u8,
    /// Resolution hint for the engine, in dots per inch.
    #[clap(long)]
    dpi: Option<i32>,
    /// Tesseract config variable, repeatable.
    #[clap(short, long = "config", value_name = "KEY=VALUE", value_parser = parse_key_val)]
    config: Vec<(String, String)>,
    #[clap(long, value_enum, default_value_t = Format::Text)]
    format: Format,
}

fn parse_key_val(s: &str) -> Result<(String, String)> {
    let (key, value) = s
        .split_once('=')
        .ok_or_else(|| anyhow!("expected KEY=VALUE, got `{s}`"))?;
    if key.is_empty() {
        return Err(anyhow!("empty key in `{s}`"));
    }
    Ok((key.to_string(), value.to_string()))
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let opts = Opts::parse();
    let settings = Settings {
        lang: opts.lang,
        oem: opts.oem,
        psm: opts.psm,
        dpi: opts.dpi,
        variables: opts.config.into_iter().collect(),
    };
    let processor = Processor::new(Tesseract).format(opts.format.into());
    ocrbatch::image_to_text(&processor, &opts.input, &settings, &opts.output_dir)?;
    Ok(())
}
