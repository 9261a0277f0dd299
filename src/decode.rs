use crate::error::BoxError;
use image::{DynamicImage, ImageReader, RgbaImage};
use resvg::usvg::{TreeParsing, TreeTextToPath};
use resvg::{tiny_skia, usvg};
use std::path::Path;

fn is_svg(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| e.eq_ignore_ascii_case("svg"))
        .unwrap_or(false)
}

/// Rasterises an SVG, converting text to outlines with the system fonts.
pub fn read_svg(path: &Path) -> Result<DynamicImage, BoxError> {
    let rtree = {
        let opt = usvg::Options::default();
        let mut fontdb = fontdb::Database::new();
        fontdb.load_system_fonts();

        let svg_data = std::fs::read(path)?;
        let mut tree = usvg::Tree::from_data(&svg_data, &opt)
            .map_err(|err| format!("invalid svg: {err}"))?;
        tree.convert_text(&fontdb);
        resvg::Tree::from_usvg(&tree)
    };

    let size = rtree.size.to_int_size();
    let mut pixmap =
        tiny_skia::Pixmap::new(size.width(), size.height()).ok_or("svg has an empty canvas")?;
    rtree.render(tiny_skia::Transform::default(), &mut pixmap.as_mut());
    let img = RgbaImage::from_raw(size.width(), size.height(), pixmap.take())
        .ok_or("svg pixel buffer does not match its size")?;
    Ok(DynamicImage::from(img))
}

/// Decodes the image at `path`. The format is sniffed from the content, so a
/// misnamed file still decodes.
pub fn read_image(path: &Path) -> Result<DynamicImage, BoxError> {
    if is_svg(path) {
        return read_svg(path);
    }
    Ok(ImageReader::open(path)?.with_guessed_format()?.decode()?)
}
