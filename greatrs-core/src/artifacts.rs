//! Persisted image artifacts: fetched chart/plot PNGs and their naming.

use std::io::Cursor;
use std::path::PathBuf;

use image::{DynamicImage, ImageFormat, Rgba, RgbaImage};
use log::info;

use crate::config::{Output, PlotKind};
use crate::errors::Result;

///
/// Composite a fetched PNG onto an opaque white canvas.
///
/// GREAT serves its distance plots with a transparent background, which
/// renders as black in most viewers; flattening fixes that.
///
pub fn flatten_onto_white(bytes: &[u8]) -> Result<Vec<u8>> {
    let decoded = image::load_from_memory(bytes)?.into_rgba8();
    let (width, height) = decoded.dimensions();

    let mut canvas = RgbaImage::from_pixel(width, height, Rgba([255, 255, 255, 255]));
    image::imageops::overlay(&mut canvas, &decoded, 0, 0);

    let flattened = DynamicImage::ImageRgba8(canvas).into_rgb8();
    let mut out = Cursor::new(Vec::new());
    flattened.write_to(&mut out, ImageFormat::Png)?;
    Ok(out.into_inner())
}

/// Write `{stem}.png` into the working directory.
pub fn write_png(stem: &str, bytes: &[u8]) -> Result<PathBuf> {
    let path = PathBuf::from(format!("{stem}.png"));
    std::fs::write(&path, bytes)?;
    info!("image saved as {}", path.display());
    Ok(path)
}

/// File stem for a distance plot: caller-supplied, or the output mode name.
pub fn distance_plot_stem(output: Output, stem: Option<&str>) -> String {
    stem.map_or_else(|| output.to_string(), str::to_string)
}

/// File stem for a chart rendered by the site widget.
pub fn chart_plot_stem(output: Output, plot: PlotKind, stem: Option<&str>) -> String {
    match stem {
        Some(s) => s.to_string(),
        None => format!("{output}_{plot}_plot"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::config::{Output, PlotKind};
    use pretty_assertions::assert_eq;
    use rstest::*;

    fn transparent_png() -> Vec<u8> {
        // 2x1: opaque red, fully transparent
        let mut img = RgbaImage::new(2, 1);
        img.put_pixel(0, 0, Rgba([200, 10, 10, 255]));
        img.put_pixel(1, 0, Rgba([0, 0, 0, 0]));
        let mut out = Cursor::new(Vec::new());
        img.write_to(&mut out, ImageFormat::Png).unwrap();
        out.into_inner()
    }

    #[rstest]
    fn test_flatten_fills_transparency_with_white() {
        let flattened = flatten_onto_white(&transparent_png()).unwrap();
        let decoded = image::load_from_memory(&flattened).unwrap().into_rgb8();

        assert_eq!(decoded.get_pixel(0, 0).0, [200, 10, 10]);
        assert_eq!(decoded.get_pixel(1, 0).0, [255, 255, 255]);
    }

    #[rstest]
    fn test_write_png_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let stem = dir.path().join("n_genes_region");
        let path = write_png(stem.to_str().unwrap(), b"png bytes").unwrap();

        assert!(path.to_str().unwrap().ends_with("n_genes_region.png"));
        assert_eq!(std::fs::read(path).unwrap(), b"png bytes");
    }

    #[rstest]
    fn test_stem_naming() {
        assert_eq!(
            distance_plot_stem(Output::NGenesRegion, None),
            "n_genes_region"
        );
        assert_eq!(
            distance_plot_stem(Output::NGenesRegion, Some("my_plot")),
            "my_plot"
        );
        assert_eq!(
            chart_plot_stem(Output::GoProcess, PlotKind::Bar, None),
            "go_process_bar_plot"
        );
        assert_eq!(
            chart_plot_stem(Output::GoProcess, PlotKind::Hierarchy, Some("named")),
            "named"
        );
    }
}
