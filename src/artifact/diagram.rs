//! Diagram artifact rendering and export.
//!
//! The diagram engine itself is an external collaborator behind
//! [`DiagramRenderer`]: it consumes diagram-description text and produces an
//! SVG, or fails without taking the document render down with it. What lives
//! here is the per-diagram error scope and the on-demand full-resolution
//! export: rasterizing the vector with `resvg` and packaging the PNG as a
//! data URI the host can open in an image viewer.

use std::sync::Arc;

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use image::DynamicImage;
use resvg::usvg::fontdb;
use thiserror::Error;
use tracing::warn;

#[derive(Debug, Error)]
pub enum DiagramError {
    #[error("diagram source rejected: {0}")]
    Source(String),
    #[error("invalid svg: {0}")]
    Svg(#[from] resvg::usvg::Error),
    #[error("failed to create pixmap {width}x{height}")]
    Pixmap { width: u32, height: u32 },
    #[error("failed to assemble image from pixmap data")]
    ImageData,
    #[error("png encoding failed: {0}")]
    Encode(#[from] image::ImageError),
}

/// External diagram engine: description text in, SVG out.
pub trait DiagramRenderer {
    /// # Errors
    ///
    /// Returns an error if the diagram source cannot be rendered.
    fn render_svg(&self, source: &str) -> Result<String, DiagramError>;
}

/// A successfully rendered diagram, holding its SVG until the owning
/// artifact is superseded or unmounted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiagramView {
    svg: String,
}

impl DiagramView {
    /// Render a diagram, degrading to `None` on failure.
    ///
    /// Failures are caught at the per-diagram scope and logged; the rest of
    /// the document renders unaffected.
    pub fn try_render(renderer: &dyn DiagramRenderer, source: &str) -> Option<Self> {
        match renderer.render_svg(source) {
            Ok(svg) => Some(Self { svg }),
            Err(err) => {
                warn!("diagram render failed: {err}");
                None
            }
        }
    }

    pub fn svg(&self) -> &str {
        &self.svg
    }

    /// Rasterize to a raster image at the given display width.
    ///
    /// The vector is rendered directly at the final resolution, preserving
    /// aspect ratio, so there is no lossy upscaling.
    ///
    /// # Errors
    ///
    /// Returns an error if the SVG cannot be parsed or rasterized.
    pub fn rasterize(&self, target_width_px: u32) -> Result<DynamicImage, DiagramError> {
        rasterize_svg(&self.svg, target_width_px)
    }

    /// Produce the full-resolution exportable image resource, on demand.
    ///
    /// # Errors
    ///
    /// Returns an error if rasterization or PNG encoding fails.
    pub fn export_png_data_uri(&self, target_width_px: u32) -> Result<String, DiagramError> {
        let image = self.rasterize(target_width_px)?;
        let mut bytes = Vec::new();
        image.write_to(&mut std::io::Cursor::new(&mut bytes), image::ImageFormat::Png)?;
        Ok(format!("data:image/png;base64,{}", STANDARD.encode(&bytes)))
    }
}

/// Rasterize an SVG string to a `DynamicImage`.
fn rasterize_svg(svg: &str, target_width_px: u32) -> Result<DynamicImage, DiagramError> {
    let mut db = fontdb::Database::new();
    db.load_system_fonts();

    let opts = resvg::usvg::Options {
        fontdb: Arc::new(db),
        ..Default::default()
    };

    let tree = resvg::usvg::Tree::from_str(svg, &opts)?;
    let size = tree.size();

    #[allow(clippy::cast_precision_loss)]
    let scale = target_width_px as f32 / size.width();

    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    let width = (size.width() * scale).ceil() as u32;
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    let height = (size.height() * scale).ceil() as u32;

    let mut pixmap = resvg::tiny_skia::Pixmap::new(width, height)
        .ok_or(DiagramError::Pixmap { width, height })?;

    resvg::render(
        &tree,
        resvg::tiny_skia::Transform::from_scale(scale, scale),
        &mut pixmap.as_mut(),
    );

    let rgba = pixmap.data().to_vec();
    let buffer =
        image::RgbaImage::from_raw(width, height, rgba).ok_or(DiagramError::ImageData)?;

    Ok(DynamicImage::ImageRgba8(buffer))
}
