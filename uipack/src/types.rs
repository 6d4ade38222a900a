//! Small geometric value types shared across the crate.

/// An axis-aligned rectangle.
///
/// Used both for pixel-space rectangles (sprite regions inside an atlas
/// surface, movie-clip frame rects) and for normalized UV rectangles,
/// where all components are in `[0, 1]`.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Rect {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl Rect {
    /// Create a rectangle from position and size.
    pub fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Normalize this pixel rectangle against a surface size, producing
    /// a UV rectangle.
    ///
    /// Returns a zero rect when the surface has a zero dimension, which
    /// is the case for the empty-texture sentinel.
    pub fn to_uv(&self, surface_width: f32, surface_height: f32) -> Rect {
        if surface_width <= 0.0 || surface_height <= 0.0 {
            return Rect::default();
        }
        Rect {
            x: self.x / surface_width,
            y: self.y / surface_height,
            width: self.width / surface_width,
            height: self.height / surface_height,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rect_to_uv() {
        let rect = Rect::new(64.0, 32.0, 128.0, 64.0);
        let uv = rect.to_uv(256.0, 128.0);
        assert_eq!(uv, Rect::new(0.25, 0.25, 0.5, 0.5));
    }

    #[test]
    fn test_rect_to_uv_degenerate_surface() {
        let rect = Rect::new(10.0, 10.0, 20.0, 20.0);
        assert_eq!(rect.to_uv(0.0, 128.0), Rect::default());
        assert_eq!(rect.to_uv(128.0, 0.0), Rect::default());
    }
}
