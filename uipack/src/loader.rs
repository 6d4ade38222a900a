//! The resource-loading capability boundary.
//!
//! The catalog never creates engine resources itself. Textures, audio
//! clips, and out-of-archive text files are resolved through a
//! [`ResourceLoader`] supplied at package creation, with a per-package
//! name prefix already applied by the caller inside the package. The
//! loader is invoked synchronously and at most once per record.

use std::collections::HashMap;
use std::rc::Rc;

use crate::types::Rect;

/// An engine texture surface, as seen by the catalog.
///
/// The catalog does not touch pixels; it only needs dimensions for UV
/// math, the mip level count for a sampling-compatibility warning, and
/// the named sub-sprite rectangles packed into the surface.
#[derive(Debug, Default)]
pub struct TextureData {
    /// Resource name the texture was loaded under.
    pub name: String,
    /// Surface width in pixels.
    pub width: f32,
    /// Surface height in pixels.
    pub height: f32,
    /// Mip level count; values above 1 conflict with expected sampling.
    pub mip_levels: u32,
    /// Named sub-sprite pixel rectangles inside this surface.
    pub sprites: HashMap<String, Rect>,
}

impl TextureData {
    /// The shared empty-texture sentinel.
    ///
    /// Substituted when an atlas's backing texture cannot be resolved,
    /// so a damaged package keeps answering queries instead of failing.
    pub fn empty() -> Rc<TextureData> {
        thread_local! {
            static EMPTY: Rc<TextureData> = Rc::new(TextureData::default());
        }
        EMPTY.with(Rc::clone)
    }

    /// Whether this is the empty-texture sentinel (or indistinguishable
    /// from it).
    pub fn is_empty_texture(&self) -> bool {
        self.width <= 0.0 || self.height <= 0.0
    }
}

/// An engine audio clip, opaque to the catalog.
#[derive(Debug)]
pub struct AudioData {
    /// Resource name the clip was loaded under.
    pub name: String,
    /// Encoded clip bytes.
    pub data: Vec<u8>,
}

/// External capability for resolving named resources.
///
/// Implementations may serve from an attached resource bundle or from a
/// global resource space; the catalog does not care which. All lookups
/// arrive with the package's name prefix already prepended and file
/// extensions stripped.
pub trait ResourceLoader {
    /// Load a text/binary resource by name.
    fn load_text(&self, name: &str) -> Option<Vec<u8>>;

    /// Load a texture resource by name.
    fn load_texture(&self, name: &str) -> Option<Rc<TextureData>>;

    /// Load an audio resource by name.
    fn load_audio(&self, name: &str) -> Option<Rc<AudioData>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_texture_is_shared() {
        let a = TextureData::empty();
        let b = TextureData::empty();
        assert!(Rc::ptr_eq(&a, &b));
        assert!(a.is_empty_texture());
    }
}
