//! Resource records and their materialized payloads.
//!
//! A package's catalog is a list of [`PackageItem`] records built once
//! from the manifest. Each record carries a decode-once state machine:
//! it starts [`ItemState::Pending`] and moves to [`ItemState::Decoded`]
//! the first time any asset accessor touches it, never back. The two
//! states and the payload live in one sum type so "decoded but empty"
//! is unrepresentable.

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use crate::font::BitmapFont;
use crate::loader::{AudioData, TextureData};
use crate::markup::Element;
use crate::types::Rect;

/// Resource kinds a manifest can declare, selected by tag name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ItemKind {
    Image,
    Atlas,
    Sound,
    Font,
    MovieClip,
    Component,
    Binary,
    Misc,
}

impl ItemKind {
    /// Map a manifest resource tag to its kind. Unknown tags fall back
    /// to [`ItemKind::Misc`], which materializes as raw bytes.
    pub fn from_tag(tag: &str) -> Self {
        match tag {
            "image" => Self::Image,
            "atlas" => Self::Atlas,
            "sound" => Self::Sound,
            "font" => Self::Font,
            "movieclip" => Self::MovieClip,
            "component" => Self::Component,
            "binary" => Self::Binary,
            _ => Self::Misc,
        }
    }
}

impl fmt::Display for ItemKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Image => "image",
            Self::Atlas => "atlas",
            Self::Sound => "sound",
            Self::Font => "font",
            Self::MovieClip => "movieclip",
            Self::Component => "component",
            Self::Binary => "binary",
            Self::Misc => "misc",
        };
        f.write_str(name)
    }
}

/// How an image stretches when its display size differs from its
/// source size.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ScaleMode {
    #[default]
    Simple,
    /// Nine-slice scaling (`scale="9grid"`).
    Grid9,
    /// Tiled repetition (`scale="tile"`).
    Tile,
}

impl ScaleMode {
    /// Map the manifest `scale` attribute.
    pub fn from_attr(value: Option<&str>) -> Self {
        match value {
            Some("9grid") => Self::Grid9,
            Some("tile") => Self::Tile,
            _ => Self::Simple,
        }
    }
}

/// A named sub-rectangle of an atlas surface, with its UV rectangle
/// precomputed.
#[derive(Debug, Clone)]
pub struct SpriteFrame {
    /// Sprite id.
    pub name: String,
    /// Pixel rectangle inside the atlas surface.
    pub rect: Rect,
    /// Normalized UV rectangle.
    pub uv: Rect,
    /// The atlas surface holding the pixels.
    pub texture: Rc<TextureData>,
}

/// A materialized atlas: the backing texture plus an optional parallel
/// alpha-channel surface.
#[derive(Debug, Clone)]
pub struct AtlasTexture {
    pub base: Rc<TextureData>,
    pub alpha: Option<Rc<TextureData>>,
}

impl AtlasTexture {
    /// The shared empty-texture atlas, substituted when no backing
    /// texture could be resolved.
    pub fn empty() -> Self {
        Self {
            base: TextureData::empty(),
            alpha: None,
        }
    }

    /// Slice a named sprite out of this atlas.
    pub fn sprite(&self, sprite_id: &str) -> Option<SpriteFrame> {
        let rect = *self.base.sprites.get(sprite_id)?;
        Some(SpriteFrame {
            name: sprite_id.to_string(),
            uv: rect.to_uv(self.base.width, self.base.height),
            rect,
            texture: Rc::clone(&self.base),
        })
    }
}

/// One frame of a movie clip.
#[derive(Debug, Clone)]
pub struct MovieFrame {
    /// Pixel rectangle of the frame inside its source surface.
    pub rect: Rect,
    /// Extra per-frame delay in seconds.
    pub add_delay: f32,
    /// The frame's sprite, resolved as `<clipId>_<frameIndex>`.
    pub sprite: Option<SpriteFrame>,
}

/// A materialized movie clip.
#[derive(Debug, Clone, Default)]
pub struct MovieClip {
    /// Pivot point in pixels.
    pub pivot: (i32, i32),
    /// Frame interval in seconds.
    pub interval: f32,
    /// Play forward then backward instead of looping.
    pub swing: bool,
    /// Delay before each repeat, in seconds.
    pub repeat_delay: f32,
    /// Ordered frames.
    pub frames: Vec<MovieFrame>,
}

/// Payload produced by materializing a record; the variant always
/// matches the record's kind.
#[derive(Debug, Clone)]
pub enum ItemPayload {
    /// A sprite sliced out of its atlas; absent when the sprite is not
    /// in the cross-reference or its atlas has no such sub-image.
    Image(Option<SpriteFrame>),
    Atlas(AtlasTexture),
    /// Audio clip; absent when the loader could not resolve it.
    Sound(Option<Rc<AudioData>>),
    Font(Rc<RefCell<BitmapFont>>),
    /// Clip metadata; absent when the descriptor entry is missing.
    MovieClip(Option<Rc<MovieClip>>),
    /// Component descriptor tree, localized if a strings table applied;
    /// absent when the descriptor entry is missing or malformed.
    Component(Option<Rc<Element>>),
    /// Raw file bytes; absent when the loader could not resolve them.
    Binary(Option<Rc<Vec<u8>>>),
}

/// Decode-once state of a record.
#[derive(Debug, Clone)]
pub enum ItemState {
    /// Not yet materialized; no loader call has been made.
    Pending,
    /// Materialized exactly once; the payload is final.
    Decoded(ItemPayload),
}

/// One catalog entry.
#[derive(Debug)]
pub struct PackageItem {
    /// Unique id within the package.
    pub id: String,
    /// Display name, unique within the package when present.
    pub name: Option<String>,
    pub kind: ItemKind,
    /// Declared in the manifest for export to other packages.
    pub exported: bool,
    /// Backing file name for kinds loaded through the resource loader.
    pub file: Option<String>,
    /// Declared `width,height`, when the manifest carries a `size`.
    pub size: Option<(i32, i32)>,
    /// Image stretch behavior.
    pub scale_mode: ScaleMode,
    /// Font object allocated at catalog build (font records only), so
    /// the font directory can hand it out before glyphs are decoded.
    pub font: Option<Rc<RefCell<BitmapFont>>>,
    /// Decode-once state and memoized payload.
    pub state: ItemState,
}

impl PackageItem {
    /// Whether materialization has run for this record.
    pub fn decoded(&self) -> bool {
        matches!(self.state, ItemState::Decoded(_))
    }

    /// The memoized payload, if materialized.
    pub fn payload(&self) -> Option<&ItemPayload> {
        match &self.state {
            ItemState::Decoded(payload) => Some(payload),
            ItemState::Pending => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_kind_from_tag() {
        assert_eq!(ItemKind::from_tag("image"), ItemKind::Image);
        assert_eq!(ItemKind::from_tag("movieclip"), ItemKind::MovieClip);
        assert_eq!(ItemKind::from_tag("binary"), ItemKind::Binary);
        assert_eq!(ItemKind::from_tag("swf"), ItemKind::Misc);
    }

    #[test]
    fn test_scale_mode_from_attr() {
        assert_eq!(ScaleMode::from_attr(Some("9grid")), ScaleMode::Grid9);
        assert_eq!(ScaleMode::from_attr(Some("tile")), ScaleMode::Tile);
        assert_eq!(ScaleMode::from_attr(Some("other")), ScaleMode::Simple);
        assert_eq!(ScaleMode::from_attr(None), ScaleMode::Simple);
    }

    #[test]
    fn test_atlas_sprite_slicing() {
        let mut sprites = HashMap::new();
        sprites.insert("s1".to_string(), Rect::new(0.0, 0.0, 64.0, 64.0));
        let atlas = AtlasTexture {
            base: Rc::new(TextureData {
                name: "atlas0".to_string(),
                width: 128.0,
                height: 128.0,
                mip_levels: 1,
                sprites,
            }),
            alpha: None,
        };

        let frame = atlas.sprite("s1").unwrap();
        assert_eq!(frame.rect, Rect::new(0.0, 0.0, 64.0, 64.0));
        assert_eq!(frame.uv, Rect::new(0.0, 0.0, 0.5, 0.5));
        assert!(atlas.sprite("unknown").is_none());
    }

    #[test]
    fn test_empty_atlas_has_no_sprites() {
        assert!(AtlasTexture::empty().sprite("anything").is_none());
    }

    #[test]
    fn test_item_state_flag() {
        let mut item = PackageItem {
            id: "i0".to_string(),
            name: None,
            kind: ItemKind::Misc,
            exported: false,
            file: None,
            size: None,
            scale_mode: ScaleMode::Simple,
            font: None,
            state: ItemState::Pending,
        };
        assert!(!item.decoded());
        assert!(item.payload().is_none());

        item.state = ItemState::Decoded(ItemPayload::Binary(None));
        assert!(item.decoded());
        assert!(item.payload().is_some());
    }
}
