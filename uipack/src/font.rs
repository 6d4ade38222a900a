//! Bitmap font metrics and the font directory.
//!
//! A font record's `.fnt` entry is a line-oriented stream of `info`,
//! `common`, and `char` records whose `key=value` pairs are merged into
//! one scratch map that is *not* reset between records — later records
//! inherit values from earlier ones (an `xadvance` set by `common`
//! applies to every following `char` that does not override it). Two
//! sub-formats share the syntax:
//!
//! - **bitmap-glyph mode**: each `char` names a sub-image (`img=...`)
//!   that carries its own pixels;
//! - **outline mode**: detected by a `face` key on the `info` record;
//!   each `char` is a pixel rectangle inside one shared sub-image.
//!
//! Parsing here is pure text → records; sprite resolution and UV math
//! happen in the package materializer, which then populates the
//! [`BitmapFont`] allocated at catalog-build time.

use std::collections::HashMap;
use std::rc::Rc;

use std::cell::RefCell;

use tracing::warn;

use crate::loader::TextureData;
use crate::types::Rect;

/// One glyph of a materialized bitmap font.
#[derive(Debug, Clone, PartialEq)]
pub struct GlyphInfo {
    /// Character code this glyph renders.
    pub index: u32,
    /// Normalized UV rectangle inside the font texture.
    pub uv: Rect,
    /// Horizontal advance in pixels.
    pub advance: i32,
    /// Left-side bearing in pixels.
    pub bearing: i32,
    /// Glyph quad width in pixels.
    pub width: i32,
    /// Glyph quad height in pixels.
    pub height: i32,
    /// Bottom of the glyph quad relative to the baseline.
    pub min_y: i32,
    /// Top of the glyph quad relative to the baseline.
    pub max_y: i32,
}

/// A font resource.
///
/// Allocated empty when the catalog is built (so it is discoverable in
/// the font directory before its glyphs exist) and populated exactly
/// once when the font record is materialized.
#[derive(Debug, Default)]
pub struct BitmapFont {
    /// Font resource URL (`ui://<packageId><itemId>`).
    pub name: String,
    /// Shared texture surface the glyph UVs index into.
    pub texture: Option<Rc<TextureData>>,
    /// Glyphs by character code.
    pub glyphs: HashMap<u32, GlyphInfo>,
    /// Line height in pixels.
    pub line_height: i32,
}

impl BitmapFont {
    /// Create an empty font with the given resource URL.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Populate the font from decoded metrics. Runs once, driven by the
    /// owning record's decode-once discipline.
    pub fn populate(
        &mut self,
        texture: Rc<TextureData>,
        glyphs: impl IntoIterator<Item = GlyphInfo>,
        line_height: i32,
    ) {
        self.texture = Some(texture);
        self.glyphs = glyphs.into_iter().map(|g| (g.index, g)).collect();
        self.line_height = line_height;
    }

    /// Glyph for a character code, if decoded.
    pub fn glyph(&self, index: u32) -> Option<&GlyphInfo> {
        self.glyphs.get(&index)
    }

    /// Whether the font has been populated.
    pub fn is_ready(&self) -> bool {
        self.texture.is_some()
    }
}

/// Directory of fonts, keyed by resource URL.
///
/// Owned by the registry rather than being process-global state, so
/// catalogs stay testable in isolation.
#[derive(Debug, Default)]
pub struct FontRegistry {
    fonts: HashMap<String, Rc<RefCell<BitmapFont>>>,
}

impl FontRegistry {
    /// Register a font under its resource URL.
    pub fn register(&mut self, font: Rc<RefCell<BitmapFont>>) {
        let name = font.borrow().name.clone();
        self.fonts.insert(name, font);
    }

    /// Remove a font from the directory.
    pub fn unregister(&mut self, name: &str) {
        self.fonts.remove(name);
    }

    /// Look up a font by resource URL.
    pub fn get(&self, name: &str) -> Option<Rc<RefCell<BitmapFont>>> {
        self.fonts.get(name).cloned()
    }

    /// Number of registered fonts.
    pub fn len(&self) -> usize {
        self.fonts.len()
    }

    /// Whether the directory is empty.
    pub fn is_empty(&self) -> bool {
        self.fonts.is_empty()
    }
}

/// One `char` record with the key/value state in effect when it was
/// read.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct FntChar {
    pub id: u32,
    /// Named sub-image carrying the glyph pixels (bitmap-glyph mode).
    pub img: Option<String>,
    /// Pixel position inside the shared sub-image (outline mode).
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
    pub x_offset: i32,
    pub y_offset: i32,
    /// Effective advance, already falling back to the stream-level
    /// `xadvance` when the record itself has none.
    pub advance: i32,
}

/// Decoded `.fnt` metrics stream.
#[derive(Debug, Default, PartialEq)]
pub struct FntFile {
    /// Outline-font mode: glyphs are sub-rectangles of one shared
    /// sub-image instead of individual named sub-images.
    pub outline: bool,
    /// Declared font size; falls back to the `common` record's
    /// `lineHeight` when `info` declares none.
    pub size: i32,
    /// Stream-level default advance from the `common` record.
    pub xadvance: i32,
    /// Char records in stream order.
    pub chars: Vec<FntChar>,
}

/// Parse a `.fnt` metrics stream.
pub fn parse_fnt(text: &str) -> FntFile {
    let mut kv: HashMap<String, String> = HashMap::new();
    let mut file = FntFile::default();

    for line in text.lines() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let mut tokens = line.split_whitespace();
        let Some(record) = tokens.next() else { continue };
        for token in tokens {
            let mut parts = token.splitn(2, '=');
            let (Some(key), Some(value)) = (parts.next(), parts.next()) else {
                continue;
            };
            if !key.is_empty() && !value.is_empty() {
                kv.insert(key.to_string(), value.to_string());
            }
        }

        match record {
            "info" => {
                if kv.contains_key("face") {
                    file.outline = true;
                }
                if let Some(size) = int(&kv, "size") {
                    file.size = size;
                }
            }
            "common" => {
                if file.size == 0 {
                    if let Some(lh) = int(&kv, "lineHeight") {
                        file.size = lh;
                    }
                }
                if let Some(adv) = int(&kv, "xadvance") {
                    file.xadvance = adv;
                }
            }
            "char" => {
                let Some(id) = kv.get("id").and_then(|v| v.parse::<u32>().ok()) else {
                    warn!("char record without a usable id, skipped");
                    continue;
                };
                file.chars.push(FntChar {
                    id,
                    img: kv.get("img").cloned(),
                    x: int(&kv, "x").unwrap_or(0),
                    y: int(&kv, "y").unwrap_or(0),
                    width: int(&kv, "width").unwrap_or(0),
                    height: int(&kv, "height").unwrap_or(0),
                    x_offset: int(&kv, "xoffset").unwrap_or(0),
                    y_offset: int(&kv, "yoffset").unwrap_or(0),
                    advance: int(&kv, "xadvance").unwrap_or(file.xadvance),
                });
            }
            _ => {}
        }
    }

    file
}

fn int(kv: &HashMap<String, String>, key: &str) -> Option<i32> {
    kv.get(key).and_then(|v| v.parse().ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bitmap_mode_parse() {
        let file = parse_fnt(
            "info size=0\n\
             common lineHeight=20 xadvance=12\n\
             char id=65 img=glyph_a xoffset=1 yoffset=2\n\
             char id=66 img=glyph_b xadvance=14\n",
        );
        assert!(!file.outline);
        assert_eq!(file.size, 20);
        assert_eq!(file.xadvance, 12);
        assert_eq!(file.chars.len(), 2);
        assert_eq!(file.chars[0].img.as_deref(), Some("glyph_a"));
        assert_eq!(file.chars[0].advance, 12);
        assert_eq!(file.chars[1].advance, 14);
    }

    #[test]
    fn test_outline_mode_detected_by_face() {
        let file = parse_fnt(
            "info face=Arial size=24\n\
             common lineHeight=28\n\
             char id=65 x=0 y=0 width=12 height=16 xoffset=1 yoffset=3\n",
        );
        assert!(file.outline);
        assert_eq!(file.size, 24);
        let c = &file.chars[0];
        assert_eq!((c.x, c.y, c.width, c.height), (0, 0, 12, 16));
        assert_eq!((c.x_offset, c.y_offset), (1, 3));
    }

    #[test]
    fn test_values_accumulate_across_records() {
        // The second char omits yoffset and img; both carry over from
        // the first record's scratch-map state.
        let file = parse_fnt(
            "common xadvance=8\n\
             char id=65 img=glyph_a yoffset=4\n\
             char id=66\n",
        );
        assert_eq!(file.chars[1].img.as_deref(), Some("glyph_a"));
        assert_eq!(file.chars[1].y_offset, 4);
        assert_eq!(file.chars[1].advance, 8);
    }

    #[test]
    fn test_char_without_id_is_skipped() {
        let file = parse_fnt("char img=foo\nchar id=65 img=foo\n");
        assert_eq!(file.chars.len(), 1);
        assert_eq!(file.chars[0].id, 65);
    }

    #[test]
    fn test_font_registry_roundtrip() {
        let mut registry = FontRegistry::default();
        let font = Rc::new(RefCell::new(BitmapFont::new("ui://pkgitem")));
        registry.register(font.clone());
        assert!(registry.get("ui://pkgitem").is_some());
        assert!(Rc::ptr_eq(&registry.get("ui://pkgitem").unwrap(), &font));

        registry.unregister("ui://pkgitem");
        assert!(registry.get("ui://pkgitem").is_none());
        assert!(registry.is_empty());
    }

    #[test]
    fn test_font_populate() {
        let mut font = BitmapFont::new("ui://pkgitem");
        assert!(!font.is_ready());
        font.populate(
            TextureData::empty(),
            vec![GlyphInfo {
                index: 65,
                uv: Rect::default(),
                advance: 10,
                bearing: 0,
                width: 8,
                height: 12,
                min_y: -12,
                max_y: 0,
            }],
            14,
        );
        assert!(font.is_ready());
        assert_eq!(font.glyph(65).unwrap().advance, 10);
        assert_eq!(font.line_height, 14);
    }
}
