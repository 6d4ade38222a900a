//! Package construction and the lazy materializer.
//!
//! A [`UiPackage`] is built once from archive bytes: the container is
//! decoded into a text table, the sprite/atlas cross-reference and the
//! manifest are parsed out of it, and one record per manifest resource
//! is created. Record payloads are resolved on first access only and
//! memoized for the package's lifetime; in eager mode everything is
//! materialized during construction and the text table and sprite
//! index are discarded, since no further first-access decode can occur.

use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

use tracing::{error, warn};

use crate::archive::{self, TextTable};
use crate::config::PackageConfig;
use crate::error::PackageError;
use crate::font::{parse_fnt, BitmapFont, FontRegistry, GlyphInfo};
use crate::item::{
    AtlasTexture, ItemKind, ItemPayload, ItemState, MovieClip, MovieFrame, PackageItem, ScaleMode,
    SpriteFrame,
};
use crate::loader::ResourceLoader;
use crate::locale::{translate_component, StringsSource};
use crate::markup::{self, ElementExt};
use crate::sprites::SpriteIndex;
use crate::types::Rect;

/// Scheme prefix of resource URLs.
pub const URL_PREFIX: &str = "ui://";

const MANIFEST_ENTRY: &str = "package.xml";
const SPRITE_INDEX_ENTRY: &str = "sprites.bytes";

/// A loaded package: identity, its resource catalog, and the transient
/// decode state the materializer consumes.
pub struct UiPackage {
    id: String,
    name: String,
    custom_id: Option<String>,
    asset_path: Option<String>,
    /// Prepended to every resource-loader lookup.
    prefix: String,
    loader: Option<Rc<dyn ResourceLoader>>,
    items: Vec<PackageItem>,
    index_by_id: HashMap<String, usize>,
    index_by_name: HashMap<String, usize>,
    /// Dropped after an eager preload; lazy packages keep it for
    /// first-access decodes.
    text_table: Option<TextTable>,
    sprite_index: Option<SpriteIndex>,
}

// The attached loader is a trait object, so Debug is written out by
// hand over the identifying fields.
impl fmt::Debug for UiPackage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UiPackage")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("custom_id", &self.custom_id)
            .field("asset_path", &self.asset_path)
            .field("items", &self.items.len())
            .finish_non_exhaustive()
    }
}

impl UiPackage {
    /// Build a package from its descriptor archive.
    ///
    /// `main_asset_name` becomes the `<name>@` prefix applied to every
    /// resource-loader lookup. `fonts` receives one empty font object
    /// per font record so fonts are discoverable before their glyphs
    /// decode; `strings`, when present, localizes component descriptors
    /// during an eager preload.
    pub(crate) fn create(
        desc: &[u8],
        loader: Option<Rc<dyn ResourceLoader>>,
        main_asset_name: Option<&str>,
        config: &PackageConfig,
        fonts: &mut FontRegistry,
        strings: Option<&StringsSource>,
    ) -> Result<Self, PackageError> {
        let table = archive::decode(desc)?;

        let sprite_text = table
            .get(SPRITE_INDEX_ENTRY)
            .ok_or_else(|| PackageError::MissingEntry(SPRITE_INDEX_ENTRY.to_string()))?;
        let sprite_index = SpriteIndex::parse(sprite_text);

        let manifest_text = table
            .get(MANIFEST_ENTRY)
            .ok_or_else(|| PackageError::MissingEntry(MANIFEST_ENTRY.to_string()))?;
        let manifest = markup::parse(MANIFEST_ENTRY, manifest_text)?;
        let id = manifest.attr("id").unwrap_or_default().to_string();
        let name = manifest.attr("name").unwrap_or_default().to_string();
        let resources = manifest
            .child("resources")
            .ok_or_else(|| PackageError::InvalidManifest("missing resources node".to_string()))?;

        let mut items = Vec::new();
        for node in resources.elements() {
            let kind = ItemKind::from_tag(&node.name);
            let item_id = node.attr("id").unwrap_or_default().to_string();
            let mut item = PackageItem {
                name: node.attr("name").map(str::to_string),
                kind,
                exported: node.attr_bool("exported"),
                file: node.attr("file").map(str::to_string),
                size: node.attr_pair("size"),
                scale_mode: ScaleMode::Simple,
                font: None,
                state: ItemState::Pending,
                id: item_id,
            };
            match kind {
                ItemKind::Image => {
                    item.scale_mode = ScaleMode::from_attr(node.attr("scale"));
                }
                ItemKind::Font => {
                    // Allocated empty now, populated on first access.
                    let font = Rc::new(std::cell::RefCell::new(BitmapFont::new(format!(
                        "{}{}{}",
                        URL_PREFIX, id, item.id
                    ))));
                    fonts.register(Rc::clone(&font));
                    item.font = Some(font);
                }
                _ => {}
            }
            items.push(item);
        }

        let mut package = Self {
            id,
            name,
            custom_id: None,
            asset_path: None,
            prefix: main_asset_name
                .map(|n| format!("{}@", n))
                .unwrap_or_default(),
            loader,
            items,
            index_by_id: HashMap::new(),
            index_by_name: HashMap::new(),
            text_table: Some(table),
            sprite_index: Some(sprite_index),
        };
        package.rebuild_indexes();

        if config.eager_decode {
            for idx in 0..package.items.len() {
                package.materialize(idx, strings);
            }
            // Every record is decoded; the decode inputs are dead weight.
            package.text_table = None;
            package.sprite_index = None;
        } else {
            // Option's ordering keeps unnamed records together at the
            // front under a total order.
            package.items.sort_by(|a, b| a.name.cmp(&b.name));
            package.rebuild_indexes();
        }

        Ok(package)
    }

    /// Id and name indexes; duplicates follow last-write-wins with no
    /// uniqueness error.
    fn rebuild_indexes(&mut self) {
        self.index_by_id.clear();
        self.index_by_name.clear();
        for (idx, item) in self.items.iter().enumerate() {
            self.index_by_id.insert(item.id.clone(), idx);
            if let Some(name) = &item.name {
                self.index_by_name.insert(name.clone(), idx);
            }
        }
    }

    /// Package id from the manifest.
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Package name from the manifest.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Custom registry alias, if one was assigned.
    pub fn custom_id(&self) -> Option<&str> {
        self.custom_id.as_deref()
    }

    pub(crate) fn set_custom_id(&mut self, custom_id: Option<String>) {
        self.custom_id = custom_id;
    }

    /// Asset path this package was registered under, if any.
    pub fn asset_path(&self) -> Option<&str> {
        self.asset_path.as_deref()
    }

    pub(crate) fn set_asset_path(&mut self, asset_path: Option<String>) {
        self.asset_path = asset_path;
    }

    /// All records in catalog order (name order in lazy mode).
    pub fn items(&self) -> &[PackageItem] {
        &self.items
    }

    /// Record by id; logs nothing on a miss (queries stay cheap).
    pub fn item_by_id(&self, item_id: &str) -> Option<&PackageItem> {
        self.index_by_id
            .get(item_id)
            .and_then(|&idx| self.items.get(idx))
    }

    /// Record by name.
    pub fn item_by_name(&self, name: &str) -> Option<&PackageItem> {
        self.index_by_name
            .get(name)
            .and_then(|&idx| self.items.get(idx))
    }

    /// Resource URL (`ui://<packageId><itemId>`) for a named record.
    pub fn item_url(&self, res_name: &str) -> Option<String> {
        let item = self.item_by_name(res_name)?;
        Some(format!("{}{}{}", URL_PREFIX, self.id, item.id))
    }

    /// Materialize (or fetch the memoized payload of) a record by id.
    ///
    /// Unknown ids log an error and return `None`; they never fail the
    /// caller.
    pub fn item_asset(
        &mut self,
        item_id: &str,
        strings: Option<&StringsSource>,
    ) -> Option<ItemPayload> {
        let Some(&idx) = self.index_by_id.get(item_id) else {
            error!(item = %item_id, package = %self.name, "resource not found");
            return None;
        };
        Some(self.materialize(idx, strings))
    }

    /// Materialize (or fetch the memoized payload of) a record by name.
    pub fn item_asset_by_name(
        &mut self,
        res_name: &str,
        strings: Option<&StringsSource>,
    ) -> Option<ItemPayload> {
        let Some(&idx) = self.index_by_name.get(res_name) else {
            error!(resource = %res_name, package = %self.name, "resource not found");
            return None;
        };
        Some(self.materialize(idx, strings))
    }

    /// Decode-once transition: the first call resolves the payload, all
    /// later calls return the memoized value without touching the
    /// loader or the text table again.
    fn materialize(&mut self, idx: usize, strings: Option<&StringsSource>) -> ItemPayload {
        if let ItemState::Decoded(payload) = &self.items[idx].state {
            return payload.clone();
        }

        let kind = self.items[idx].kind;
        let item_id = self.items[idx].id.clone();
        let payload = match kind {
            ItemKind::Image => ItemPayload::Image(self.sprite(&item_id)),
            ItemKind::Atlas => ItemPayload::Atlas(self.load_atlas(idx)),
            ItemKind::Sound => ItemPayload::Sound(self.load_sound(idx)),
            ItemKind::Font => ItemPayload::Font(self.load_font(idx)),
            ItemKind::MovieClip => ItemPayload::MovieClip(self.load_movie_clip(&item_id)),
            ItemKind::Component => ItemPayload::Component(self.load_component(&item_id, strings)),
            ItemKind::Binary | ItemKind::Misc => ItemPayload::Binary(self.load_binary(idx)),
        };

        self.items[idx].state = ItemState::Decoded(payload.clone());
        payload
    }

    /// Resolve a sprite id through the cross-reference: find its atlas,
    /// materialize that atlas record, then slice the named sub-image.
    fn sprite(&mut self, sprite_id: &str) -> Option<SpriteFrame> {
        let atlas_id = self
            .sprite_index
            .as_ref()
            .and_then(|index| index.atlas_for(sprite_id))
            .map(str::to_string)?;
        self.atlas(&atlas_id).sprite(sprite_id)
    }

    /// Materialized atlas for an atlas record id, or the empty sentinel
    /// when the id resolves to nothing usable.
    fn atlas(&mut self, atlas_id: &str) -> AtlasTexture {
        let Some(&idx) = self.index_by_id.get(atlas_id) else {
            return AtlasTexture::empty();
        };
        match self.materialize(idx, None) {
            ItemPayload::Atlas(atlas) => atlas,
            _ => {
                warn!(atlas = %atlas_id, package = %self.name, "record is not an atlas");
                AtlasTexture::empty()
            }
        }
    }

    fn load_atlas(&mut self, idx: usize) -> AtlasTexture {
        let item = &self.items[idx];
        let file = match &item.file {
            Some(file) if !file.is_empty() => file.clone(),
            _ => format!("{}.png", item.id),
        };
        let path = format!("{}{}", self.prefix, strip_extension(&file));

        let Some(loader) = &self.loader else {
            warn!(texture = %file, package = %self.name, "no resource loader attached");
            return AtlasTexture::empty();
        };
        let Some(texture) = loader.load_texture(&path) else {
            warn!(texture = %file, package = %self.name, "texture not found");
            return AtlasTexture::empty();
        };
        if texture.mip_levels > 1 {
            warn!(
                texture = %file,
                package = %self.name,
                "texture has mipmaps enabled, which conflicts with expected sampling"
            );
        }
        let alpha = loader.load_texture(&format!("{}!a", path));
        AtlasTexture {
            base: texture,
            alpha,
        }
    }

    fn load_sound(&mut self, idx: usize) -> Option<Rc<crate::loader::AudioData>> {
        let item = &self.items[idx];
        let Some(file) = item.file.clone() else {
            warn!(item = %item.id, package = %self.name, "sound record has no file");
            return None;
        };
        let path = format!("{}{}", self.prefix, strip_extension(&file));
        let clip = self.loader.as_ref().and_then(|l| l.load_audio(&path));
        if clip.is_none() {
            warn!(sound = %file, package = %self.name, "audio clip not found");
        }
        clip
    }

    fn load_binary(&mut self, idx: usize) -> Option<Rc<Vec<u8>>> {
        let item = &self.items[idx];
        let Some(file) = item.file.clone() else {
            warn!(item = %item.id, package = %self.name, "binary record has no file");
            return None;
        };
        let path = format!("{}{}", self.prefix, strip_extension(&file));
        let data = self
            .loader
            .as_ref()
            .and_then(|l| l.load_text(&path))
            .map(Rc::new);
        if data.is_none() {
            warn!(file = %file, package = %self.name, "binary resource not found");
        }
        data
    }

    fn load_font(&mut self, idx: usize) -> Rc<std::cell::RefCell<BitmapFont>> {
        let item = &self.items[idx];
        let item_id = item.id.clone();
        // Font records always carry the object allocated at build time.
        let font = item
            .font
            .clone()
            .unwrap_or_else(|| Rc::new(std::cell::RefCell::new(BitmapFont::new(String::new()))));

        let Some(text) = self.table_entry(&format!("{}.fnt", item_id)) else {
            warn!(item = %item_id, package = %self.name, "font metrics entry missing");
            return font;
        };
        let fnt = parse_fnt(&text);

        let mut glyphs = Vec::new();
        let mut texture = None;
        let mut line_height = 0.0f32;

        if fnt.outline {
            // One shared sub-image carries every glyph.
            let Some(shared) = self.sprite(&item_id) else {
                warn!(item = %item_id, package = %self.name, "outline font sub-image missing");
                return font;
            };
            let tex = Rc::clone(&shared.texture);
            for c in &fnt.chars {
                let mut advance = c.advance;
                if advance == 0 {
                    advance = c.width + c.x_offset;
                }
                let region = Rect::new(
                    c.x as f32 + shared.rect.x,
                    shared.rect.height - (c.y + c.height) as f32 + shared.rect.y,
                    c.width as f32,
                    c.height as f32,
                );
                glyphs.push(GlyphInfo {
                    index: c.id,
                    uv: region.to_uv(tex.width, tex.height),
                    advance,
                    bearing: c.x_offset,
                    width: c.width,
                    height: c.height,
                    min_y: c.y_offset - c.height,
                    max_y: c.y_offset,
                });
            }
            line_height = fnt.size as f32;
            texture = Some(tex);
        } else {
            for c in &fnt.chars {
                let Some(img) = &c.img else { continue };
                let Some(sprite) = self.sprite(img) else {
                    warn!(glyph = %img, package = %self.name, "glyph sub-image missing");
                    continue;
                };
                let width = sprite.rect.width.ceil() as i32;
                let height = sprite.rect.height.ceil() as i32;
                let mut advance = c.advance;
                if advance == 0 {
                    advance = width + c.x_offset;
                }
                glyphs.push(GlyphInfo {
                    index: c.id,
                    uv: sprite.uv,
                    advance,
                    bearing: c.x_offset,
                    width,
                    height,
                    min_y: c.y_offset - height,
                    max_y: c.y_offset,
                });
                let extent = if c.y_offset < 0 {
                    height as f32
                } else {
                    (c.y_offset + height) as f32
                };
                line_height = line_height.max(extent);
                texture = Some(sprite.texture);
            }
        }

        if let Some(tex) = texture {
            if !glyphs.is_empty() {
                font.borrow_mut()
                    .populate(tex, glyphs, line_height.ceil() as i32);
            }
        }
        font
    }

    fn load_movie_clip(&mut self, item_id: &str) -> Option<Rc<MovieClip>> {
        let entry = format!("{}.xml", item_id);
        let text = self.table_entry(&entry)?;
        let doc = match markup::parse(&entry, &text) {
            Ok(doc) => doc,
            Err(err) => {
                warn!(item = %item_id, package = %self.name, error = %err, "bad clip descriptor");
                return None;
            }
        };

        let mut clip = MovieClip {
            pivot: doc.attr_pair("pivot").unwrap_or((0, 0)),
            interval: doc.attr_f32("interval").unwrap_or(0.0) / 1000.0,
            swing: doc.attr_bool("swing"),
            repeat_delay: doc.attr_f32("repeatDelay").unwrap_or(0.0) / 1000.0,
            frames: Vec::new(),
        };

        let declared = doc.attr_i32("frameCount");
        if let Some(frames_node) = doc.child("frames") {
            for (i, frame_node) in frames_node.elements().into_iter().enumerate() {
                let rect = match frame_node.attr_array("rect").as_deref() {
                    Some([x, y, w, h, ..]) => Rect::new(*x, *y, *w, *h),
                    _ => Rect::default(),
                };
                let add_delay = frame_node.attr_f32("addDelay").unwrap_or(0.0) / 1000.0;
                let sprite = self.sprite(&format!("{}_{}", item_id, i));
                clip.frames.push(MovieFrame {
                    rect,
                    add_delay,
                    sprite,
                });
            }
        }
        if declared as usize != clip.frames.len() {
            warn!(
                item = %item_id,
                package = %self.name,
                declared,
                actual = clip.frames.len(),
                "clip frame count mismatch"
            );
        }

        Some(Rc::new(clip))
    }

    fn load_component(
        &mut self,
        item_id: &str,
        strings: Option<&StringsSource>,
    ) -> Option<Rc<xmltree::Element>> {
        let entry = format!("{}.xml", item_id);
        let text = self.table_entry(&entry)?;
        let mut doc = match markup::parse(&entry, &text) {
            Ok(doc) => doc,
            Err(err) => {
                warn!(item = %item_id, package = %self.name, error = %err, "bad component descriptor");
                return None;
            }
        };

        // Localize before memoizing so the cache never mixes translated
        // and untranslated content.
        if let Some(strings) = strings {
            if let Some(group) = strings.group(&format!("{}{}", self.id, item_id)) {
                translate_component(&mut doc, group);
            }
        }

        Some(Rc::new(doc))
    }

    fn table_entry(&self, entry: &str) -> Option<String> {
        let text = self.text_table.as_ref().and_then(|t| t.get(entry)).cloned();
        if text.is_none() {
            warn!(entry = %entry, package = %self.name, "archive entry missing");
        }
        text
    }

    /// Release every owned resource and clear the catalog. Fonts are
    /// pulled out of the directory; texture/audio handles drop with
    /// their payload slots.
    pub(crate) fn dispose(&mut self, fonts: &mut FontRegistry) {
        for item in &self.items {
            if let Some(font) = &item.font {
                fonts.unregister(&font.borrow().name);
            }
        }
        self.items.clear();
        self.index_by_id.clear();
        self.index_by_name.clear();
        self.text_table = None;
        self.sprite_index = None;
    }
}

/// Drop the final extension of a backing file name, mirroring how the
/// resource space addresses assets.
fn strip_extension(file: &str) -> &str {
    match file.rfind('.') {
        Some(pos) => &file[..pos],
        None => file,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn flat_descriptor(entries: &[(&str, &str)]) -> Vec<u8> {
        let mut out = String::new();
        for (name, content) in entries {
            let units: usize = content.chars().map(char::len_utf16).sum();
            out.push_str(name);
            out.push('|');
            out.push_str(&units.to_string());
            out.push('|');
            out.push_str(content);
        }
        out.into_bytes()
    }

    fn mixed_name_package() -> UiPackage {
        let manifest = r#"<packageDescription id="pkgmixed" name="Mixed">
          <resources>
            <image id="i1" name="zeta"/>
            <image id="i2"/>
            <image id="i3" name="alpha"/>
            <image id="i4"/>
            <image id="i5" name="mid"/>
          </resources>
        </packageDescription>"#;
        let desc = flat_descriptor(&[("package.xml", manifest), ("sprites.bytes", "id idx\n")]);
        let mut fonts = FontRegistry::default();
        UiPackage::create(
            &desc,
            None,
            None,
            &PackageConfig::default(),
            &mut fonts,
            None,
        )
        .unwrap()
    }

    #[test]
    fn test_strip_extension() {
        assert_eq!(strip_extension("atlas0.png"), "atlas0");
        assert_eq!(strip_extension("noext"), "noext");
        assert_eq!(strip_extension("a.b.png"), "a.b");
    }

    #[test]
    fn test_lazy_sort_handles_unnamed_records() {
        let package = mixed_name_package();
        let names: Vec<_> = package.items().iter().map(|i| i.name.clone()).collect();
        // Unnamed records group at the front, named records sort after.
        let mut sorted = names.clone();
        sorted.sort();
        assert_eq!(names, sorted);
        assert_eq!(package.item_by_name("alpha").unwrap().id, "i3");
        assert_eq!(package.item_by_name("zeta").unwrap().id, "i1");
        assert_eq!(package.item_by_id("i2").unwrap().name, None);
    }

    #[test]
    fn test_package_debug_output() {
        let package = mixed_name_package();
        let rendered = format!("{:?}", package);
        assert!(rendered.contains("pkgmixed"));
        assert!(rendered.contains("Mixed"));
    }
}
