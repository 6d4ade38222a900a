//! Sprite to atlas cross-reference.
//!
//! The `sprites.bytes` archive entry maps each sprite id to the atlas
//! record holding its pixels. The index is built once at catalog-build
//! time and never changes afterwards; eager-decoded packages discard it
//! entirely once every record is materialized.

use std::collections::HashMap;

use tracing::warn;

/// Immutable sprite-id → atlas-id mapping.
#[derive(Debug, Default)]
pub struct SpriteIndex {
    atlas_by_sprite: HashMap<String, String>,
}

impl SpriteIndex {
    /// Parse the sprite index from its text form.
    ///
    /// The first line is a header and is discarded. Each remaining
    /// non-empty line is space-separated `spriteId atlasIndex ...`;
    /// fields past the atlas index are ignored. A negative atlas index
    /// means the atlas id is derived from the sprite id itself (see
    /// [`derive_atlas_id`]). Records with an unparsable atlas index are
    /// skipped with a warning.
    pub fn parse(text: &str) -> Self {
        let mut atlas_by_sprite = HashMap::new();

        for line in text.lines().skip(1) {
            if line.is_empty() {
                continue;
            }
            let mut fields = line.split(' ');
            let Some(sprite_id) = fields.next().filter(|id| !id.is_empty()) else {
                continue;
            };
            let atlas = match fields.next().and_then(|f| f.parse::<i32>().ok()) {
                Some(index) if index >= 0 => format!("atlas{}", index),
                Some(_) => derive_atlas_id(sprite_id),
                None => {
                    warn!(sprite = %sprite_id, "sprite index record has no usable atlas index");
                    continue;
                }
            };
            atlas_by_sprite.insert(sprite_id.to_string(), atlas);
        }

        Self { atlas_by_sprite }
    }

    /// Atlas id for a sprite, if the sprite is indexed.
    pub fn atlas_for(&self, sprite_id: &str) -> Option<&str> {
        self.atlas_by_sprite.get(sprite_id).map(|s| s.as_str())
    }

    /// Number of indexed sprites.
    pub fn len(&self) -> usize {
        self.atlas_by_sprite.len()
    }

    /// Whether the index holds no sprites.
    pub fn is_empty(&self) -> bool {
        self.atlas_by_sprite.is_empty()
    }
}

/// Fallback atlas id for sprites with a negative declared index: the
/// sprite id's prefix up to its first `_`, or the whole id when it has
/// none, prefixed with `atlas_`.
fn derive_atlas_id(sprite_id: &str) -> String {
    match sprite_id.find('_') {
        Some(pos) => format!("atlas_{}", &sprite_id[..pos]),
        None => format!("atlas_{}", sprite_id),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_header_line_is_skipped() {
        let index = SpriteIndex::parse("header junk\ns1 0\n");
        assert_eq!(index.atlas_for("s1"), Some("atlas0"));
        assert_eq!(index.atlas_for("header"), None);
    }

    #[test]
    fn test_explicit_atlas_index() {
        let index = SpriteIndex::parse("h\nabc_1 2 16 16 extra fields\n");
        assert_eq!(index.atlas_for("abc_1"), Some("atlas2"));
    }

    #[test]
    fn test_negative_index_derives_from_prefix() {
        let index = SpriteIndex::parse("h\nabc_1 -1\nxyz -1\n");
        assert_eq!(index.atlas_for("abc_1"), Some("atlas_abc"));
        assert_eq!(index.atlas_for("xyz"), Some("atlas_xyz"));
    }

    #[test]
    fn test_empty_lines_and_bad_records_skipped() {
        let index = SpriteIndex::parse("h\n\ns1 0\nbad nonnumeric\n\ns2 1\n");
        assert_eq!(index.len(), 2);
        assert_eq!(index.atlas_for("s2"), Some("atlas1"));
        assert_eq!(index.atlas_for("bad"), None);
    }

    #[test]
    fn test_unknown_sprite() {
        let index = SpriteIndex::parse("h\ns1 0\n");
        assert_eq!(index.atlas_for("nope"), None);
    }
}
