//! uipack - UI asset package catalog
//!
//! This library loads UI resource packages from their descriptor
//! archives, catalogs the resources they declare, and materializes
//! each resource lazily on first access: atlas textures are sliced
//! into sprites, bitmap fonts are assembled from their metrics files,
//! animation clips and component descriptors are parsed from embedded
//! markup, and component text is localized through an optional
//! strings source. Loaded packages are addressed through a registry
//! by id, name, or `ui://` resource URL.

pub mod archive;
pub mod config;
pub mod error;
pub mod font;
pub mod item;
pub mod loader;
pub mod locale;
pub mod markup;
pub mod package;
pub mod registry;
pub mod sprites;
pub mod types;

pub use config::PackageConfig;
pub use error::PackageError;
pub use font::{BitmapFont, FontRegistry, GlyphInfo};
pub use item::{AtlasTexture, ItemKind, ItemPayload, MovieClip, PackageItem, SpriteFrame};
pub use loader::{AudioData, ResourceLoader, TextureData};
pub use package::{UiPackage, URL_PREFIX};
pub use registry::{parse_url, PackageRegistry, UrlRef};
pub use types::Rect;
