//! Package construction configuration.

/// Options applied when a package is created.
///
/// The eager-decode choice is injected by the caller so the catalog
/// core stays free of host-environment queries.
#[derive(Debug, Clone)]
pub struct PackageConfig {
    /// Materialize every record during construction.
    ///
    /// When set, the archive text table and the sprite/atlas index are
    /// discarded after construction since no further first-access
    /// decode can occur. When unset, records stay lazy and the record
    /// list is sorted by name for stable enumeration.
    pub eager_decode: bool,
}

impl Default for PackageConfig {
    fn default() -> Self {
        Self {
            eager_decode: false,
        }
    }
}
