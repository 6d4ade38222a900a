//! Fatal package-construction errors.
//!
//! Only failures that abort package creation are represented here: a
//! malformed archive, a missing required archive entry, or an invalid
//! manifest. Every other failure mode (lookup misses, missing backing
//! assets, localization misses) is absorbed at the call site, logged,
//! and surfaced as an absent or default value so a damaged package
//! remains usable for everything that did decode.

use thiserror::Error;

/// Errors that abort package creation.
///
/// When one of these is returned the caller holds no package reference
/// and nothing has been registered.
#[derive(Debug, Error)]
pub enum PackageError {
    /// The archive's framing is damaged: a legacy length field failed to
    /// parse, or a declared length overruns the buffer.
    #[error("corrupt package archive: {0}")]
    CorruptArchive(String),

    /// The ZIP container could not be read.
    #[error("failed to read package archive")]
    Zip(#[from] zip::result::ZipError),

    /// A required archive entry is absent.
    #[error("missing required entry '{0}' in package archive")]
    MissingEntry(String),

    /// The package manifest is present but structurally invalid.
    #[error("invalid package manifest: {0}")]
    InvalidManifest(String),

    /// A descriptor that must parse at construction time did not.
    #[error("malformed markup in '{name}'")]
    Markup {
        name: String,
        #[source]
        source: xmltree::ParseError,
    },

    /// The loader could not produce the descriptor for a path-based
    /// package registration.
    #[error("cannot load package descriptor from '{0}'")]
    DescriptorNotFound(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = PackageError::MissingEntry("package.xml".to_string());
        assert_eq!(
            err.to_string(),
            "missing required entry 'package.xml' in package archive"
        );

        let err = PackageError::CorruptArchive("bad length field".to_string());
        assert!(err.to_string().contains("bad length field"));
    }
}
