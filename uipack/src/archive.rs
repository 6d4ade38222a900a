//! Package archive decoding.
//!
//! A package descriptor arrives as a raw byte buffer in one of two
//! container formats, distinguished by a 4-byte magic signature:
//!
//! - **ZIP-like**: standard local-file-header signature (`PK\x03\x04`).
//!   Directory entries are skipped; file entries are decoded as UTF-8.
//! - **Legacy flat text**: repeated `name|length|content` records with no
//!   separator between records. The length is a decimal count of UTF-16
//!   code units, so content may itself contain `|` safely — this is
//!   length-prefixed framing, not delimiter escaping.
//!
//! Both decoders produce a [`TextTable`], the name → content mapping the
//! rest of the catalog reads from.

use std::collections::HashMap;
use std::io::{Cursor, Read};

use zip::ZipArchive;

use crate::error::PackageError;

/// ZIP local-file-header signature.
const ZIP_MAGIC: [u8; 4] = [0x50, 0x4b, 0x03, 0x04];

/// The decoded contents of a package archive: internal file name to
/// UTF-8 text content.
pub type TextTable = HashMap<String, String>;

/// Container formats a package archive can use.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArchiveFormat {
    /// ZIP-like container with local file headers.
    Zip,
    /// Legacy `name|length|content` flat text.
    FlatText,
}

/// Detect the container format from the leading magic bytes.
pub fn detect_format(bytes: &[u8]) -> ArchiveFormat {
    if bytes.len() >= 4 && bytes[..4] == ZIP_MAGIC {
        ArchiveFormat::Zip
    } else {
        ArchiveFormat::FlatText
    }
}

/// Decode a package archive into its text table.
pub fn decode(bytes: &[u8]) -> Result<TextTable, PackageError> {
    match detect_format(bytes) {
        ArchiveFormat::Zip => decode_zip(bytes),
        ArchiveFormat::FlatText => decode_flat(bytes),
    }
}

fn decode_zip(bytes: &[u8]) -> Result<TextTable, PackageError> {
    let mut archive = ZipArchive::new(Cursor::new(bytes))?;
    let mut table = TextTable::new();

    for i in 0..archive.len() {
        let mut entry = archive.by_index(i)?;
        if entry.is_dir() {
            continue;
        }
        let name = entry.name().to_string();
        let mut data = Vec::with_capacity(entry.size() as usize);
        entry
            .read_to_end(&mut data)
            .map_err(|e| PackageError::CorruptArchive(format!("entry '{}': {}", name, e)))?;
        table.insert(name, String::from_utf8_lossy(&data).into_owned());
    }

    Ok(table)
}

fn decode_flat(bytes: &[u8]) -> Result<TextTable, PackageError> {
    let source = String::from_utf8_lossy(bytes);
    let mut table = TextTable::new();
    let mut rest: &str = &source;

    loop {
        // No further '|' means end of input; trailing text without a
        // delimiter is silently ignored.
        let Some(pos) = rest.find('|') else { break };
        let name = &rest[..pos];
        rest = &rest[pos + 1..];

        let pos = rest.find('|').ok_or_else(|| {
            PackageError::CorruptArchive(format!("record '{}' has no length field", name))
        })?;
        let length: usize = rest[..pos].parse().map_err(|_| {
            PackageError::CorruptArchive(format!(
                "record '{}' has an unparsable length '{}'",
                name,
                &rest[..pos]
            ))
        })?;
        rest = &rest[pos + 1..];

        let (content, remainder) = take_utf16_units(rest, length).ok_or_else(|| {
            PackageError::CorruptArchive(format!(
                "record '{}' declares {} units but the buffer ends early",
                name, length
            ))
        })?;
        table.insert(name.to_string(), content.to_string());
        rest = remainder;
    }

    Ok(table)
}

/// Split off a prefix of exactly `units` UTF-16 code units.
///
/// The legacy format's length field counts UTF-16 code units, not bytes
/// or scalar values, so supplementary-plane characters count as two.
/// Returns `None` when the string holds fewer units than requested or a
/// split would land inside a surrogate pair.
fn take_utf16_units(s: &str, units: usize) -> Option<(&str, &str)> {
    let mut remaining = units;
    for (idx, ch) in s.char_indices() {
        if remaining == 0 {
            return Some(s.split_at(idx));
        }
        let w = ch.len_utf16();
        if w > remaining {
            // Length lands inside a surrogate pair.
            return None;
        }
        remaining -= w;
    }
    if remaining == 0 {
        Some((s, ""))
    } else {
        None
    }
}
