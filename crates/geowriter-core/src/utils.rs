//! Utility functions for encodings, file names and temporal formatting.

use std::path::{Path, PathBuf};

use chrono::{NaiveDateTime, NaiveTime};
use encoding_rs::{Encoding, UTF_8};

/// Sidecar suffixes removed before a shapefile is recreated.
pub const SHAPEFILE_SUFFIXES: [&str; 6] = ["shp", "shx", "dbf", "prj", "qix", "qpj"];

/// Converts a codec name into the value of the shapefile `ENCODING` option.
///
/// `System` maps to `LDID/0`. Code page names such as `CP1252`,
/// `windows-1250` or `ISO-8859-1` map to their number with dashes removed.
/// Anything else is returned unchanged.
///
/// # Examples
///
/// ```
/// use geowriter_core::utils::convert_codec_name_for_encoding_option;
///
/// assert_eq!(convert_codec_name_for_encoding_option("System"), "LDID/0");
/// assert_eq!(convert_codec_name_for_encoding_option("windows-1252"), "1252");
/// assert_eq!(convert_codec_name_for_encoding_option("ISO-8859-1"), "88591");
/// assert_eq!(convert_codec_name_for_encoding_option("UTF-8"), "UTF-8");
/// ```
#[must_use]
pub fn convert_codec_name_for_encoding_option(codec_name: &str) -> String {
    if codec_name == "System" {
        return "LDID/0".to_string();
    }

    let lower = codec_name.to_ascii_lowercase();
    let rest = ["cp", "windows-", "iso-", "iso "]
        .iter()
        .find(|prefix| lower.starts_with(*prefix))
        .map(|prefix| &codec_name[prefix.len()..]);

    if let Some(rest) = rest {
        let digits: String = rest.chars().filter(|c| *c != '-').collect();
        if !digits.is_empty() && digits.parse::<i32>().is_ok() {
            return digits;
        }
    }
    codec_name.to_string()
}

/// Resolves a codec by label, falling back to UTF-8 for unknown labels.
///
/// Returns the codec and whether the requested label was recognized.
#[must_use]
pub fn resolve_codec(label: &str) -> (&'static Encoding, bool) {
    match Encoding::for_label(label.trim().as_bytes()) {
        Some(encoding) => (encoding, true),
        None => (UTF_8, false),
    }
}

/// Encodes `text` with `codec`. Unmappable characters become numeric
/// character references.
#[must_use]
pub fn encode_text(codec: &'static Encoding, text: &str) -> Vec<u8> {
    let (bytes, _, _) = codec.encode(text);
    bytes.into_owned()
}

/// Formats a date-time the way shapefile attribute tables store it:
/// `yyyy/MM/dd hh:mm:ss.zzz`.
#[must_use]
pub fn format_shapefile_datetime(value: &NaiveDateTime) -> String {
    value.format("%Y/%m/%d %H:%M:%S%.3f").to_string()
}

/// Formats a time the way shapefile attribute tables store it:
/// `hh:mm:ss.zzz`.
#[must_use]
pub fn format_shapefile_time(value: &NaiveTime) -> String {
    value.format("%H:%M:%S%.3f").to_string()
}

/// Returns `true` if `path` ends in `.ext`, ignoring case.
#[must_use]
pub fn has_extension(path: &Path, ext: &str) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case(ext))
}

/// Appends `.ext` to the file name of `path`.
#[must_use]
pub fn append_extension(path: &Path, ext: &str) -> PathBuf {
    let mut raw = path.as_os_str().to_owned();
    raw.push(".");
    raw.push(ext);
    PathBuf::from(raw)
}

/// File name of `path` without its final extension.
#[must_use]
pub fn layer_name_for(path: &Path) -> String {
    path.file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_default()
}
