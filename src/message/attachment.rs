//! File attachments
//!
//! Attachments are referenced by path and read fully into memory while the
//! message is composed, before any connection is opened.

use std::{ffi::OsStr, fs, path::Path};

use lettre::message::{header::ContentType, Attachment, SinglePart};
use mime::Mime;

use super::ValidationError;

/// Suffixes marking a content encoding rather than a media type, including
/// the short forms of compressed tarballs and SVG
const ENCODING_SUFFIXES: &[&str] = &[
    "gz", "Z", "bz2", "xz", "br", "tgz", "taz", "tz", "tbz2", "txz", "svgz",
];

/// Guesses the media type of a file from its name
///
/// Unknown types, and files whose last suffix is a content encoding
/// (`report.csv.gz`), are typed `application/octet-stream`: the encoded
/// content cannot be faithfully re-typed.
pub fn media_type(path: &Path) -> Mime {
    let encoded = path
        .extension()
        .and_then(OsStr::to_str)
        .is_some_and(|ext| ENCODING_SUFFIXES.contains(&ext));
    if encoded {
        return mime::APPLICATION_OCTET_STREAM;
    }

    mime_guess::from_path(path)
        .first()
        .unwrap_or(mime::APPLICATION_OCTET_STREAM)
}

/// Builds the attachment part for `path`
///
/// Returns `Ok(None)` when the path does not reference an existing regular
/// file: such attachments are skipped rather than failing the message.
pub(crate) fn load(path: &Path) -> Result<Option<SinglePart>, ValidationError> {
    if !fs::metadata(path).is_ok_and(|m| m.is_file()) {
        #[cfg(feature = "tracing")]
        tracing::debug!("skipping attachment {}: not a regular file", path.display());
        return Ok(None);
    }
    let Some(filename) = path.file_name() else {
        return Ok(None);
    };

    let content = fs::read(path).map_err(|source| ValidationError::Attachment {
        path: path.to_owned(),
        source,
    })?;
    let media_type = media_type(path);

    #[cfg(feature = "tracing")]
    tracing::debug!(
        "attaching {} ({} bytes, {})",
        path.display(),
        content.len(),
        media_type
    );

    Ok(Some(
        Attachment::new(filename.to_string_lossy().into_owned())
            .body(content, ContentType::from(media_type)),
    ))
}
