//! Turns user input into file descriptors ready for submission.
//!
//! Three sources feed the upload panel: paths given on the command line or typed
//! into the picker prompt, text pasted into the terminal when a file is dragged onto
//! it, and synthetic `NAME:SIZE:MIME` descriptors for files that don't exist locally.

use crate::model::FileDescriptor;
use std::path::Path;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IntakeError {
    #[error("descriptor '{0}' must look like NAME:SIZE:MIME")]
    Malformed(String),
    #[error("descriptor '{input}' has an invalid size '{size}'")]
    InvalidSize { input: String, size: String },
    #[error("descriptor '{0}' has an empty name")]
    EmptyName(String),
}

/// Describe a local path. Size comes from metadata when readable, otherwise 0;
/// the MIME type is guessed from the extension.
pub fn describe_path(path: &Path) -> FileDescriptor {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| path.display().to_string());

    let size_bytes = match std::fs::metadata(path) {
        Ok(meta) => meta.len(),
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "could not read file metadata, using size 0");
            0
        }
    };

    let mime_type = crate::mime::guess_from_name(&name);
    FileDescriptor::new(name, size_bytes, mime_type)
}

/// Parse a `NAME:SIZE:MIME` descriptor. The name may itself contain colons;
/// size and MIME are taken from the right.
pub fn parse_synthetic(input: &str) -> Result<FileDescriptor, IntakeError> {
    let mut parts = input.rsplitn(3, ':');
    let (Some(mime), Some(size), Some(name)) = (parts.next(), parts.next(), parts.next()) else {
        return Err(IntakeError::Malformed(input.to_string()));
    };

    let name = name.trim();
    if name.is_empty() {
        return Err(IntakeError::EmptyName(input.to_string()));
    }
    let size_bytes = size
        .trim()
        .parse::<u64>()
        .map_err(|_| IntakeError::InvalidSize {
            input: input.to_string(),
            size: size.to_string(),
        })?;

    Ok(FileDescriptor::new(name, size_bytes, mime.trim()))
}

/// Split pasted text into paths.
///
/// Terminals deliver a dropped file as its path, optionally quoted or as a
/// `file://` URI; several dropped files arrive separated by newlines or spaces.
/// Backslash-escaped spaces stay part of the path.
pub fn parse_pasted_paths(pasted: &str) -> Vec<String> {
    let mut out = Vec::new();
    let mut current = String::new();
    let mut quote: Option<char> = None;
    let mut chars = pasted.chars().peekable();

    while let Some(c) = chars.next() {
        match (quote, c) {
            (Some(q), c) if c == q => quote = None,
            (Some(_), c) => current.push(c),
            (None, '\'' | '"') => quote = Some(c),
            (None, '\\') => {
                if let Some(next) = chars.next() {
                    current.push(next);
                }
            }
            (None, c) if c.is_whitespace() => {
                if !current.is_empty() {
                    out.push(std::mem::take(&mut current));
                }
            }
            (None, c) => current.push(c),
        }
    }
    if !current.is_empty() {
        out.push(current);
    }

    out.into_iter()
        .map(|p| match p.strip_prefix("file://") {
            Some(rest) => rest.to_string(),
            None => p,
        })
        .collect()
}
