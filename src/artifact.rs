//! Export results.

use std::{fs, path::Path};

use crate::error::FramepackError;

/// The format of an [`ExportArtifact`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ArtifactKind {
    /// A PNG sprite sheet.
    Png,
    /// An animated GIF.
    Gif,
    /// A WebM video clip.
    Webm,
}

impl ArtifactKind {
    /// MIME type, e.g. `image/png`.
    pub fn mime_type(self) -> &'static str {
        match self {
            ArtifactKind::Png => "image/png",
            ArtifactKind::Gif => "image/gif",
            ArtifactKind::Webm => "video/webm",
        }
    }

    /// File extension without the dot.
    pub fn extension(self) -> &'static str {
        match self {
            ArtifactKind::Png => "png",
            ArtifactKind::Gif => "gif",
            ArtifactKind::Webm => "webm",
        }
    }

    /// Default download name.
    pub fn suggested_file_name(self) -> &'static str {
        match self {
            ArtifactKind::Png => "sprite-sheet.png",
            ArtifactKind::Gif => "animation.gif",
            ArtifactKind::Webm => "animation.webm",
        }
    }
}

/// An encoded export, ready to be written or offered for download.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportArtifact {
    pub(crate) bytes: Vec<u8>,
    pub(crate) kind: ArtifactKind,
}

impl ExportArtifact {
    pub(crate) fn new(bytes: Vec<u8>, kind: ArtifactKind) -> Self {
        Self { bytes, kind }
    }

    /// Artifact format.
    pub fn kind(&self) -> ArtifactKind {
        self.kind
    }

    /// Encoded bytes.
    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Size of the encoded bytes.
    pub fn byte_size(&self) -> usize {
        self.bytes.len()
    }

    /// MIME type of the artifact.
    pub fn mime_type(&self) -> &'static str {
        self.kind.mime_type()
    }

    /// File extension without the dot.
    pub fn extension(&self) -> &'static str {
        self.kind.extension()
    }

    /// Default file name: `sprite-sheet.png`, `animation.gif` or
    /// `animation.webm`.
    pub fn suggested_file_name(&self) -> &'static str {
        self.kind.suggested_file_name()
    }

    /// Write the bytes to `path`.
    ///
    /// # Errors
    ///
    /// [`FramepackError::IoError`] if the file cannot be written.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<(), FramepackError> {
        let path = path.as_ref();
        log::debug!("Writing {} bytes to {}", self.bytes.len(), path.display());
        fs::write(path, &self.bytes)?;
        Ok(())
    }

    /// Take the encoded bytes.
    pub fn into_bytes(self) -> Vec<u8> {
        self.bytes
    }
}
