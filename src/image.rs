//! Typed file wrappers
//!
//! Files whose content sniffs as a registered MIME type are handed out wrapped in a
//! [`TypedFileNode`]. The wrapper is a decoration only: it is bound to the same key and
//! store client as the plain [`FileNode`] it was built from, and it can always be
//! unwrapped back into one.

use std::fmt;

use crate::error::Result;
use crate::file::{FileNode, ObjectReader};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ImageFormat {
    Png,
    Jpeg,
    Gif,
    Webp,
    Bmp,
    Tiff,
    Ico,
    Heic,
    Avif,
}

impl ImageFormat {
    pub const ALL: [ImageFormat; 9] = [
        ImageFormat::Png,
        ImageFormat::Jpeg,
        ImageFormat::Gif,
        ImageFormat::Webp,
        ImageFormat::Bmp,
        ImageFormat::Tiff,
        ImageFormat::Ico,
        ImageFormat::Heic,
        ImageFormat::Avif,
    ];

    pub fn mime(&self) -> &'static str {
        match self {
            ImageFormat::Png => "image/png",
            ImageFormat::Jpeg => "image/jpeg",
            ImageFormat::Gif => "image/gif",
            ImageFormat::Webp => "image/webp",
            ImageFormat::Bmp => "image/bmp",
            ImageFormat::Tiff => "image/tiff",
            ImageFormat::Ico => "image/vnd.microsoft.icon",
            ImageFormat::Heic => "image/heic",
            ImageFormat::Avif => "image/avif",
        }
    }

    pub fn from_mime(mime: &str) -> Option<ImageFormat> {
        ImageFormat::ALL.into_iter().find(|f| f.mime() == mime)
    }

    /// Conventional file extension, without the dot
    pub fn extension(&self) -> &'static str {
        match self {
            ImageFormat::Png => "png",
            ImageFormat::Jpeg => "jpg",
            ImageFormat::Gif => "gif",
            ImageFormat::Webp => "webp",
            ImageFormat::Bmp => "bmp",
            ImageFormat::Tiff => "tiff",
            ImageFormat::Ico => "ico",
            ImageFormat::Heic => "heic",
            ImageFormat::Avif => "avif",
        }
    }
}

impl fmt::Display for ImageFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.mime())
    }
}

/// An object recognized as an image.
#[derive(Clone)]
pub struct ImageFile {
    file: FileNode,
    format: ImageFormat,
}

impl ImageFile {
    pub(crate) fn new(file: FileNode, format: ImageFormat) -> Self {
        Self { file, format }
    }

    pub fn format(&self) -> ImageFormat {
        self.format
    }

    pub fn file(&self) -> &FileNode {
        &self.file
    }

    pub fn path(&self) -> Result<&str> {
        self.file.path()
    }

    pub fn size(&self) -> Result<u64> {
        self.file.size()
    }

    pub fn open(&self) -> Result<ObjectReader> {
        self.file.open()
    }

    /// Encoded image bytes
    pub fn read_all(&self) -> Result<Vec<u8>> {
        self.file.read_all()
    }
}

impl fmt::Debug for ImageFile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ImageFile")
            .field("path", &self.file.path().ok())
            .field("format", &self.format)
            .finish()
    }
}

/// A file decorated with the content kind it was recognized as.
#[derive(Debug, Clone)]
pub enum TypedFileNode {
    Image(ImageFile),
}

impl TypedFileNode {
    pub fn mime(&self) -> &'static str {
        match self {
            TypedFileNode::Image(image) => image.format().mime(),
        }
    }

    pub fn file(&self) -> &FileNode {
        match self {
            TypedFileNode::Image(image) => image.file(),
        }
    }

    pub fn into_file(self) -> FileNode {
        match self {
            TypedFileNode::Image(image) => image.file,
        }
    }

    pub fn as_image(&self) -> Option<&ImageFile> {
        match self {
            TypedFileNode::Image(image) => Some(image),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mime_round_trip() {
        for format in ImageFormat::ALL {
            assert_eq!(ImageFormat::from_mime(format.mime()), Some(format));
        }
        assert_eq!(ImageFormat::from_mime("text/plain"), None);
    }

    #[test]
    fn test_display_is_mime() {
        assert_eq!(ImageFormat::Jpeg.to_string(), "image/jpeg");
        assert_eq!(ImageFormat::Jpeg.extension(), "jpg");
    }
}
