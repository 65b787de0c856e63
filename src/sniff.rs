//! Content sniffing
//!
//! Objects carry no reliable type information in an object store, so the kind of a
//! file is detected from the first bytes of its content. [`MagicSniffer`] recognizes
//! the signatures below and falls back to a text heuristic:
//!
//! ```text
//! 89 50 4E 47 0D 0A 1A 0A          image/png
//! FF D8 FF                         image/jpeg
//! "GIF87a" / "GIF89a"              image/gif
//! "RIFF" .... "WEBP"               image/webp
//! "BM"                             image/bmp
//! "II*\0" / "MM\0*"                image/tiff
//! 00 00 01 00                      image/vnd.microsoft.icon
//! [UInt32:size] "ftyp" [brand]     image/heic, image/avif
//! "%PDF-"                          application/pdf
//! "PK" 03 04                       application/zip
//! 1F 8B                            application/gzip
//! "BZh"                            application/x-bzip2
//! FD "7zXZ" 00                     application/x-xz
//! "7z" BC AF 27 1C                 application/x-7z-compressed
//! 7F "ELF"                         application/x-executable
//! ```

use std::io::Cursor;

use byteorder::{BigEndian, ReadBytesExt};

pub const MIME_EMPTY: &str = "application/x-empty";
pub const MIME_OCTET_STREAM: &str = "application/octet-stream";
pub const MIME_TEXT: &str = "text/plain";

/// Maps a content prefix to a MIME type string.
pub trait Sniffer: Send + Sync {
    fn classify(&self, prefix: &[u8]) -> String;
}

const SIGNATURES: &[(&[u8], &str)] = &[
    (b"\x89PNG\r\n\x1a\n", "image/png"),
    (b"\xff\xd8\xff", "image/jpeg"),
    (b"GIF87a", "image/gif"),
    (b"GIF89a", "image/gif"),
    (b"II*\x00", "image/tiff"),
    (b"MM\x00*", "image/tiff"),
    (b"\x00\x00\x01\x00", "image/vnd.microsoft.icon"),
    (b"%PDF-", "application/pdf"),
    (b"PK\x03\x04", "application/zip"),
    (b"\x1f\x8b", "application/gzip"),
    (b"BZh", "application/x-bzip2"),
    (b"\xfd7zXZ\x00", "application/x-xz"),
    (b"7z\xbc\xaf\x27\x1c", "application/x-7z-compressed"),
    (b"\x7fELF", "application/x-executable"),
];

const HEIF_BRANDS: &[&[u8; 4]] = &[b"heic", b"heix", b"hevc", b"heim", b"heis", b"mif1"];
const AVIF_BRANDS: &[&[u8; 4]] = &[b"avif", b"avis"];

/// Signature based sniffer used by the default content resolver.
#[derive(Debug, Default, Clone, Copy)]
pub struct MagicSniffer;

impl MagicSniffer {
    pub fn new() -> Self {
        MagicSniffer
    }

    fn riff(prefix: &[u8]) -> Option<&'static str> {
        if prefix.len() >= 12 && &prefix[..4] == b"RIFF" && &prefix[8..12] == b"WEBP" {
            Some("image/webp")
        } else {
            None
        }
    }

    fn bitmap(prefix: &[u8]) -> Option<&'static str> {
        // "BM" alone matches too much text; also require the reserved header words to be zero
        if prefix.len() >= 10 && &prefix[..2] == b"BM" && prefix[6..10] == [0, 0, 0, 0] {
            Some("image/bmp")
        } else {
            None
        }
    }

    /// ISO base media file: `[UInt32:box_size] "ftyp" [major_brand] [UInt32:minor] [compatible brands]`
    fn iso_bmff(prefix: &[u8]) -> Option<&'static str> {
        if prefix.len() < 12 || &prefix[4..8] != b"ftyp" {
            return None;
        }
        let mut reader = Cursor::new(prefix);
        let box_size = reader.read_u32::<BigEndian>().ok()? as usize;
        if box_size < 16 {
            return None;
        }
        let end = box_size.min(prefix.len());

        let mut brands = vec![&prefix[8..12]];
        let mut pos = 16;
        while pos + 4 <= end {
            brands.push(&prefix[pos..pos + 4]);
            pos += 4;
        }

        if brands.iter().any(|b| AVIF_BRANDS.iter().any(|a| &a[..] == *b)) {
            Some("image/avif")
        } else if brands.iter().any(|b| HEIF_BRANDS.iter().any(|h| &h[..] == *b)) {
            Some("image/heic")
        } else {
            None
        }
    }

    fn looks_like_text(prefix: &[u8]) -> bool {
        // The prefix may end in the middle of a multi-byte character
        let text = match std::str::from_utf8(prefix) {
            Ok(text) => text,
            Err(e) if e.error_len().is_none() => match std::str::from_utf8(&prefix[..e.valid_up_to()]) {
                Ok(text) => text,
                Err(_) => return false,
            },
            Err(_) => return false,
        };
        text.chars()
            .all(|c| !c.is_control() || matches!(c, '\n' | '\r' | '\t' | '\x0c'))
    }
}

impl Sniffer for MagicSniffer {
    fn classify(&self, prefix: &[u8]) -> String {
        if prefix.is_empty() {
            return MIME_EMPTY.to_string();
        }
        let found = SIGNATURES
            .iter()
            .find(|(magic, _)| prefix.starts_with(magic))
            .map(|(_, mime)| *mime)
            .or_else(|| Self::riff(prefix))
            .or_else(|| Self::bitmap(prefix))
            .or_else(|| Self::iso_bmff(prefix));

        match found {
            Some(mime) => mime.to_string(),
            None if Self::looks_like_text(prefix) => MIME_TEXT.to_string(),
            None => MIME_OCTET_STREAM.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn classify(bytes: &[u8]) -> String {
        MagicSniffer::new().classify(bytes)
    }

    #[test]
    fn test_image_signatures() {
        assert_eq!(classify(b"\x89PNG\r\n\x1a\n\x00\x00\x00\rIHDR"), "image/png");
        assert_eq!(classify(b"\xff\xd8\xff\xe0\x00\x10JFIF\x00"), "image/jpeg");
        assert_eq!(classify(b"GIF89a\x01\x00\x01\x00"), "image/gif");
        assert_eq!(classify(b"RIFF\x24\x00\x00\x00WEBPVP8 "), "image/webp");
        assert_eq!(classify(b"BM\x3e\x00\x00\x00\x00\x00\x00\x00\x36\x00"), "image/bmp");
        assert_eq!(classify(b"II*\x00\x08\x00\x00\x00"), "image/tiff");
        assert_eq!(classify(b"MM\x00*\x00\x00\x00\x08"), "image/tiff");
    }

    #[test]
    fn test_iso_bmff_brands() {
        let heic = b"\x00\x00\x00\x18ftypheic\x00\x00\x00\x00mif1heic";
        assert_eq!(classify(heic), "image/heic");

        let avif = b"\x00\x00\x00\x1cftypavif\x00\x00\x00\x00avifmif1miaf";
        assert_eq!(classify(avif), "image/avif");

        // mp4 containers share the box layout but are not images
        let mp4 = b"\x00\x00\x00\x18ftypisom\x00\x00\x02\x00isomiso2";
        assert_eq!(classify(mp4), MIME_OCTET_STREAM);
    }

    #[test]
    fn test_other_signatures() {
        assert_eq!(classify(b"%PDF-1.7\n"), "application/pdf");
        assert_eq!(classify(b"PK\x03\x04\x14\x00"), "application/zip");
        assert_eq!(classify(b"\x1f\x8b\x08\x00"), "application/gzip");
        assert_eq!(classify(b"\x7fELF\x02\x01\x01"), "application/x-executable");
    }

    #[test]
    fn test_text_and_fallbacks() {
        assert_eq!(classify(b""), MIME_EMPTY);
        assert_eq!(classify(b"hello, world\n"), MIME_TEXT);
        assert_eq!(classify(b"BMW is a car brand\n"), MIME_TEXT);
        assert_eq!(classify(b"\x00\x01\x02\x03binary"), MIME_OCTET_STREAM);
    }

    #[test]
    fn test_text_cut_mid_character() {
        // "zürich" truncated inside the two byte 'ü'
        assert_eq!(classify(b"z\xc3"), MIME_TEXT);
        assert_eq!(classify(b"z\xc3\x28"), MIME_OCTET_STREAM);
    }
}
