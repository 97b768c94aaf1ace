/// Detect an image MIME type from magic bytes (not the file extension, which
/// operators routinely get wrong when saving downloads).
pub fn detect_image_mime(bytes: &[u8]) -> Option<&'static str> {
    match bytes {
        // PNG: 89 50 4E 47
        [0x89, 0x50, 0x4E, 0x47, ..] => Some("image/png"),
        // JPEG: FF D8 FF
        [0xFF, 0xD8, 0xFF, ..] => Some("image/jpeg"),
        // WebP: "RIFF" .... "WEBP"
        [b'R', b'I', b'F', b'F', _, _, _, _, b'W', b'E', b'B', b'P', ..] => Some("image/webp"),
        // GIF87a / GIF89a
        [b'G', b'I', b'F', b'8', b'7' | b'9', b'a', ..] => Some("image/gif"),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detects_png() {
        assert_eq!(detect_image_mime(b"\x89PNG\r\n\x1a\n...."), Some("image/png"));
    }

    #[test]
    fn detects_jpeg() {
        assert_eq!(detect_image_mime(&[0xFF, 0xD8, 0xFF, 0xE0, 0, 0]), Some("image/jpeg"));
    }

    #[test]
    fn detects_webp() {
        assert_eq!(detect_image_mime(b"RIFF\x10\0\0\0WEBPVP8 "), Some("image/webp"));
    }

    #[test]
    fn detects_gif() {
        assert_eq!(detect_image_mime(b"GIF89a.."), Some("image/gif"));
    }

    #[test]
    fn rejects_unknown_and_short() {
        assert_eq!(detect_image_mime(b"%PDF-1.7"), None);
        assert_eq!(detect_image_mime(b"\x89P"), None);
        assert_eq!(detect_image_mime(&[]), None);
    }
}
