//! Encoding detector: classify a leading prefix of a byte stream as
//! {Binary, Text(codepage)} and produce a human-readable encoding name.

use crate::codepage::{self, CodePageId};

const DETECT_WINDOW: usize = 4096;

/// Codes in 0..31 that are allowed to appear in text: BEL, TAB, LF, VT, FF,
/// CR, Ctrl-Z. Any other C0 control byte forces the file to be classified
/// Binary.
fn is_binary_only_control(b: u8) -> bool {
    const ALLOWED: [u8; 7] = [0x07, 0x09, 0x0A, 0x0B, 0x0C, 0x0D, 0x1A];
    b < 0x20 && !ALLOWED.contains(&b)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodingDescriptor {
    pub codepage: CodePageId,
    pub name: String,
    pub is_binary: bool,
}

impl EncodingDescriptor {
    fn binary(name: &str) -> Self {
        Self {
            codepage: codepage::CP_OEM_US,
            name: name.to_string(),
            is_binary: true,
        }
    }

    fn text(codepage: CodePageId, name: &str) -> Self {
        Self {
            codepage,
            name: name.to_string(),
            is_binary: false,
        }
    }
}

/// Seam for a platform encoding-detection service. The
/// default implementation is a small heuristic: valid, non-ASCII-only UTF-8
/// is reported as UTF-8; anything else falls back to OEM-US. A real
/// deployment can plug in a fuller charset-detection library here without
/// touching the rest of the detector.
pub trait HostEncodingService: Send + Sync {
    fn detect(&self, trimmed_prefix: &[u8]) -> Option<(CodePageId, String)>;
}

pub struct HeuristicEncodingService;

impl HostEncodingService for HeuristicEncodingService {
    fn detect(&self, trimmed_prefix: &[u8]) -> Option<(CodePageId, String)> {
        match std::str::from_utf8(trimmed_prefix) {
            Ok(_) => Some((codepage::CP_UTF8, "Unicode (UTF-8)".to_string())),
            Err(_) => None,
        }
    }
}

pub struct Detector {
    host: Box<dyn HostEncodingService>,
}

impl Default for Detector {
    fn default() -> Self {
        Self::new()
    }
}

impl Detector {
    pub fn new() -> Self {
        Self {
            host: Box::new(HeuristicEncodingService),
        }
    }

    pub fn with_host(host: Box<dyn HostEncodingService>) -> Self {
        Self { host }
    }

    /// Classify the leading prefix of a stream. `multibyte_enabled` is
    /// accepted for forward compatibility with callers that track whether
    /// DBCS code pages are enabled; the heuristic path here always falls
    /// back to the single-byte OEM code page regardless.
    pub fn detect(&self, prefix: &[u8], _multibyte_enabled: bool) -> EncodingDescriptor {
        if prefix.is_empty() {
            return EncodingDescriptor::binary("Empty File");
        }

        if prefix.starts_with(b"%PDF") {
            return EncodingDescriptor::binary("PDF File");
        }

        if prefix.starts_with(&[0xFF, 0xFE]) {
            return EncodingDescriptor::text(codepage::CP_UTF16LE, "Unicode (UTF-16LE)");
        }
        if prefix.starts_with(&[0xFE, 0xFF]) {
            return EncodingDescriptor::text(codepage::CP_UTF16BE, "Unicode (UTF-16BE)");
        }
        if prefix.starts_with(&[0xEF, 0xBB, 0xBF]) {
            return EncodingDescriptor::text(codepage::CP_UTF8, "Unicode (UTF-8)");
        }

        let window = &prefix[..prefix.len().min(DETECT_WINDOW)];
        if window.iter().any(|&b| is_binary_only_control(b)) {
            return EncodingDescriptor::binary("Binary File");
        }

        // Trim trailing high-bit-set bytes so a severed multi-byte
        // character at the edge of the prefix doesn't skew detection.
        let mut trimmed_len = window.len();
        while trimmed_len > 0 && window[trimmed_len - 1] & 0x80 != 0 {
            trimmed_len -= 1;
        }
        let trimmed = &window[..trimmed_len];

        match self.host.detect(trimmed) {
            Some((cp, name)) => EncodingDescriptor::text(cp, &name),
            None => EncodingDescriptor::text(codepage::CP_OEM_US, "OEM US (437)"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn detector() -> Detector {
        Detector::new()
    }

    #[test]
    fn empty_is_binary() {
        let d = detector();
        let r = d.detect(b"", true);
        assert!(r.is_binary);
        assert_eq!(r.name, "Empty File");
    }

    #[test]
    fn pdf_signature() {
        let d = detector();
        let r = d.detect(b"%PDF-1.7 rest", true);
        assert!(r.is_binary);
        assert_eq!(r.name, "PDF File");
    }

    #[test]
    fn utf8_bom_is_text() {
        let d = detector();
        let r = d.detect(&[0xEF, 0xBB, 0xBF, b'A', b'\n'], true);
        assert!(!r.is_binary);
        assert_eq!(r.codepage, codepage::CP_UTF8);
    }

    #[test]
    fn utf16le_bom_is_text() {
        let d = detector();
        let r = d.detect(&[0xFF, 0xFE, b'A', 0], true);
        assert_eq!(r.codepage, codepage::CP_UTF16LE);
        assert!(!r.is_binary);
    }

    #[test]
    fn control_byte_forces_binary() {
        let d = detector();
        let r = d.detect(b"hello\x01world", true);
        assert!(r.is_binary);
    }

    #[test]
    fn allowed_controls_stay_text() {
        let d = detector();
        let r = d.detect(b"line one\r\nline two\ttabbed\x1a", true);
        assert!(!r.is_binary);
    }

    #[test]
    fn plain_ascii_is_utf8_via_heuristic() {
        let d = detector();
        let r = d.detect(b"plain ascii text\n", true);
        assert!(!r.is_binary);
        assert_eq!(r.codepage, codepage::CP_UTF8);
    }
}
