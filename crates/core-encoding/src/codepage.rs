//! Code page identifiers and single-byte/multi-byte classification.
//!
//! Mirrors the small, closed set of code pages `list-redux` cares about
//! (see `encodings.cpp`): the two Unicode transformation formats it
//! auto-detects, a handful of East-Asian DBCS OEM code pages that must be
//! collapsed to a single-byte code page before hex-mode rendering, and an
//! arbitrary single-byte code page id for everything else.

/// A code page identifier. Values mirror Windows code page numbers used by
/// the original tool (`encodings.cpp`), kept here only as stable integers —
/// no Win32 dependency exists in this crate.
pub type CodePageId = u32;

pub const CP_UTF8: CodePageId = 65001;
pub const CP_UTF16LE: CodePageId = 1200;
pub const CP_UTF16BE: CodePageId = 1201;
/// US OEM code page: the single-byte fallback used for binary files and for
/// any multi-byte OEM code page forced into hex mode.
pub const CP_OEM_US: CodePageId = 437;

/// DBCS OEM code pages that must collapse to [`CP_OEM_US`] for hex mode so
/// that exactly one display cell corresponds to one byte.
const MULTIBYTE_OEM_CODEPAGES: [CodePageId; 4] = [932, 936, 949, 950];

/// True for a code page whose decoder consumes exactly one byte per
/// codepoint (every code page except the two Unicode transformation formats
/// and the DBCS OEM code pages).
pub fn is_single_byte_codepage(cp: CodePageId) -> bool {
    cp != CP_UTF8
        && cp != CP_UTF16LE
        && cp != CP_UTF16BE
        && !MULTIBYTE_OEM_CODEPAGES.contains(&cp)
}

pub fn is_multibyte_oem_codepage(cp: CodePageId) -> bool {
    MULTIBYTE_OEM_CODEPAGES.contains(&cp)
}

/// Force a single-byte-per-cell code page for hex-mode rendering: multibyte
/// OEM code pages collapse to [`CP_OEM_US`]; everything else passes through
/// unchanged (Unicode formats are handled separately by the caller, which
/// never invokes this for them in practice since hex mode always re-bases
/// onto a single-byte page first).
pub fn ensure_single_byte_cp(cp: CodePageId) -> CodePageId {
    if is_multibyte_oem_codepage(cp) {
        CP_OEM_US
    } else {
        cp
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn multibyte_oem_collapses() {
        for cp in [932, 936, 949, 950] {
            assert_eq!(ensure_single_byte_cp(cp), CP_OEM_US);
            assert!(!is_single_byte_codepage(cp));
        }
    }

    #[test]
    fn unicode_pages_are_not_single_byte() {
        assert!(!is_single_byte_codepage(CP_UTF8));
        assert!(!is_single_byte_codepage(CP_UTF16LE));
        assert!(!is_single_byte_codepage(CP_UTF16BE));
    }

    #[test]
    fn ordinary_codepage_passes_through() {
        assert_eq!(ensure_single_byte_cp(1252), 1252);
        assert!(is_single_byte_codepage(1252));
        assert!(is_single_byte_codepage(CP_OEM_US));
    }
}
