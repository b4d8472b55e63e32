//! Byte-stream encoding detection and decoding.
//!
//! This crate classifies a leading prefix of an unknown byte stream as
//! binary or text-with-codepage, and exposes decoders that turn a byte
//! cursor into ⟨codepoint, byte-length⟩ steps. Nothing here buffers the
//! whole stream; callers (the line iterator, the sliding window) are
//! responsible for keeping enough bytes resident.

pub mod codepage;
pub mod decoder;
pub mod detect;

pub use codepage::{CodePageId, CP_OEM_US, CP_UTF8, CP_UTF16BE, CP_UTF16LE, ensure_single_byte_cp, is_single_byte_codepage};
pub use decoder::{CharSize, CodePageService, Decoder, Step, decoder_for};
pub use detect::{Detector, EncodingDescriptor, HostEncodingService};
