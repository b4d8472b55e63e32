//! Sliding data window: a single contiguous buffer of `slop + main + slop`
//! bytes caching a sub-range of an arbitrary byte source. Reloading a
//! window that overlaps what is already resident reuses the overlapping
//! region via an in-buffer shift and only reads the delta from the source.

use std::io;

pub const DEFAULT_SLOP: usize = 256;
pub const PIPE_SLOP: usize = 4096 * 16;
pub const DEFAULT_MAIN: usize = 64 * 1024;
const PAGE_SIZE: usize = 4096;

/// Abstracts over a plain file, a captured pipe, and an in-memory text
/// buffer (the help viewer's source). `read_at` fills as much of `buf` as
/// the source has available starting at `offset` and returns the count.
pub trait DataSource {
    fn read_at(&mut self, offset: u64, buf: &mut [u8]) -> io::Result<usize>;
    /// Total length, when known. A live pipe capture always knows its
    /// length because the whole stream is drained into chunks at open.
    fn len(&self) -> u64;
}

pub struct FileSource {
    file: std::fs::File,
    len: u64,
}

impl FileSource {
    pub fn open(path: &std::path::Path) -> io::Result<Self> {
        let file = std::fs::File::open(path)?;
        let len = file.metadata()?.len();
        Ok(Self { file, len })
    }
}

impl DataSource for FileSource {
    fn read_at(&mut self, offset: u64, buf: &mut [u8]) -> io::Result<usize> {
        use std::io::{Read, Seek, SeekFrom};
        self.file.seek(SeekFrom::Start(offset))?;
        let mut total = 0;
        while total < buf.len() {
            match self.file.read(&mut buf[total..]) {
                Ok(0) => break,
                Ok(n) => total += n,
                Err(ref e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e),
            }
        }
        Ok(total)
    }

    fn len(&self) -> u64 {
        self.len
    }
}

/// A stdin/pipe source: the whole stream is drained into page-sized chunks
/// at open time, since a pipe has no seek capability.
pub struct PipeSource {
    chunks: Vec<Vec<u8>>,
    len: u64,
}

impl PipeSource {
    pub fn drain<R: std::io::Read>(mut reader: R) -> io::Result<Self> {
        let mut chunks = Vec::new();
        let mut len = 0u64;
        loop {
            let mut chunk = vec![0u8; PAGE_SIZE];
            let mut filled = 0;
            while filled < PAGE_SIZE {
                match reader.read(&mut chunk[filled..]) {
                    Ok(0) => break,
                    Ok(n) => filled += n,
                    Err(ref e) if e.kind() == io::ErrorKind::Interrupted => continue,
                    Err(e) => return Err(e),
                }
            }
            if filled == 0 {
                break;
            }
            len += filled as u64;
            chunk.truncate(filled);
            let exhausted = filled < PAGE_SIZE;
            chunks.push(chunk);
            if exhausted {
                break;
            }
        }
        Ok(Self { chunks, len })
    }
}

impl DataSource for PipeSource {
    fn read_at(&mut self, offset: u64, buf: &mut [u8]) -> io::Result<usize> {
        if offset >= self.len {
            return Ok(0);
        }
        let mut index = (offset / PAGE_SIZE as u64) as usize;
        let mut within = (offset % PAGE_SIZE as u64) as usize;
        let mut written = 0;
        while written < buf.len() && index < self.chunks.len() {
            let chunk = &self.chunks[index];
            if within >= chunk.len() {
                break;
            }
            let n = (chunk.len() - within).min(buf.len() - written);
            buf[written..written + n].copy_from_slice(&chunk[within..within + n]);
            written += n;
            index += 1;
            within = 0;
        }
        Ok(written)
    }

    fn len(&self) -> u64 {
        self.len
    }
}

/// An in-memory source backing the help viewer (content that never lives
/// on disk).
pub struct TextSource {
    data: Vec<u8>,
}

impl TextSource {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            data: text.into().into_bytes(),
        }
    }
}

impl DataSource for TextSource {
    fn read_at(&mut self, offset: u64, buf: &mut [u8]) -> io::Result<usize> {
        let offset = offset as usize;
        if offset >= self.data.len() {
            return Ok(0);
        }
        let n = (self.data.len() - offset).min(buf.len());
        buf[..n].copy_from_slice(&self.data[offset..offset + n]);
        Ok(n)
    }

    fn len(&self) -> u64 {
        self.data.len() as u64
    }
}

/// Single contiguous buffer caching `[data_offset, data_offset +
/// data_length)` of a source, with `slop` bytes of look-behind/look-ahead
/// padding reserved at each end of the loaded range whenever the source is
/// long enough to need it.
pub struct SlidingWindow {
    buf: Vec<u8>,
    data_offset: u64,
    data_length: usize,
    slop: usize,
    main: usize,
    /// Slop bytes actually available at the tail of the current load (may
    /// be less than `slop` near end of stream).
    end_slop: usize,
    source_len: u64,
}

impl SlidingWindow {
    pub fn new(slop: usize, main: usize, source_len: u64) -> Self {
        Self {
            buf: vec![0u8; slop + main + slop],
            data_offset: 0,
            data_length: 0,
            slop,
            main,
            end_slop: 0,
            source_len,
        }
    }

    pub fn slop(&self) -> usize {
        self.slop
    }

    pub fn data_offset(&self) -> u64 {
        self.data_offset
    }

    pub fn data_length(&self) -> usize {
        self.data_length
    }

    /// True when `[offset, offset+length)` is fully covered by the current
    /// load, holding back `end_slop` bytes as the margin a caller should
    /// not rely on without a fresh load (mirrors the original tool's
    /// "trailing slop may be short at EOF" bookkeeping).
    pub fn covers(&self, offset: u64, length: usize) -> bool {
        offset >= self.data_offset
            && offset + length as u64 <= self.data_offset + self.data_length as u64
    }

    pub fn slice(&self, offset: u64, length: usize) -> Option<&[u8]> {
        if !self.covers(offset, length) {
            return None;
        }
        let start = (offset - self.data_offset) as usize;
        Some(&self.buf[start..start + length])
    }

    /// Ensure the window covers `[request_offset - slop, request_offset +
    /// main + slop)` clipped to the source, reusing any overlap with the
    /// previously-loaded range and reading only the delta from `source`.
    pub fn ensure(&mut self, source: &mut dyn DataSource, request_offset: u64) -> io::Result<()> {
        let begin = request_offset.saturating_sub(self.slop as u64);
        let mut end = request_offset + self.main as u64 + self.slop as u64;
        if end > self.source_len {
            end = self.source_len;
        }
        let to_read_total = (end - begin) as usize;

        let mut kept_at_head = 0usize;
        let mut kept_at_tail = 0usize;

        let overlaps = begin < self.data_offset + self.data_length as u64 && end > self.data_offset;
        if overlaps {
            if begin >= self.data_offset && end >= self.data_offset + self.data_length as u64 {
                // Reusable prefix: shift the tail of the old buffer to the front.
                let offset_to_begin_in_data = (begin - self.data_offset) as usize;
                let keep_length = ((end - begin) as usize).min(self.data_length - offset_to_begin_in_data);
                self.buf.copy_within(
                    offset_to_begin_in_data..offset_to_begin_in_data + keep_length,
                    0,
                );
                kept_at_head = keep_length;
            } else if begin < self.data_offset && end < self.data_offset + self.data_length as u64 {
                // Reusable suffix: shift the head of the old buffer to the back.
                let keep_length = (end - self.data_offset) as usize;
                let offset_to_dest = (self.data_offset - begin) as usize;
                self.buf.copy_within(0..keep_length, offset_to_dest);
                kept_at_tail = keep_length;
            }
        }

        let to_read = to_read_total - kept_at_head - kept_at_tail;
        let read_start = begin + kept_at_head as u64;
        let bytes_read = if to_read > 0 {
            source.read_at(read_start, &mut self.buf[kept_at_head..kept_at_head + to_read])?
        } else {
            0
        };

        self.data_offset = begin;
        self.data_length = kept_at_head + bytes_read + kept_at_tail;
        self.end_slop = if begin + self.main as u64 + bytes_read as u64 > end {
            0
        } else if begin + self.main as u64 < end {
            (end - (begin + self.main as u64)) as usize
        } else {
            0
        };
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn loads_from_start() {
        let data = b"0123456789".repeat(10);
        let mut src = TextSource { data: data.clone() };
        let mut w = SlidingWindow::new(4, 16, data.len() as u64);
        w.ensure(&mut src, 0).unwrap();
        assert_eq!(w.data_offset(), 0);
        assert!(w.covers(0, 10));
        assert_eq!(w.slice(0, 10).unwrap(), &data[0..10]);
    }

    #[test]
    fn reload_reuses_overlap() {
        let data: Vec<u8> = (0u8..=255).cycle().take(2000).collect();
        let mut src = TextSource { data: data.clone() };
        let mut w = SlidingWindow::new(8, 32, data.len() as u64);
        w.ensure(&mut src, 0).unwrap();
        w.ensure(&mut src, 20).unwrap();
        assert!(w.covers(20, 10));
        assert_eq!(w.slice(20, 10).unwrap(), &data[20..30]);
    }

    #[test]
    fn pipe_source_drains_all_chunks() {
        let payload = vec![7u8; PAGE_SIZE * 2 + 10];
        let mut pipe = PipeSource::drain(&payload[..]).unwrap();
        assert_eq!(pipe.len(), payload.len() as u64);
        let mut buf = vec![0u8; 5];
        pipe.read_at(PAGE_SIZE as u64, &mut buf).unwrap();
        assert_eq!(buf, vec![7u8; 5]);
    }
}
