//! Hex-patch store: sparse, block-aligned pending/committed overrides over
//! a file's bytes. Patches never mutate the file until [`PatchStore::save`]
//! is called explicitly; [`PatchStore::revert_byte`] only ever undoes a
//! pending (unsaved) edit, never a committed one.

use std::collections::BTreeMap;
use std::io;

pub type FileOffset = u64;

/// Block size in bytes. Must stay a power of two so offset-to-block
/// alignment is a simple mask.
pub const BLOCK_SIZE: u64 = 8;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ByteColor {
    Edited,
    Saved,
}

pub trait RandomAccessWrite {
    fn write_at(&mut self, offset: u64, bytes: &[u8]) -> io::Result<()>;
}

impl RandomAccessWrite for std::fs::File {
    fn write_at(&mut self, offset: u64, bytes: &[u8]) -> io::Result<()> {
        use std::io::{Seek, SeekFrom, Write};
        self.seek(SeekFrom::Start(offset))?;
        self.write_all(bytes)
    }
}

#[derive(Debug, Clone)]
struct PatchBlock {
    offset: FileOffset,
    mask: u8,
    bytes: [u8; BLOCK_SIZE as usize],
    original: [u8; BLOCK_SIZE as usize],
}

impl PatchBlock {
    fn new(offset: FileOffset) -> Self {
        Self {
            offset,
            mask: 0,
            bytes: [0; BLOCK_SIZE as usize],
            original: [0; BLOCK_SIZE as usize],
        }
    }

    fn is_set(&self, index: usize) -> bool {
        self.mask & (1 << index) != 0
    }

    fn is_dirty(&self) -> bool {
        self.mask != 0
    }

    fn set_byte(&mut self, index: usize, value: u8, original: Option<u8>) {
        self.bytes[index] = value;
        if let Some(o) = original {
            debug_assert!(!self.is_set(index), "first-observed original must only be recorded once");
            self.original[index] = o;
        }
        self.mask |= 1 << index;
    }

    fn revert_byte(&mut self, index: usize) {
        self.mask &= !(1 << index);
    }

    fn get_byte(&self, index: usize) -> u8 {
        self.bytes[index]
    }

    /// Merge `other`'s set bytes into `self`, preserving `self`'s earlier
    /// recorded original where both have the same byte set.
    fn merge_from(&mut self, other: &PatchBlock) {
        for i in 0..BLOCK_SIZE as usize {
            let bit = 1u8 << i;
            if other.mask & bit != 0 {
                if self.mask & bit == 0 {
                    self.original[i] = other.original[i];
                }
                self.bytes[i] = other.bytes[i];
            }
        }
        self.mask |= other.mask;
    }

    /// Write contiguous runs of set bytes (current values, or `original`
    /// values for an undo) to `dest`. Deliberately never re-reads the
    /// destination's current bytes first: during a retried partial save
    /// that would silently adopt already-written values as "originals".
    fn save(&self, dest: &mut dyn RandomAccessWrite, write_original: bool) -> io::Result<()> {
        let mut run_start: Option<usize> = None;
        let mut run: Vec<u8> = Vec::new();
        let mut flush = |dest: &mut dyn RandomAccessWrite, start: usize, run: &mut Vec<u8>| -> io::Result<()> {
            if !run.is_empty() {
                dest.write_at(self.offset + start as u64, run)?;
                run.clear();
            }
            Ok(())
        };
        for index in 0..BLOCK_SIZE as usize {
            if self.is_set(index) {
                if run_start.is_none() {
                    run_start = Some(index);
                }
                run.push(if write_original { self.original[index] } else { self.bytes[index] });
            } else if let Some(start) = run_start.take() {
                flush(dest, start, &mut run)?;
            }
        }
        if let Some(start) = run_start {
            flush(dest, start, &mut run)?;
        }
        Ok(())
    }
}

fn block_offset(offset: FileOffset) -> FileOffset {
    offset & !(BLOCK_SIZE - 1)
}

/// Two sparse maps of block-aligned patches: edits not yet written to disk
/// (`pending`) and edits already flushed by a previous `save` (`committed`).
#[derive(Default)]
pub struct PatchStore {
    pending: BTreeMap<FileOffset, PatchBlock>,
    committed: BTreeMap<FileOffset, PatchBlock>,
}

impl PatchStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_dirty(&self) -> bool {
        !self.pending.is_empty()
    }

    /// The byte visible at `offset` if any patch overrides it, pending
    /// taking priority over committed, plus which color to render it in.
    pub fn is_byte_dirty(&self, offset: FileOffset) -> Option<(u8, ByteColor)> {
        let bo = block_offset(offset);
        let index = (offset - bo) as usize;
        if let Some(b) = self.pending.get(&bo) {
            if b.is_set(index) {
                return Some((b.get_byte(index), ByteColor::Edited));
            }
        }
        if let Some(b) = self.committed.get(&bo) {
            if b.is_set(index) {
                return Some((b.get_byte(index), ByteColor::Saved));
            }
        }
        None
    }

    /// Apply a nibble edit at `offset`. `disk_byte` is consulted only when
    /// the byte is not already overridden, to capture the first-observed
    /// original exactly once.
    pub fn set_byte(
        &mut self,
        offset: FileOffset,
        nibble_value: u8,
        high_nibble: bool,
        disk_byte: impl FnOnce() -> u8,
    ) {
        let bo = block_offset(offset);
        let index = (offset - bo) as usize;

        let (existing, already_dirty) = match self.is_byte_dirty(offset) {
            Some((v, _)) => (v, true),
            None => (disk_byte(), false),
        };

        let mut value = nibble_value & 0x0F;
        if high_nibble {
            value <<= 4;
        }
        value |= existing & if high_nibble { 0x0F } else { 0xF0 };

        let block = self.pending.entry(bo).or_insert_with(|| PatchBlock::new(bo));
        if already_dirty {
            block.set_byte(index, value, None);
        } else {
            block.set_byte(index, value, Some(existing));
        }
    }

    /// Remove a pending override, restoring the disk's original byte. Never
    /// touches `committed` — a saved edit cannot be reverted, only undone
    /// via [`PatchStore::undo_save`].
    pub fn revert_byte(&mut self, offset: FileOffset) -> bool {
        let bo = block_offset(offset);
        let Some(block) = self.pending.get_mut(&bo) else {
            return false;
        };
        let index = (offset - bo) as usize;
        if !block.is_set(index) {
            return false;
        }
        block.revert_byte(index);
        if !block.is_dirty() {
            self.pending.remove(&bo);
        }
        true
    }

    /// Write every pending override to `dest`, merge it into `committed`
    /// (preserving committed's earlier-recorded original for any byte both
    /// maps touch), and clear `pending`. On I/O failure, both maps are left
    /// untouched so the caller can retry.
    pub fn save(&mut self, dest: &mut dyn RandomAccessWrite) -> io::Result<()> {
        for block in self.pending.values() {
            block.save(dest, false)?;
        }
        for (offset, block) in self.pending.iter() {
            self.committed
                .entry(*offset)
                .and_modify(|c| c.merge_from(block))
                .or_insert_with(|| block.clone());
        }
        self.pending.clear();
        Ok(())
    }

    /// Write every committed block's original bytes back to `dest` and
    /// clear `committed`. Only legal while `pending` is empty.
    pub fn undo_save(&mut self, dest: &mut dyn RandomAccessWrite) -> io::Result<()> {
        assert!(!self.is_dirty(), "undo_save is only legal with no pending edits");
        for block in self.committed.values() {
            block.save(dest, true)?;
        }
        self.committed.clear();
        Ok(())
    }

    /// Step to the next (or previous) hex row, relative to `here`, that has
    /// any overridden byte in either map.
    pub fn next_edited_byte_row(&self, here: FileOffset, hex_width: u64, next: bool) -> Option<FileOffset> {
        let a = next_edited_row_in(&self.pending, here, hex_width, next);
        let b = next_edited_row_in(&self.committed, here, hex_width, next);
        match (a, b) {
            (Some(x), Some(y)) => Some(if next { x.min(y) } else { x.max(y) }),
            (Some(x), None) => Some(x),
            (None, Some(y)) => Some(y),
            (None, None) => None,
        }
    }
}

fn next_edited_row_in(
    map: &BTreeMap<FileOffset, PatchBlock>,
    here: FileOffset,
    hex_width: u64,
    next: bool,
) -> Option<FileOffset> {
    let here_row = here & !(hex_width - 1);
    if next {
        for (&block_off, block) in map.range(here..) {
            let row_of = block_off & !(hex_width - 1);
            if here_row < row_of {
                for index in 0..BLOCK_SIZE as usize {
                    if block.is_set(index) {
                        return Some(block_off + index as u64);
                    }
                }
            }
        }
        None
    } else {
        for (&block_off, block) in map.range(..=here).rev() {
            let row_of = block_off & !(hex_width - 1);
            if here_row > row_of {
                for index in (0..BLOCK_SIZE as usize).rev() {
                    if block.is_set(index) {
                        return Some(block_off + index as u64);
                    }
                }
            }
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct MemFile(Vec<u8>);
    impl RandomAccessWrite for MemFile {
        fn write_at(&mut self, offset: u64, bytes: &[u8]) -> io::Result<()> {
            let end = offset as usize + bytes.len();
            if end > self.0.len() {
                self.0.resize(end, 0);
            }
            self.0[offset as usize..end].copy_from_slice(bytes);
            Ok(())
        }
    }

    #[test]
    fn hex_edit_round_trip() {
        let mut store = PatchStore::new();
        let mut file = MemFile(vec![0u8; 16]);

        store.set_byte(0x5, 0xA, true, || 0x00);
        store.set_byte(0x5, 0xB, false, || 0x00);

        let (value, color) = store.is_byte_dirty(0x5).unwrap();
        assert_eq!(value, 0xBA);
        assert_eq!(color, ByteColor::Edited);
        assert!(store.is_dirty());

        store.save(&mut file).unwrap();
        assert!(!store.is_dirty());
        assert_eq!(file.0[5], 0xBA);

        let (value, color) = store.is_byte_dirty(0x5).unwrap();
        assert_eq!(value, 0xBA);
        assert_eq!(color, ByteColor::Saved);

        store.undo_save(&mut file).unwrap();
        assert_eq!(file.0[5], 0x00);
        assert!(store.is_byte_dirty(0x5).is_none());
    }

    #[test]
    fn revert_never_touches_committed() {
        let mut store = PatchStore::new();
        let mut file = MemFile(vec![0xFFu8; 16]);
        store.set_byte(2, 0x1, true, || 0xFF);
        store.save(&mut file).unwrap();
        assert!(!store.revert_byte(2)); // nothing pending left to revert
        assert!(store.is_byte_dirty(2).is_some());
    }

    #[test]
    fn revert_restores_disk_value_without_touching_disk() {
        let mut store = PatchStore::new();
        store.set_byte(0, 0x3, true, || 0x00);
        assert!(store.revert_byte(0));
        assert!(store.is_byte_dirty(0).is_none());
        assert!(!store.is_dirty());
    }

    #[test]
    fn next_edited_byte_row_walks_both_maps() {
        let mut store = PatchStore::new();
        store.set_byte(0, 0x1, false, || 0);
        store.set_byte(40, 0x2, false, || 0);
        let row = store.next_edited_byte_row(0, 16, true).unwrap();
        assert_eq!(row, 40);
        let row_back = store.next_edited_byte_row(40, 16, false).unwrap();
        assert_eq!(row_back, 0);
    }
}
