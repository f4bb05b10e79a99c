//! Growable byte buffer with separate head/data/tail/end regions, used for
//! both the ingress (socket -> parser) and egress (encoder -> socket) paths.
//!
//! `head..data` is reclaimed headroom, `data..tail` is the readable region,
//! `tail..end` is free space available for writing. Reclaiming headroom
//! (rather than shifting bytes down on every read) keeps `pull` O(1); the
//! buffer only compacts when it has fully drained, or shrinks back toward a
//! configured persistent size once it has grown past it and drained below it.

use byteorder::{BigEndian, ByteOrder};
use std::io;

const INITIAL_CAPACITY: usize = 4096;

pub struct Buffer {
    storage: Vec<u8>,
    head: usize,
    data: usize,
    tail: usize,
    persistent_size: Option<usize>,
}

impl Buffer {
    pub fn new() -> Buffer {
        Buffer::with_capacity(INITIAL_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> Buffer {
        Buffer {
            storage: vec![0u8; capacity],
            head: 0,
            data: 0,
            tail: 0,
            persistent_size: None,
        }
    }

    /// Once the buffer has grown past `size` and later drains below it, it is
    /// shrunk back down to `size` instead of retaining the high-water mark.
    pub fn set_persistent_size(&mut self, size: usize) {
        self.persistent_size = Some(size);
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.tail - self.data
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.tail == self.data
    }

    #[inline]
    fn end(&self) -> usize {
        self.storage.len()
    }

    #[inline]
    pub fn free_capacity(&self) -> usize {
        self.end() - self.tail
    }

    /// The readable region, `data..tail`.
    #[inline]
    pub fn readable(&self) -> &[u8] {
        &self.storage[self.data..self.tail]
    }

    pub fn clear(&mut self) {
        self.head = 0;
        self.data = 0;
        self.tail = 0;
        self.check_persistent_size();
    }

    /// Reserve `len` writable bytes at the tail, growing the backing storage
    /// (and reclaiming head space) as needed, and returns a mutable view of
    /// that region.
    pub fn put(&mut self, len: usize) -> &mut [u8] {
        if self.is_empty() {
            self.head = 0;
            self.data = 0;
            self.tail = 0;
        }

        if self.free_capacity() < len {
            self.grow(len);
        }

        let start = self.tail;
        self.tail += len;
        &mut self.storage[start..self.tail]
    }

    pub fn put_data(&mut self, bytes: &[u8]) {
        self.put(bytes.len()).copy_from_slice(bytes);
    }

    pub fn put_u8(&mut self, v: u8) {
        self.put(1)[0] = v;
    }

    pub fn put_u16(&mut self, v: u16) {
        BigEndian::write_u16(self.put(2), v);
    }

    pub fn put_u32(&mut self, v: u32) {
        BigEndian::write_u32(self.put(4), v);
    }

    pub fn put_u64(&mut self, v: u64) {
        BigEndian::write_u64(self.put(8), v);
    }

    /// Remove and return a big-endian integer from the front of the readable
    /// region, or `None` if fewer bytes than its width are available (the
    /// buffer is left untouched in that case).
    pub fn pull_u8(&mut self) -> Option<u8> {
        if self.len() < 1 {
            return None;
        }
        let mut b = [0u8; 1];
        self.pull(1, Some(&mut b));
        Some(b[0])
    }

    pub fn pull_u16(&mut self) -> Option<u16> {
        if self.len() < 2 {
            return None;
        }
        let mut b = [0u8; 2];
        self.pull(2, Some(&mut b));
        Some(BigEndian::read_u16(&b))
    }

    pub fn pull_u32(&mut self) -> Option<u32> {
        if self.len() < 4 {
            return None;
        }
        let mut b = [0u8; 4];
        self.pull(4, Some(&mut b));
        Some(BigEndian::read_u32(&b))
    }

    pub fn pull_u64(&mut self) -> Option<u64> {
        if self.len() < 8 {
            return None;
        }
        let mut b = [0u8; 8];
        self.pull(8, Some(&mut b));
        Some(BigEndian::read_u64(&b))
    }

    /// Peek a big-endian integer at `offset` into the readable region without
    /// consuming it.
    pub fn get_u8(&self, offset: usize) -> Option<u8> {
        self.readable().get(offset).copied()
    }

    pub fn get_u16(&self, offset: usize) -> Option<u16> {
        let r = self.readable();
        if offset + 2 > r.len() {
            return None;
        }
        Some(BigEndian::read_u16(&r[offset..offset + 2]))
    }

    pub fn get_u32(&self, offset: usize) -> Option<u32> {
        let r = self.readable();
        if offset + 4 > r.len() {
            return None;
        }
        Some(BigEndian::read_u32(&r[offset..offset + 4]))
    }

    pub fn get_u64(&self, offset: usize) -> Option<u64> {
        let r = self.readable();
        if offset + 8 > r.len() {
            return None;
        }
        Some(BigEndian::read_u64(&r[offset..offset + 8]))
    }

    /// Advance `data` by up to `len` bytes, optionally copying the consumed
    /// bytes into `dest`. Returns the number of bytes actually removed.
    pub fn pull(&mut self, len: usize, dest: Option<&mut [u8]>) -> usize {
        let n = len.min(self.len());

        if let Some(dest) = dest {
            dest[..n].copy_from_slice(&self.storage[self.data..self.data + n]);
        }

        self.data += n;

        if self.is_empty() {
            self.head = self.data;
        }

        self.check_persistent_size();
        n
    }

    /// Drop `len` bytes from the front without copying them anywhere.
    pub fn skip(&mut self, len: usize) {
        self.pull(len, None);
    }

    fn check_persistent_size(&mut self) {
        let persistent = match self.persistent_size {
            Some(p) => p,
            None => return,
        };

        if self.storage.len() > persistent && self.len() < persistent {
            let mut shrunk = vec![0u8; persistent];
            let n = self.len();
            shrunk[..n].copy_from_slice(self.readable());
            self.storage = shrunk;
            self.head = 0;
            self.data = 0;
            self.tail = n;
        }
    }

    fn grow(&mut self, additional: usize) {
        // Reclaim headroom first: shift the readable region down to offset 0.
        if self.head > 0 || self.data > 0 {
            let n = self.len();
            self.storage.copy_within(self.data..self.tail, 0);
            self.head = 0;
            self.data = 0;
            self.tail = n;
        }

        let required = self.tail + additional;
        if self.storage.len() < required {
            let mut new_cap = self.storage.len().max(INITIAL_CAPACITY);
            while new_cap < required {
                new_cap *= 2;
            }
            self.storage.resize(new_cap, 0);
        }
    }

    /// Append bytes read from `reader` into the buffer. Returns the number of
    /// bytes appended. A zero-byte read is treated as orderly EOF and is not
    /// an error; `WouldBlock` propagates to the caller unchanged so it can be
    /// told apart from a genuine I/O failure.
    pub fn ingress<R: io::Read>(&mut self, reader: &mut R) -> io::Result<usize> {
        let chunk = 16384;
        self.grow(chunk);
        let slice = &mut self.storage[self.tail..self.tail + chunk];

        match reader.read(slice) {
            Ok(0) => Ok(0),
            Ok(n) => {
                self.tail += n;
                Ok(n)
            }
            Err(e) => Err(e),
        }
    }

    /// Write as much of the readable region as `writer` accepts in one call.
    /// Returns the number of bytes drained. `WouldBlock` propagates unchanged.
    pub fn egress<W: io::Write>(&mut self, writer: &mut W) -> io::Result<usize> {
        if self.is_empty() {
            return Ok(0);
        }

        let n = writer.write(self.readable())?;
        self.pull(n, None);
        Ok(n)
    }
}

impl Default for Buffer {
    fn default() -> Self {
        Buffer::new()
    }
}
