use bytes::BytesMut;
use std::{cmp, ops::Range};

use crate::encoding::Serializer;

/// Default page size of writer buffers.
pub const DEFAULT_PAGE_SIZE: usize = 512;

/// An append-only byte buffer made of fixed-size pages.
///
/// Appends never move bytes already written, so offsets handed out earlier stay valid
/// until [`PagedBuffer::clear`]. Writers accumulate values here before the lengths of their
/// enclosing containers are known.
#[derive(Debug)]
pub struct PagedBuffer {
    pages: Vec<BytesMut>,
    page_size: usize,
    len: usize,
}

impl PagedBuffer {
    /// # Arguments
    ///
    /// * `page_size: usize` - Bytes per page, at least 1.
    pub fn new(page_size: usize) -> Self {
        PagedBuffer {
            pages: Vec::new(),
            page_size: cmp::max(page_size, 1),
            len: 0,
        }
    }

    pub fn len(&self) -> usize { self.len }

    pub fn is_empty(&self) -> bool { self.len == 0 }

    pub fn page_size(&self) -> usize { self.page_size }

    /// Appends `bytes`, spilling into new pages as needed.
    pub fn extend_from_slice(&mut self, mut bytes: &[u8]) {
        while !bytes.is_empty() {
            let page_size = self.page_size;
            let full = self.pages.last().map_or(true, |p| p.len() == page_size);
            if full {
                self.pages.push(BytesMut::with_capacity(page_size));
            }
            if let Some(page) = self.pages.last_mut() {
                let n = cmp::min(page_size - page.len(), bytes.len());
                page.extend_from_slice(&bytes[..n]);
                self.len += n;
                bytes = &bytes[n..];
            }
        }
    }

    /// The contiguous slices making up `range`, in order.
    pub fn slices(&self, range: Range<usize>) -> Slices<'_> {
        debug_assert!(range.end <= self.len);
        Slices {
            buf: self,
            pos: range.start,
            end: cmp::min(range.end, self.len),
        }
    }

    /// Copies `range` into a new vector.
    pub fn to_vec(&self, range: Range<usize>) -> Vec<u8> {
        let mut out = Vec::with_capacity(range.len());
        for s in self.slices(range) {
            out.extend_from_slice(s);
        }
        out
    }

    /// Drops all content. The first page is kept for reuse.
    pub fn clear(&mut self) {
        self.pages.truncate(1);
        if let Some(page) = self.pages.first_mut() {
            page.clear();
        }
        self.len = 0;
    }
}

impl Default for PagedBuffer {
    fn default() -> Self { PagedBuffer::new(DEFAULT_PAGE_SIZE) }
}

impl Serializer for PagedBuffer {
    fn put_u8(&mut self, u: u8) { self.extend_from_slice(&[u]) }

    fn put_slice(&mut self, slice: &[u8]) { self.extend_from_slice(slice) }
}

/// Iterator over the page slices of a byte range.
#[derive(Debug)]
pub struct Slices<'a> {
    buf: &'a PagedBuffer,
    pos: usize,
    end: usize,
}

impl<'a> Iterator for Slices<'a> {
    type Item = &'a [u8];

    fn next(&mut self) -> Option<&'a [u8]> {
        if self.pos >= self.end {
            return None;
        }
        let buf = self.buf;
        let page = &buf.pages[self.pos / buf.page_size];
        let start = self.pos % buf.page_size;
        let stop = cmp::min(page.len(), start + (self.end - self.pos));
        self.pos += stop - start;
        Some(&page[start..stop])
    }
}
