use bytes::BytesMut;
use std::ptr::NonNull;
use std::sync::Arc;

/// Backing allocation shared by the blocks carved out of it.
#[derive(Debug)]
pub(crate) struct Slab {
    pub(crate) id: usize,
    /// `true` for oversized one-block allocations, which are never pooled.
    pub(crate) standalone: bool,
}

/// Owned, mutable window into a slab.
///
/// Written bytes live in `[0, end)` of the underlying buffer, the unconsumed part is
/// `[start, end)`. The buffer capacity never changes after the block is carved, so
/// `0 <= start <= end <= capacity` always holds.
pub struct Block {
    buf: BytesMut,
    start: usize,
    slab: Arc<Slab>,
    pinned: bool,
}

impl Block {
    pub(crate) fn new(buf: BytesMut, slab: Arc<Slab>) -> Self {
        debug_assert!(buf.is_empty());
        Self {
            buf,
            start: 0,
            slab,
            pinned: false,
        }
    }

    /// Index of the first unconsumed byte.
    #[inline]
    pub fn start(&self) -> usize {
        self.start
    }

    /// Index one past the last written byte.
    #[inline]
    pub fn end(&self) -> usize {
        self.buf.len()
    }

    #[inline]
    pub fn capacity(&self) -> usize {
        self.buf.capacity()
    }

    /// Returns the number of unconsumed bytes.
    #[inline]
    pub fn len(&self) -> usize {
        self.end() - self.start
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns the number of bytes that can still be written.
    #[inline]
    pub fn spare(&self) -> usize {
        self.capacity() - self.end()
    }

    /// Returns the unconsumed bytes.
    #[inline]
    pub fn as_slice(&self) -> &[u8] {
        &self.buf[self.start..]
    }

    /// Returns every written byte, consumed or not; cursors index into this.
    #[inline]
    pub(crate) fn bytes(&self) -> &[u8] {
        &self.buf[..]
    }

    /// Copy as much of `data` as fits, returning the copied count.
    pub fn extend(&mut self, data: &[u8]) -> usize {
        let n = data.len().min(self.spare());
        self.buf.extend_from_slice(&data[..n]);
        n
    }

    /// Mark `n` bytes as consumed, clamped to the written bytes.
    pub fn advance(&mut self, n: usize) {
        self.start = self.end().min(self.start + n);
    }

    /// Underlying buffer, for reading straight into the spare capacity.
    ///
    /// Callers must not write past the spare capacity.
    pub(crate) fn buf_mut(&mut self) -> &mut BytesMut {
        &mut self.buf
    }

    /// Pin the writable tail for native IO.
    ///
    /// Returns the address of the first spare byte and the number of spare bytes, or
    /// `None` if the block is already pinned. The address stays valid until
    /// [`unpin`][Block::unpin].
    pub fn pin(&mut self) -> Option<(NonNull<u8>, usize)> {
        if self.pinned {
            return None;
        }
        let spare = self.spare();
        let ptr = NonNull::new(self.buf.spare_capacity_mut().as_mut_ptr().cast::<u8>())?;
        self.pinned = true;
        Some((ptr, spare))
    }

    /// Release the pin, committing `written` bytes.
    ///
    /// # Safety
    ///
    /// `written` bytes starting at the pinned address must be initialized, and
    /// `written` must not exceed the spare length returned by [`pin`][Block::pin].
    pub unsafe fn unpin(&mut self, written: usize) {
        debug_assert!(self.pinned, "unpin without pin");
        debug_assert!(written <= self.spare());
        self.pinned = false;
        let len = self.buf.len();
        // SAFETY: caller guarantee `written` bytes past `len` are initialized and within capacity
        unsafe { self.buf.set_len(len + written) };
    }

    #[inline]
    pub fn is_pinned(&self) -> bool {
        self.pinned
    }

    /// Reset bounds so the block can be reused.
    pub(crate) fn reset(&mut self) {
        self.buf.clear();
        self.start = 0;
        self.pinned = false;
    }

    pub(crate) fn slab(&self) -> &Arc<Slab> {
        &self.slab
    }
}

impl std::fmt::Debug for Block {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        f.debug_struct("Block")
            .field("slab", &self.slab.id)
            .field("start", &self.start)
            .field("end", &self.end())
            .field("capacity", &self.capacity())
            .finish()
    }
}
