use super::{Block, BufferPool, PoolError};
use crate::cursor::Cursor;

/// Ordered sequence of blocks forming one logical byte stream.
///
/// Blocks are appended at the tail as data is written and returned to the pool once
/// fully consumed from the head. Dropping the chain returns every block.
pub struct BlockChain {
    pool: BufferPool,
    blocks: Vec<Block>,
    len: usize,
}

impl BlockChain {
    pub fn new(pool: BufferPool) -> Self {
        Self {
            pool,
            blocks: Vec::new(),
            len: 0,
        }
    }

    #[inline]
    pub fn pool(&self) -> &BufferPool {
        &self.pool
    }

    /// Returns the number of unconsumed bytes across all blocks.
    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    #[inline]
    pub fn blocks(&self) -> &[Block] {
        &self.blocks
    }

    /// Returns a cursor at the first unconsumed byte.
    #[inline]
    pub fn cursor(&self) -> Cursor<'_> {
        Cursor::new(&self.blocks)
    }

    /// Append `data`, allocating blocks from the pool as needed.
    pub fn write(&mut self, mut data: &[u8]) -> Result<(), PoolError> {
        while !data.is_empty() {
            let written = self.writable_tail()?.extend(data);
            self.len += written;
            data = &data[written..];
        }
        Ok(())
    }

    /// Returns the tail block, appending a fresh one if the current tail is full.
    pub(crate) fn writable_tail(&mut self) -> Result<&mut Block, PoolError> {
        if self.blocks.last().is_none_or(|tail| tail.spare() == 0) {
            let block = self.pool.allocate()?;
            self.blocks.push(block);
        }
        let tail = self.blocks.len() - 1;
        Ok(&mut self.blocks[tail])
    }

    /// Account for `n` bytes written directly into the tail block.
    pub(crate) fn commit(&mut self, n: usize) {
        self.len += n;
    }

    /// Consume `n` bytes from the head, returning emptied blocks to the pool.
    ///
    /// When everything is consumed the tail block is kept, reset, for the next write.
    pub fn consume(&mut self, n: usize) {
        let mut n = n.min(self.len);
        self.len -= n;

        let mut emptied = 0;
        for block in &mut self.blocks {
            let step = n.min(block.len());
            block.advance(step);
            n -= step;
            if !block.is_empty() {
                break;
            }
            emptied += 1;
        }

        if emptied == self.blocks.len() {
            let Some(tail) = self.blocks.last_mut() else {
                return;
            };
            tail.reset();
            emptied -= 1;
        }

        for block in self.blocks.drain(..emptied) {
            self.pool.release(block);
        }
    }

    /// Return every block to the pool.
    pub fn clear(&mut self) {
        self.len = 0;
        for block in self.blocks.drain(..) {
            self.pool.release(block);
        }
    }
}

impl Drop for BlockChain {
    fn drop(&mut self) {
        self.clear();
    }
}

impl std::fmt::Debug for BlockChain {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        f.debug_struct("BlockChain")
            .field("len", &self.len)
            .field("blocks", &self.blocks.len())
            .finish()
    }
}
