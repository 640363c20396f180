//! Slab backed buffer pool.
//!
//! Memory is allocated in slabs, each slab is split into fixed size [`Block`]s. Blocks
//! are handed out by [`BufferPool::allocate`] and returned with
//! [`BufferPool::release`], typically through a [`BlockChain`].
use bytes::BytesMut;
use fnv::FnvHashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use crate::config::Config;
use crate::log::debug;

mod block;
mod chain;

pub use block::Block;
pub use chain::BlockChain;
use block::Slab;

/// Allocation failure of the [`BufferPool`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PoolError {
    #[error("buffer pool exhausted, {slabs} slabs in use")]
    Exhausted { slabs: usize },
    #[error("allocation of {0} bytes is too large")]
    TooLarge(usize),
}

/// Snapshot of pool occupancy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PoolStats {
    /// Live pooled slabs.
    pub slabs: usize,
    /// Blocks currently sitting in the free list.
    pub free_blocks: usize,
    pub block_size: usize,
}

/// Shared, thread safe pool of fixed size blocks.
///
/// Cloning the pool is cheap and refers to the same free list.
#[derive(Clone)]
pub struct BufferPool {
    inner: Arc<Inner>,
}

struct Inner {
    block_size: usize,
    slab_blocks: usize,
    max_slabs: Option<usize>,
    free: Mutex<Vec<Block>>,
    slabs: AtomicUsize,
    next_slab: AtomicUsize,
}

impl BufferPool {
    /// Create pool from [`Config`].
    pub fn new(config: &Config) -> Self {
        Self::build(config.block_size, config.slab_blocks, config.max_slabs)
    }

    /// Create unbounded pool with given block size and blocks per slab.
    pub fn with_block_size(block_size: usize, slab_blocks: usize) -> Self {
        Self::build(block_size, slab_blocks, None)
    }

    fn build(block_size: usize, slab_blocks: usize, max_slabs: Option<usize>) -> Self {
        Self {
            inner: Arc::new(Inner {
                block_size: block_size.max(1),
                slab_blocks: slab_blocks.max(1),
                max_slabs,
                free: Mutex::new(Vec::new()),
                slabs: AtomicUsize::new(0),
                next_slab: AtomicUsize::new(0),
            }),
        }
    }

    #[inline]
    pub fn block_size(&self) -> usize {
        self.inner.block_size
    }

    /// Take a free block, allocating a new slab if none is available.
    ///
    /// The returned block is empty with `start == end == 0`.
    pub fn allocate(&self) -> Result<Block, PoolError> {
        if let Some(block) = self.lock().pop() {
            return Ok(block);
        }

        let mut blocks = self.allocate_slab()?;
        let block = blocks.pop().ok_or(PoolError::TooLarge(0))?;
        if !blocks.is_empty() {
            self.lock().append(&mut blocks);
        }
        Ok(block)
    }

    /// Allocate a block of at least `min` bytes.
    ///
    /// Requests that fit in [`block_size`][BufferPool::block_size] are served from the
    /// pool, larger ones get a standalone allocation which is freed on release.
    pub fn allocate_sized(&self, min: usize) -> Result<Block, PoolError> {
        if min <= self.block_size() {
            return self.allocate();
        }
        let slab = Arc::new(Slab {
            id: self.inner.next_slab.fetch_add(1, Ordering::Relaxed),
            standalone: true,
        });
        let mut buf = BytesMut::zeroed(min);
        buf.clear();
        debug!("standalone block allocated: {min} bytes");
        Ok(Block::new(buf, slab))
    }

    fn allocate_slab(&self) -> Result<Vec<Block>, PoolError> {
        let Inner {
            block_size,
            slab_blocks,
            max_slabs,
            ..
        } = *self.inner;

        let live = self.inner.slabs.fetch_add(1, Ordering::AcqRel);
        if max_slabs.is_some_and(|max| live >= max) {
            self.inner.slabs.fetch_sub(1, Ordering::AcqRel);
            return Err(PoolError::Exhausted { slabs: live });
        }

        let Some(len) = block_size.checked_mul(slab_blocks) else {
            self.inner.slabs.fetch_sub(1, Ordering::AcqRel);
            return Err(PoolError::TooLarge(usize::MAX));
        };

        let slab = Arc::new(Slab {
            id: self.inner.next_slab.fetch_add(1, Ordering::Relaxed),
            standalone: false,
        });
        let mut memory = BytesMut::zeroed(len);
        let mut blocks = Vec::with_capacity(slab_blocks);
        for _ in 0..slab_blocks {
            let mut buf = memory.split_to(block_size);
            buf.clear();
            blocks.push(Block::new(buf, Arc::clone(&slab)));
        }

        debug!("slab {} allocated: {slab_blocks} blocks of {block_size} bytes", slab.id);
        Ok(blocks)
    }

    /// Return a block to the free list.
    ///
    /// Standalone blocks are dropped instead.
    pub fn release(&self, mut block: Block) {
        if block.slab().standalone || block.capacity() != self.block_size() {
            return;
        }
        block.reset();
        self.lock().push(block);
    }

    /// Free every slab whose blocks are all back in the free list.
    ///
    /// Returns the number of slabs reclaimed.
    pub fn trim(&self) -> usize {
        let mut free = self.lock();

        // slab id -> (free blocks, live handles)
        let mut idle = FnvHashMap::<usize, (usize, usize)>::default();
        for block in free.iter() {
            let slab = block.slab();
            idle.entry(slab.id)
                .or_insert((0, Arc::strong_count(slab)))
                .0 += 1;
        }
        idle.retain(|_, (free, live)| free == live);

        if idle.is_empty() {
            return 0;
        }

        free.retain(|block| !idle.contains_key(&block.slab().id));
        self.inner.slabs.fetch_sub(idle.len(), Ordering::AcqRel);
        debug!("trimmed {} slabs", idle.len());
        idle.len()
    }

    pub fn stats(&self) -> PoolStats {
        PoolStats {
            slabs: self.inner.slabs.load(Ordering::Acquire),
            free_blocks: self.lock().len(),
            block_size: self.block_size(),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Vec<Block>> {
        // the free list holds no invariant a panicking thread could break
        match self.inner.free.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

impl std::fmt::Debug for BufferPool {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        f.debug_struct("BufferPool")
            .field("block_size", &self.inner.block_size)
            .field("slab_blocks", &self.inner.slab_blocks)
            .field("max_slabs", &self.inner.max_slabs)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod test;
