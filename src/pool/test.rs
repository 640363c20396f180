use super::{BlockChain, BufferPool, PoolError};
use crate::config::Config;

#[test]
fn test_allocate_carves_slab() {
    let pool = BufferPool::with_block_size(16, 4);

    let block = pool.allocate().unwrap();
    assert_eq!(block.capacity(), 16);
    assert_eq!(block.start(), 0);
    assert_eq!(block.end(), 0);
    assert!(block.is_empty());

    let stats = pool.stats();
    assert_eq!(stats.slabs, 1);
    assert_eq!(stats.free_blocks, 3);

    pool.release(block);
    assert_eq!(pool.stats().free_blocks, 4);
}

#[test]
fn test_release_resets_block() {
    let pool = BufferPool::with_block_size(8, 1);

    let mut block = pool.allocate().unwrap();
    assert_eq!(block.extend(b"abcdefghij"), 8);
    block.advance(3);
    assert_eq!(block.as_slice(), b"defgh");
    pool.release(block);

    let block = pool.allocate().unwrap();
    assert_eq!(block.start(), 0);
    assert_eq!(block.end(), 0);
    assert_eq!(pool.stats().slabs, 1);
}

#[test]
fn test_exhausted() {
    let pool = BufferPool::new(&Config::default().with_block_size(8).with_slab_blocks(2).with_max_slabs(1));

    let a = pool.allocate().unwrap();
    let b = pool.allocate().unwrap();
    assert_eq!(pool.allocate().unwrap_err(), PoolError::Exhausted { slabs: 1 });

    pool.release(a);
    assert!(pool.allocate().is_ok());
    drop(b);
}

#[test]
fn test_allocate_sized() {
    let pool = BufferPool::with_block_size(8, 2);

    let small = pool.allocate_sized(4).unwrap();
    assert_eq!(small.capacity(), 8);

    let large = pool.allocate_sized(100).unwrap();
    assert!(large.capacity() >= 100);
    assert_eq!(pool.stats().slabs, 1);

    pool.release(large);
    pool.release(small);
    assert_eq!(pool.stats().free_blocks, 2);
}

#[test]
fn test_trim() {
    let pool = BufferPool::with_block_size(8, 2);

    let a = pool.allocate().unwrap();
    assert_eq!(pool.trim(), 0, "slab still has a block out");

    pool.release(a);
    assert_eq!(pool.trim(), 1);
    assert_eq!(pool.stats().slabs, 0);
    assert_eq!(pool.stats().free_blocks, 0);
}

#[test]
fn test_pin() {
    let pool = BufferPool::with_block_size(8, 1);
    let mut block = pool.allocate().unwrap();
    block.extend(b"ab");

    let (ptr, spare) = block.pin().unwrap();
    assert_eq!(spare, 6);
    assert!(block.is_pinned());
    assert!(block.pin().is_none());

    unsafe {
        std::ptr::copy_nonoverlapping(b"cde".as_ptr(), ptr.as_ptr(), 3);
        block.unpin(3);
    }
    assert!(!block.is_pinned());
    assert_eq!(block.as_slice(), b"abcde");
}

#[test]
fn test_chain_write_spans_blocks() {
    let pool = BufferPool::with_block_size(4, 8);
    let mut chain = BlockChain::new(pool.clone());

    chain.write(b"hello world").unwrap();
    assert_eq!(chain.len(), 11);
    assert_eq!(chain.blocks().len(), 3);
    assert_eq!(chain.blocks()[0].as_slice(), b"hell");
    assert_eq!(chain.blocks()[1].as_slice(), b"o wo");
    assert_eq!(chain.blocks()[2].as_slice(), b"rld");

    chain.write(b"!").unwrap();
    assert_eq!(chain.blocks().len(), 3);
    assert_eq!(chain.blocks()[2].as_slice(), b"rld!");
}

#[test]
fn test_chain_consume() {
    let pool = BufferPool::with_block_size(4, 8);
    let mut chain = BlockChain::new(pool.clone());
    chain.write(b"hello world").unwrap();
    assert_eq!(pool.stats().free_blocks, 5);

    chain.consume(5);
    assert_eq!(chain.len(), 6);
    assert_eq!(chain.blocks().len(), 2);
    assert_eq!(chain.blocks()[0].as_slice(), b" wo");
    assert_eq!(pool.stats().free_blocks, 6);

    // everything consumed keeps a reset tail for the next write
    chain.consume(100);
    assert!(chain.is_empty());
    assert_eq!(chain.blocks().len(), 1);
    assert_eq!(chain.blocks()[0].end(), 0);
    assert_eq!(pool.stats().free_blocks, 7);

    drop(chain);
    assert_eq!(pool.stats().free_blocks, 8);
}

#[test]
fn test_concurrent_allocate_release() {
    use std::collections::HashSet;
    use std::sync::Mutex;

    const WORKERS: u8 = 8;
    const ROUNDS: usize = 200;
    const HELD: usize = 3;

    let pool = BufferPool::with_block_size(64, 8);
    let live = Mutex::new(HashSet::new());

    std::thread::scope(|scope| {
        for id in 0..WORKERS {
            let pool = pool.clone();
            let live = &live;
            scope.spawn(move || {
                let tag = [id; 64];
                for _ in 0..ROUNDS {
                    let mut held = Vec::with_capacity(HELD);
                    for _ in 0..HELD {
                        let mut block = pool.allocate().unwrap();
                        assert!(block.is_empty());
                        let addr = block.bytes().as_ptr() as usize;
                        assert!(live.lock().unwrap().insert(addr), "block handed out twice");
                        assert_eq!(block.extend(&tag), 64);
                        held.push((addr, block));
                    }
                    for (addr, block) in held {
                        assert!(block.as_slice().iter().all(|&byte| byte == id));
                        assert!(live.lock().unwrap().remove(&addr));
                        pool.release(block);
                    }
                }
            });
        }
    });

    assert!(live.lock().unwrap().is_empty());
    let stats = pool.stats();
    assert!(stats.slabs >= 1);
    assert_eq!(stats.free_blocks, stats.slabs * 8);
}
