use std::borrow::Cow;

use crate::pool::{BlockChain, BufferPool};

fn filled(block_size: usize, data: &[u8]) -> BlockChain {
    let mut chain = BlockChain::new(BufferPool::with_block_size(block_size, 16));
    chain.write(data).unwrap();
    chain
}

#[test]
fn test_take_peek() {
    let chain = filled(2, b"abc");
    let mut cursor = chain.cursor();

    assert_eq!(cursor.peek(), Some(b'a'));
    assert_eq!(cursor.take(), Some(b'a'));
    assert_eq!(cursor.take(), Some(b'b'));
    assert_eq!(cursor.peek(), Some(b'c'));
    assert_eq!(cursor.take(), Some(b'c'));
    assert_eq!(cursor.take(), None);
    assert!(cursor.is_end());
}

#[test]
fn test_empty_chain() {
    let chain = BlockChain::new(BufferPool::with_block_size(8, 1));
    let mut cursor = chain.cursor();

    assert_eq!(cursor.take(), None);
    assert_eq!(cursor.seek(b'a'), None);
    assert_eq!(cursor.length_to(&chain.cursor()), 0);
    assert_eq!(cursor.get_array_segment(&chain.cursor()).len(), 0);
}

#[test]
fn test_seek() {
    macro_rules! test {
        ($size:literal, $input:literal, $needle:literal => $offset:expr) => {
            let data = filled($size, $input);
            let begin = data.cursor();
            let mut scan = begin;
            assert_eq!(scan.seek($needle), $offset.map(|_| $needle));
            assert_eq!(begin.length_to(&scan), $offset.unwrap_or($input.len()));
        };
    }

    test!(64, b"GET / HTTP/1.1", b' ' => Some(3));
    test!(2, b"GET / HTTP/1.1", b' ' => Some(3));
    test!(3, b"GET / HTTP/1.1", b' ' => Some(3));
    test!(1, b"GET / HTTP/1.1", b'\r' => None::<usize>);
    test!(5, b"0123456789012345678\r", b'\r' => Some(19));
    test!(7, b"", b'x' => None::<usize>);
}

#[test]
fn test_seek_multi() {
    let chain = filled(4, b"/search?q=rust HTTP/1.1\r\n");
    let begin = chain.cursor();

    let mut scan = begin;
    assert_eq!(scan.seek2(b' ', b'?'), Some(b'?'));
    assert_eq!(begin.length_to(&scan), 7);

    let mut scan = begin;
    assert_eq!(scan.seek3(b'\r', b'=', b' '), Some(b'='));
    assert_eq!(begin.length_to(&scan), 9);

    let mut scan = begin;
    assert_eq!(scan.seek2(b'#', b'!'), None);
    assert!(scan.is_end());
    assert_eq!(begin.length_to(&scan), 25);
}

#[test]
fn test_seek_does_not_move_copies() {
    let chain = filled(4, b"key: value");
    let begin = chain.cursor();
    let mut scan = begin;
    scan.seek(b':');
    assert_eq!(begin.peek(), Some(b'k'));
    assert_eq!(scan.peek(), Some(b':'));
}

#[test]
fn test_array_segment() {
    let chain = filled(4, b"hello world");
    let begin = chain.cursor();

    let mut end = begin;
    end.advance(3);
    let segment = begin.get_array_segment(&end);
    assert!(matches!(segment, Cow::Borrowed(_)));
    assert_eq!(&*segment, b"hel");

    let mut end = begin;
    assert_eq!(end.advance(9), 9);
    let segment = begin.get_array_segment(&end);
    assert!(matches!(segment, Cow::Owned(_)));
    assert_eq!(&*segment, b"hello wor");

    let mut end = begin;
    assert_eq!(end.advance(100), 11);
    assert_eq!(&*begin.get_array_segment(&end), b"hello world");
}

#[test]
fn test_after_consume() {
    let mut chain = filled(4, b"hello world");
    chain.consume(6);
    let begin = chain.cursor();
    let mut end = begin;
    end.seek(b'l');
    assert_eq!(&*begin.get_array_segment(&end), b"wor");
    assert_eq!(begin.length_to(&end), 3);
}

#[test]
fn test_get_string() {
    let chain = filled(64, b"caf\xC3\xA9!");
    let begin = chain.cursor();
    let mut end = begin;
    end.seek(b'!');
    assert_eq!(begin.get_string(&end), "café");

    // sequence split across a block boundary
    let chain = filled(4, b"caf\xC3\xA9 \xE2\x82\xAC!");
    let begin = chain.cursor();
    let mut end = begin;
    end.seek(b'!');
    assert_eq!(begin.get_string(&end), "café €");

    // invalid bytes are replaced
    let chain = filled(2, b"a\xFFb\xC3");
    let begin = chain.cursor();
    let mut end = begin;
    end.advance(4);
    assert_eq!(begin.get_string(&end), "a\u{FFFD}b\u{FFFD}");
}

#[test]
fn test_copy_to() {
    let chain = filled(3, b"abcdefgh");
    let mut cursor = chain.cursor();

    let mut buf = [0u8; 5];
    assert_eq!(cursor.copy_to(&mut buf), 5);
    assert_eq!(&buf, b"abcde");
    assert_eq!(cursor.copy_to(&mut buf), 3);
    assert_eq!(&buf[..3], b"fgh");
    assert_eq!(cursor.copy_to(&mut buf), 0);
}

#[test]
fn test_take_matches_segment() {
    let data = b"GET /index.html HTTP/1.1\r\n";

    for block_size in [1, 2, 3, 64] {
        let chain = filled(block_size, data);
        let origin = chain.cursor();

        for a in 0..=data.len() {
            for b in a..=data.len() {
                let mut begin = origin;
                assert_eq!(begin.advance(a), a);
                let mut end = origin;
                assert_eq!(end.advance(b), b);

                let len = begin.length_to(&end);
                assert_eq!(len, b - a, "block {block_size}, {a}..{b}");

                let mut scan = begin;
                let taken: Vec<u8> = (0..len).map_while(|_| scan.take()).collect();
                assert_eq!(taken, &data[a..b], "block {block_size}, {a}..{b}");
                assert_eq!(&*begin.get_array_segment(&end), &data[a..b], "block {block_size}, {a}..{b}");
            }
        }
    }
}

#[test]
fn test_write_read_back() {
    macro_rules! test {
        ($block_size:literal, $len:expr) => {
            let data: Vec<u8> = (0..$len).map(|i: usize| i as u8).collect();
            let chain = filled($block_size, &data);
            assert_eq!(chain.len(), data.len());

            let mut cursor = chain.cursor();
            let mut out = vec![0u8; data.len() + 1];
            assert_eq!(cursor.copy_to(&mut out), data.len());
            assert_eq!(&out[..data.len()], &data[..]);
            assert!(cursor.is_end());
        };
    }

    test!(8, 0);
    test!(8, 1);
    test!(8, 8);
    test!(8, 8 * 5 + 3);
    test!(1, 17);
}
