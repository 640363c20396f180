//! Word-at-a-time byte search.
//!
//! A word is loaded little endian, so lane `n` holds byte `n` of the chunk. XOR with a
//! splatted needle zeroes matching lanes, and `(x - LSB) & !x & MSB` flags zero lanes.
//! Borrow propagation can only set false positives above a real zero lane, so the
//! lowest flagged lane is always a real match.

const BLOCK: usize = size_of::<usize>();
const MSB: usize = usize::from_ne_bytes([0b1000_0000; BLOCK]);
const LSB: usize = usize::from_ne_bytes([0b0000_0001; BLOCK]);

#[inline(always)]
const fn splat(byte: u8) -> usize {
    usize::from_ne_bytes([byte; BLOCK])
}

#[inline(always)]
const fn zero_lanes(word: usize) -> usize {
    word.wrapping_sub(LSB) & !word & MSB
}

/// Returns the index of the first byte equal to any of `needles`.
#[inline]
pub(crate) fn find<const N: usize>(haystack: &[u8], needles: [u8; N]) -> Option<usize> {
    let patterns = needles.map(splat);
    let mut state = haystack;
    let mut offset = 0;

    while let Some((chunk, rest)) = state.split_first_chunk::<BLOCK>() {
        let word = usize::from_le_bytes(*chunk);

        let mut found = 0;
        for pattern in patterns {
            found |= zero_lanes(word ^ pattern);
        }

        if found != 0 {
            return Some(offset + (found.trailing_zeros() / 8) as usize);
        }

        offset += BLOCK;
        state = rest;
    }

    state
        .iter()
        .position(|byte| needles.contains(byte))
        .map(|at| offset + at)
}

#[cfg(test)]
mod test {
    use super::find;

    #[test]
    fn test_find() {
        assert_eq!(find(b"", [b' ']), None);
        assert_eq!(find(b"GET", [b' ']), None);
        assert_eq!(find(b"GET /", [b' ']), Some(3));
        assert_eq!(find(b"/index.html?q=1 HTTP/1.1", [b' ', b'?']), Some(11));
        assert_eq!(find(b"abcdefghijklmnop\r\n", [b'\r']), Some(16));
        assert_eq!(find(b"abcdefghijklmno\n", [b'\r', b'\n', b':']), Some(15));

        // a zero lane below a match must not produce a false positive
        assert_eq!(find(b"\x00\x01bcdefg:", [b':']), Some(8));
        assert_eq!(find(b"\x01\x01\x01\x01\x01\x01\x01\x00", [b'\x01']), Some(0));
        assert_eq!(find(b"\x02\x02\x02\x01\x02\x02\x02\x02", [b'\x01']), Some(3));

        // every position across word boundaries
        let mut haystack = [b'a'; 40];
        for at in 0..haystack.len() {
            haystack[at] = b'\r';
            assert_eq!(find(&haystack, [b'\r']), Some(at));
            assert_eq!(find(&haystack, [b'\n', b'\r']), Some(at));
            haystack[at] = b'a';
        }
    }
}
