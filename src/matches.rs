/// Generate a byte predicate backed by a 256 entry lookup table.
macro_rules! byte_map {
    {
        $(#[$meta:meta])*
        $vis:vis const fn $fn_id:ident($byte:ident: u8) { $e:expr }
    } => {
        $(#[$meta])*
        $vis const fn $fn_id($byte: u8) -> bool {
            const PAT: [bool; 256] = {
                let mut bytes = [false; 256];
                let mut $byte = 0u8;
                const fn filter($byte: u8) -> bool {
                    $e
                }
                loop {
                    bytes[$byte as usize] = filter($byte);
                    if $byte == 255 {
                        break;
                    }
                    $byte += 1;
                }
                bytes
            };
            PAT[$byte as usize]
        }
    };
}

byte_map! {
    /// Returns `true` for `tchar`, the characters allowed in methods and header names.
    ///
    /// ```not_rust
    /// tchar = "!" / "#" / "$" / "%" / "&" / "'" / "*" / "+" / "-" / "." /
    ///         "^" / "_" / "`" / "|" / "~" / DIGIT / ALPHA
    /// ```
    #[inline(always)]
    pub(crate) const fn is_token(byte: u8) {
        byte.is_ascii_alphanumeric()
            || matches!(
                byte,
                b'!' | b'#' | b'$' | b'%' | b'&' | b'\'' | b'*' | b'+' | b'-' | b'.' | b'^' | b'_'
                    | b'`' | b'|' | b'~'
            )
    }
}

/// Optional whitespace, `SP` or `HTAB`.
#[inline(always)]
pub(crate) const fn is_ows(byte: u8) -> bool {
    matches!(byte, b' ' | b'\t')
}

/// Trim leading and trailing optional whitespace.
pub(crate) fn trim_ows(value: &str) -> &str {
    value.trim_matches([' ', '\t'])
}

#[cfg(test)]
mod test {
    use super::{is_token, trim_ows};

    #[test]
    fn test_is_token() {
        for byte in b"GETPOSTabc019!#$%&'*+-.^_`|~" {
            assert!(is_token(*byte), "{:?}", *byte as char);
        }
        for byte in b" \t\r\n:;,/?=\"()<>@[]{}\\\x00\x7f\xff" {
            assert!(!is_token(*byte), "{:?}", *byte as char);
        }
    }

    #[test]
    fn test_trim_ows() {
        assert_eq!(trim_ows(" \tvalue \t"), "value");
        assert_eq!(trim_ows("a b"), "a b");
        assert_eq!(trim_ows("   "), "");
    }
}
