#![forbid(unsafe_code)]

//! CSI framing shared by the legacy and extended decoders.

/// DoS protection: maximum CSI sequence length.
pub(crate) const MAX_CSI_LEN: usize = 256;

/// Result of scanning a buffer that starts with `ESC [`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum CsiScan<'a> {
    /// A complete sequence of `len` bytes.
    Complete {
        params: &'a [u8],
        intermediates: &'a [u8],
        final_byte: u8,
        len: usize,
    },
    /// More bytes are needed.
    Incomplete,
    /// Broken framing; the first `len` bytes should be discarded.
    Malformed { len: usize },
}

/// Walk the CSI-collecting state: parameter bytes (`0x30..=0x3F`), then
/// intermediate bytes (`0x20..=0x2F`), then one final byte (`0x40..=0x7E`).
pub(crate) fn scan_csi(bytes: &[u8]) -> CsiScan<'_> {
    debug_assert!(bytes.starts_with(b"\x1b["));
    let mut i = 2;
    let mut params_end = None;
    while i < bytes.len() {
        if i >= MAX_CSI_LEN {
            return CsiScan::Malformed { len: i };
        }
        let b = bytes[i];
        match b {
            0x30..=0x3F if params_end.is_none() => {}
            0x20..=0x2F => {
                params_end.get_or_insert(i);
            }
            0x40..=0x7E => {
                let params_end = params_end.unwrap_or(i);
                return CsiScan::Complete {
                    params: &bytes[2..params_end],
                    intermediates: &bytes[params_end..i],
                    final_byte: b,
                    len: i + 1,
                };
            }
            _ => return CsiScan::Malformed { len: i },
        }
        i += 1;
    }
    CsiScan::Incomplete
}

/// Parsed numeric CSI parameters: `;`-separated fields, each with
/// `:`-separated sub-parameters. Empty positions are `None`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub(crate) struct Params {
    fields: Vec<Vec<Option<u32>>>,
}

impl Params {
    /// Parse a parameter string made only of digits, `;` and `:`.
    ///
    /// Returns `None` for any other byte or a number that overflows `u32`.
    pub(crate) fn parse(raw: &[u8]) -> Option<Self> {
        if raw.is_empty() {
            return Some(Self::default());
        }
        let s = std::str::from_utf8(raw).ok()?;
        let mut fields = Vec::new();
        for field in s.split(';') {
            let mut subs = Vec::new();
            for sub in field.split(':') {
                if sub.is_empty() {
                    subs.push(None);
                } else if sub.bytes().all(|b| b.is_ascii_digit()) {
                    subs.push(Some(sub.parse().ok()?));
                } else {
                    return None;
                }
            }
            fields.push(subs);
        }
        Some(Self { fields })
    }

    /// Value at `field`/`sub`, if present and non-empty.
    pub(crate) fn get(&self, field: usize, sub: usize) -> Option<u32> {
        self.fields.get(field)?.get(sub).copied().flatten()
    }

    /// Number of `;`-separated fields.
    pub(crate) fn len(&self) -> usize {
        self.fields.len()
    }

    /// Sub-parameters of one field, empties included.
    #[cfg(test)]
    pub(crate) fn field(&self, field: usize) -> &[Option<u32>] {
        self.fields.get(field).map(Vec::as_slice).unwrap_or(&[])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scan_complete_sequence() {
        let scan = scan_csi(b"\x1b[1;5Arest");
        assert_eq!(
            scan,
            CsiScan::Complete {
                params: b"1;5",
                intermediates: b"",
                final_byte: b'A',
                len: 6,
            }
        );
    }

    #[test]
    fn scan_with_private_marker_and_intermediate() {
        match scan_csi(b"\x1b[?1 q") {
            CsiScan::Complete {
                params,
                intermediates,
                final_byte,
                len,
            } => {
                assert_eq!(params, b"?1");
                assert_eq!(intermediates, b" ");
                assert_eq!(final_byte, b'q');
                assert_eq!(len, 6);
            }
            other => panic!("unexpected scan: {other:?}"),
        }
    }

    #[test]
    fn scan_incomplete_and_malformed() {
        assert_eq!(scan_csi(b"\x1b["), CsiScan::Incomplete);
        assert_eq!(scan_csi(b"\x1b[12;"), CsiScan::Incomplete);
        // Control byte inside the sequence breaks the framing.
        assert_eq!(scan_csi(b"\x1b[12\x07A"), CsiScan::Malformed { len: 4 });
        // Parameter byte after an intermediate.
        assert_eq!(scan_csi(b"\x1b[ 1A"), CsiScan::Malformed { len: 3 });
    }

    #[test]
    fn scan_enforces_length_limit() {
        let mut seq = b"\x1b[".to_vec();
        seq.extend(std::iter::repeat_n(b'1', 400));
        seq.push(b'A');
        assert_eq!(scan_csi(&seq), CsiScan::Malformed { len: MAX_CSI_LEN });
    }

    #[test]
    fn params_fields_and_subparams() {
        let p = Params::parse(b"97:65;6:3").expect("valid");
        assert_eq!(p.len(), 2);
        assert_eq!(p.get(0, 0), Some(97));
        assert_eq!(p.get(0, 1), Some(65));
        assert_eq!(p.get(1, 0), Some(6));
        assert_eq!(p.get(1, 1), Some(3));
        assert_eq!(p.get(2, 0), None);
    }

    #[test]
    fn params_empty_positions() {
        let p = Params::parse(b"97::66;;").expect("valid");
        assert_eq!(p.field(0), &[Some(97), None, Some(66)]);
        assert_eq!(p.get(1, 0), None);
        assert_eq!(p.len(), 3);
        assert_eq!(Params::parse(b"").expect("empty").len(), 0);
    }

    #[test]
    fn params_reject_garbage() {
        assert!(Params::parse(b"1;x").is_none());
        assert!(Params::parse(b"?1").is_none());
        assert!(Params::parse(b"99999999999").is_none());
    }
}
