//! Typed field access over fixed-layout headers.
//!
//! Fixed-offset formats describe each header field once as a [`Field`]
//! constant and read it through a [`ByteView`]. Out-of-range reads return
//! `None` instead of panicking, so a truncated header degrades into
//! "field missing" rather than a crash.

/// A named byte range inside a fixed-layout header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Field {
    /// Name used in error messages.
    pub name: &'static str,
    /// Zero-based byte offset.
    pub offset: usize,
    /// Width in bytes.
    pub len: usize,
}

impl Field {
    /// Declare a field.
    pub const fn new(name: &'static str, offset: usize, len: usize) -> Self {
        Self { name, offset, len }
    }

    /// First byte past the field.
    pub const fn end(&self) -> usize {
        self.offset + self.len
    }
}

/// Read-only view over a byte buffer with typed accessors.
#[derive(Debug, Clone, Copy)]
pub struct ByteView<'a> {
    data: &'a [u8],
}

impl<'a> ByteView<'a> {
    /// Wrap a buffer.
    pub fn new(data: &'a [u8]) -> Self {
        Self { data }
    }

    /// Buffer length.
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Whether the buffer is empty.
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Raw bytes of a field.
    pub fn bytes(&self, field: Field) -> Option<&'a [u8]> {
        self.data.get(field.offset..field.end())
    }

    /// Raw bytes at an arbitrary range.
    pub fn slice(&self, offset: usize, len: usize) -> Option<&'a [u8]> {
        self.data.get(offset..offset.checked_add(len)?)
    }

    /// Whether the field holds exactly `expected`.
    pub fn matches(&self, field: Field, expected: &[u8]) -> bool {
        self.bytes(field) == Some(expected)
    }

    /// Field decoded as ASCII text with surrounding whitespace and NULs removed.
    pub fn text(&self, field: Field) -> Option<&'a str> {
        let bytes = self.bytes(field)?;
        let text = std::str::from_utf8(bytes).ok()?;
        Some(text.trim_matches(|c: char| c.is_whitespace() || c == '\0'))
    }

    /// Field parsed as a decimal integer.
    pub fn int(&self, field: Field) -> Option<i64> {
        self.text(field)?.parse().ok()
    }

    /// Field parsed as a real number, accepting Fortran `D` exponents.
    pub fn real(&self, field: Field) -> Option<f64> {
        parse_real(self.text(field)?)
    }

    /// Byte at `offset`.
    pub fn u8_at(&self, offset: usize) -> Option<u8> {
        self.data.get(offset).copied()
    }

    /// Little-endian u16 at `offset`.
    pub fn u16_le(&self, offset: usize) -> Option<u16> {
        self.array::<2>(offset).map(u16::from_le_bytes)
    }

    /// Little-endian u32 at `offset`.
    pub fn u32_le(&self, offset: usize) -> Option<u32> {
        self.array::<4>(offset).map(u32::from_le_bytes)
    }

    /// Little-endian i32 at `offset`.
    pub fn i32_le(&self, offset: usize) -> Option<i32> {
        self.array::<4>(offset).map(i32::from_le_bytes)
    }

    /// Little-endian u64 at `offset`.
    pub fn u64_le(&self, offset: usize) -> Option<u64> {
        self.array::<8>(offset).map(u64::from_le_bytes)
    }

    /// Little-endian f64 at `offset`.
    pub fn f64_le(&self, offset: usize) -> Option<f64> {
        self.array::<8>(offset).map(f64::from_le_bytes)
    }

    /// Big-endian i16 at `offset`.
    pub fn i16_be(&self, offset: usize) -> Option<i16> {
        self.array::<2>(offset).map(i16::from_be_bytes)
    }

    /// Big-endian sign-magnitude 16-bit value at `offset`: the top bit
    /// negates the remaining 15-bit magnitude.
    pub fn sign_magnitude_be(&self, offset: usize) -> Option<i16> {
        self.array::<2>(offset).map(decode_sign_magnitude)
    }

    fn array<const N: usize>(&self, offset: usize) -> Option<[u8; N]> {
        self.slice(offset, N)?.try_into().ok()
    }
}

/// Decode a big-endian sign-magnitude pair of bytes.
pub fn decode_sign_magnitude(bytes: [u8; 2]) -> i16 {
    let magnitude = (((bytes[0] & 0x7F) as i16) << 8) | bytes[1] as i16;
    if bytes[0] & 0x80 != 0 {
        -magnitude
    } else {
        magnitude
    }
}

/// Parse a real number, accepting Fortran `D`/`d` exponent markers.
///
/// Rejects NaN and infinities so callers only ever see finite values.
pub fn parse_real(token: &str) -> Option<f64> {
    let token = token.trim();
    if token.is_empty() {
        return None;
    }

    let value: f64 = if token.contains(['D', 'd']) {
        token.replace(['D', 'd'], "E").parse().ok()?
    } else {
        token.parse().ok()?
    };

    value.is_finite().then_some(value)
}

/// Narrow a parsed value to an `f32` elevation, `None` when it overflows.
pub fn elevation(value: f64) -> Option<f32> {
    let narrowed = value as f32;
    narrowed.is_finite().then_some(narrowed)
}

/// Iterate every finite numeric token in a text buffer, split on whitespace.
pub fn numeric_tokens(text: &str) -> impl Iterator<Item = f64> + '_ {
    text.split_whitespace().filter_map(parse_real)
}
