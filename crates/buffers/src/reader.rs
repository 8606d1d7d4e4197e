//! Bounds-checked binary reader with cursor tracking.

use std::borrow::Cow;

use byteorder::{BigEndian, ByteOrder, LittleEndian};

use crate::BufferError;

/// A binary reader over a borrowed byte slice.
///
/// The reader keeps a cursor into the slice and an endianness flag that
/// applies to every multi-byte read. Slices handed out by [`Reader::try_buf`]
/// and zero-copy [`Reader::bytes`] borrow from the source for `'a`, so the
/// source cannot be freed or mutated while any of them is alive.
///
/// # Example
///
/// ```
/// use jce_buffers::Reader;
///
/// let data = [0x01, 0x02, 0x03];
/// let mut reader = Reader::new(&data);
///
/// assert_eq!(reader.try_u8(), Ok(0x01));
/// assert_eq!(reader.try_i16(), Ok(0x0203));
/// assert!(reader.is_eof());
/// ```
#[derive(Debug, Clone)]
pub struct Reader<'a> {
    uint8: &'a [u8],
    x: usize,
    little_endian: bool,
}

impl<'a> Reader<'a> {
    /// Creates a big-endian reader for the given byte slice.
    pub fn new(uint8: &'a [u8]) -> Self {
        Self::with_endianness(uint8, false)
    }

    /// Creates a reader with an explicit byte order.
    pub fn with_endianness(uint8: &'a [u8], little_endian: bool) -> Self {
        Self {
            uint8,
            x: 0,
            little_endian,
        }
    }

    /// Whether multi-byte values are read as little-endian.
    pub fn is_little_endian(&self) -> bool {
        self.little_endian
    }

    /// Current cursor position.
    #[inline]
    pub fn position(&self) -> usize {
        self.x
    }

    /// Total length of the underlying buffer.
    #[inline]
    pub fn len(&self) -> usize {
        self.uint8.len()
    }

    /// Returns `true` if the underlying buffer is empty.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.uint8.is_empty()
    }

    /// Number of bytes left after the cursor.
    #[inline]
    pub fn remaining(&self) -> usize {
        self.uint8.len() - self.x
    }

    /// Returns `true` once every byte has been consumed.
    #[inline]
    pub fn is_eof(&self) -> bool {
        self.x >= self.uint8.len()
    }

    #[inline]
    fn check(&self, n: usize) -> Result<(), BufferError> {
        if n > self.remaining() {
            Err(BufferError::EndOfBuffer {
                offset: self.x,
                needed: n,
                available: self.remaining(),
            })
        } else {
            Ok(())
        }
    }

    #[inline]
    fn take(&mut self, n: usize) -> Result<&'a [u8], BufferError> {
        self.check(n)?;
        let start = self.x;
        self.x += n;
        Ok(&self.uint8[start..self.x])
    }

    fn length(&self, length: i64) -> Result<usize, BufferError> {
        usize::try_from(length).map_err(|_| BufferError::NegativeLength {
            offset: self.x,
            length,
        })
    }

    /// Peeks at the current byte without advancing.
    #[inline]
    pub fn try_peek(&self) -> Result<u8, BufferError> {
        self.check(1)?;
        Ok(self.uint8[self.x])
    }

    /// Reads an unsigned 8-bit integer.
    #[inline]
    pub fn try_u8(&mut self) -> Result<u8, BufferError> {
        Ok(self.take(1)?[0])
    }

    /// Reads a signed 8-bit integer.
    #[inline]
    pub fn try_i8(&mut self) -> Result<i8, BufferError> {
        Ok(self.take(1)?[0] as i8)
    }

    /// Reads a signed 16-bit integer in the reader's byte order.
    #[inline]
    pub fn try_i16(&mut self) -> Result<i16, BufferError> {
        let le = self.little_endian;
        let b = self.take(2)?;
        Ok(if le {
            LittleEndian::read_i16(b)
        } else {
            BigEndian::read_i16(b)
        })
    }

    /// Reads a signed 32-bit integer in the reader's byte order.
    #[inline]
    pub fn try_i32(&mut self) -> Result<i32, BufferError> {
        let le = self.little_endian;
        let b = self.take(4)?;
        Ok(if le {
            LittleEndian::read_i32(b)
        } else {
            BigEndian::read_i32(b)
        })
    }

    /// Reads a signed 64-bit integer in the reader's byte order.
    #[inline]
    pub fn try_i64(&mut self) -> Result<i64, BufferError> {
        let le = self.little_endian;
        let b = self.take(8)?;
        Ok(if le {
            LittleEndian::read_i64(b)
        } else {
            BigEndian::read_i64(b)
        })
    }

    /// Reads a 32-bit float.
    ///
    /// In little-endian mode the bytes are decoded directly. In big-endian
    /// mode [`recover_f32`] may pick the byte-swapped interpretation when the
    /// big-endian one is implausible.
    #[inline]
    pub fn try_f32(&mut self) -> Result<f32, BufferError> {
        let le = self.little_endian;
        let b = self.take(4)?;
        Ok(if le {
            LittleEndian::read_f32(b)
        } else {
            recover_f32([b[0], b[1], b[2], b[3]])
        })
    }

    /// Reads a 64-bit float. See [`Reader::try_f32`] and [`recover_f64`].
    #[inline]
    pub fn try_f64(&mut self) -> Result<f64, BufferError> {
        let le = self.little_endian;
        let b = self.take(8)?;
        Ok(if le {
            LittleEndian::read_f64(b)
        } else {
            let mut raw = [0u8; 8];
            raw.copy_from_slice(b);
            recover_f64(raw)
        })
    }

    /// Reads `size` raw bytes as a borrowed slice.
    pub fn try_buf(&mut self, size: usize) -> Result<&'a [u8], BufferError> {
        self.take(size)
    }

    /// Reads `length` raw bytes.
    ///
    /// With `zero_copy` the result borrows from the source buffer, otherwise
    /// it is an owned copy.
    pub fn bytes(&mut self, length: i64, zero_copy: bool) -> Result<Cow<'a, [u8]>, BufferError> {
        let n = self.length(length)?;
        let slice = self.take(n)?;
        Ok(if zero_copy {
            Cow::Borrowed(slice)
        } else {
            Cow::Owned(slice.to_vec())
        })
    }

    /// Advances the cursor by `length` bytes.
    pub fn skip(&mut self, length: i64) -> Result<(), BufferError> {
        let n = self.length(length)?;
        self.take(n).map(|_| ())
    }
}

/// Picks between the big- and little-endian readings of a 32-bit float.
///
/// Some producers write floats in the wrong byte order. The little-endian
/// reading wins when the big-endian one is not finite, or when it is huge
/// (above 1e9) while the little-endian one is modest (at most 1e6).
pub fn recover_f32(bytes: [u8; 4]) -> f32 {
    let primary = f32::from_be_bytes(bytes);
    let alt = f32::from_le_bytes(bytes);
    if !alt.is_finite() {
        return primary;
    }
    if !primary.is_finite() || (primary.abs() > 1e9 && alt.abs() <= 1e6) {
        return alt;
    }
    primary
}

/// Picks between the big- and little-endian readings of a 64-bit float.
///
/// Same rule as [`recover_f32`] with thresholds 1e18 / 1e12, plus a
/// vanishingly small big-endian value (below 1e-30) yielding to a
/// little-endian value of at most 1e6.
pub fn recover_f64(bytes: [u8; 8]) -> f64 {
    let primary = f64::from_be_bytes(bytes);
    let alt = f64::from_le_bytes(bytes);
    if !alt.is_finite() {
        return primary;
    }
    if !primary.is_finite()
        || (primary.abs() > 1e18 && alt.abs() <= 1e12)
        || (primary.abs() < 1e-30 && alt.abs() <= 1e6)
    {
        return alt;
    }
    primary
}
