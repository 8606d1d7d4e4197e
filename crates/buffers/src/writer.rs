//! Growable output buffer for encoders.

use byteorder::{BigEndian, ByteOrder, LittleEndian};

/// Output buffer that encoders append to.
///
/// Bytes between the last [`Writer::flush`] and the cursor are pending.
/// [`Writer::reset`] drops them, which lets an encoder abandon a half-written
/// value. Multi-byte values follow the byte order picked at construction.
///
/// ```
/// use jce_buffers::Writer;
///
/// let mut writer = Writer::with_endianness(true);
/// writer.u8(0x01);
/// writer.i16(0x0203);
/// assert_eq!(writer.flush(), [0x01, 0x03, 0x02]);
/// ```
pub struct Writer {
    bytes: Vec<u8>,
    /// Start of the pending region.
    start: usize,
    /// End of the pending region.
    end: usize,
    chunk: usize,
    little_endian: bool,
}

impl Default for Writer {
    fn default() -> Self {
        Self::new()
    }
}

macro_rules! ordered {
    ($(#[$doc:meta])* $name:ident, $ty:ty, $width:expr, $write:ident) => {
        $(#[$doc])*
        #[inline]
        pub fn $name(&mut self, val: $ty) {
            let le = self.little_endian;
            let dst = self.slot($width);
            if le {
                LittleEndian::$write(dst, val)
            } else {
                BigEndian::$write(dst, val)
            }
        }
    };
}

impl Writer {
    /// Big-endian writer growing in 4 KiB chunks.
    pub fn new() -> Self {
        Self::with_alloc_size(4 * 1024)
    }

    /// Writer with the default chunk size and the given byte order.
    pub fn with_endianness(little_endian: bool) -> Self {
        Self {
            little_endian,
            ..Self::new()
        }
    }

    /// Big-endian writer growing in chunks of `alloc_size` (at least 16).
    pub fn with_alloc_size(alloc_size: usize) -> Self {
        let chunk = alloc_size.max(16);
        Self {
            bytes: vec![0; chunk],
            start: 0,
            end: 0,
            chunk,
            little_endian: false,
        }
    }

    pub fn is_little_endian(&self) -> bool {
        self.little_endian
    }

    /// Pending byte count.
    pub fn len(&self) -> usize {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.end == self.start
    }

    /// Makes room for `extra` more bytes.
    ///
    /// On growth only the pending region is carried over, so flushed bytes
    /// are never copied twice.
    pub fn ensure_capacity(&mut self, extra: usize) {
        if self.bytes.len() - self.end >= extra {
            return;
        }
        let needed = self.len() + extra;
        let size = if needed <= self.chunk { self.chunk } else { needed * 2 };
        let mut bytes = vec![0; size];
        bytes[..self.len()].copy_from_slice(&self.bytes[self.start..self.end]);
        self.end = self.len();
        self.start = 0;
        self.bytes = bytes;
    }

    /// Drops the pending bytes.
    pub fn reset(&mut self) {
        self.end = self.start;
    }

    /// Takes the pending bytes.
    pub fn flush(&mut self) -> Vec<u8> {
        let out = self.bytes[self.start..self.end].to_vec();
        self.start = self.end;
        out
    }

    #[inline]
    fn slot(&mut self, n: usize) -> &mut [u8] {
        self.ensure_capacity(n);
        let at = self.end;
        self.end += n;
        &mut self.bytes[at..at + n]
    }

    #[inline]
    pub fn u8(&mut self, val: u8) {
        self.slot(1)[0] = val;
    }

    #[inline]
    pub fn i8(&mut self, val: i8) {
        self.u8(val as u8);
    }

    ordered!(i16, i16, 2, write_i16);
    ordered!(u32, u32, 4, write_u32);
    ordered!(i32, i32, 4, write_i32);
    ordered!(i64, i64, 8, write_i64);
    ordered!(
        /// IEEE 754 single, in the writer's byte order.
        f32, f32, 4, write_f32
    );
    ordered!(
        /// IEEE 754 double, in the writer's byte order.
        f64, f64, 8, write_f64
    );

    /// Appends raw bytes.
    pub fn buf(&mut self, data: &[u8]) {
        self.slot(data.len()).copy_from_slice(data);
    }
}
