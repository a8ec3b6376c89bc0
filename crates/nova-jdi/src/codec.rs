use crate::error::{JdiError, Result};

/// Append-only big-endian encoder for command payloads.
#[derive(Debug, Default)]
pub struct JdwpWriter {
    buf: Vec<u8>,
}

impl JdwpWriter {
    pub fn new() -> Self {
        Self { buf: Vec::new() }
    }

    pub fn into_vec(self) -> Vec<u8> {
        self.buf
    }

    pub fn len(&self) -> usize {
        self.buf.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    pub fn write_u8(&mut self, v: u8) {
        self.buf.push(v);
    }

    pub fn write_bool(&mut self, v: bool) {
        self.buf.push(if v { 1 } else { 0 });
    }

    pub fn write_u16(&mut self, v: u16) {
        self.buf.extend_from_slice(&v.to_be_bytes());
    }

    pub fn write_i16(&mut self, v: i16) {
        self.buf.extend_from_slice(&v.to_be_bytes());
    }

    pub fn write_u32(&mut self, v: u32) {
        self.buf.extend_from_slice(&v.to_be_bytes());
    }

    pub fn write_i32(&mut self, v: i32) {
        self.buf.extend_from_slice(&v.to_be_bytes());
    }

    pub fn write_u64(&mut self, v: u64) {
        self.buf.extend_from_slice(&v.to_be_bytes());
    }

    pub fn write_i64(&mut self, v: i64) {
        self.buf.extend_from_slice(&v.to_be_bytes());
    }

    pub fn write_f32(&mut self, v: f32) {
        self.buf.extend_from_slice(&v.to_be_bytes());
    }

    pub fn write_f64(&mut self, v: f64) {
        self.buf.extend_from_slice(&v.to_be_bytes());
    }

    pub fn write_string(&mut self, s: &str) {
        // JDWP strings are length-prefixed with a u32 number of bytes.
        self.write_u32(s.len() as u32);
        self.buf.extend_from_slice(s.as_bytes());
    }

    pub fn write_bytes(&mut self, bytes: &[u8]) {
        self.buf.extend_from_slice(bytes);
    }

    /// Writes the low `size` bytes of `id`, big-endian.
    ///
    /// # Panics
    ///
    /// If `size` is outside `1..=8`. Connection widths are validated when a
    /// `VirtualMachine` attaches.
    pub fn write_id(&mut self, id: u64, size: usize) {
        assert!((1..=8).contains(&size), "invalid id size: {size}");
        let be = id.to_be_bytes();
        self.buf.extend_from_slice(&be[8 - size..]);
    }
}

/// Cursor over a reply payload.
///
/// Every read is bounds-checked; running off the end is a protocol error for
/// the current reply.
pub struct JdwpReader<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> JdwpReader<'a> {
    pub fn new(buf: &'a [u8]) -> Self {
        Self { buf, pos: 0 }
    }

    fn take(&mut self, n: usize) -> Result<&'a [u8]> {
        let end = self
            .pos
            .checked_add(n)
            .filter(|end| *end <= self.buf.len())
            .ok_or_else(|| {
                JdiError::Protocol(format!(
                    "buffer underflow: need {n} bytes at {}, have {}",
                    self.pos,
                    self.buf.len()
                ))
            })?;
        let bytes = &self.buf[self.pos..end];
        self.pos = end;
        Ok(bytes)
    }

    fn take_array<const N: usize>(&mut self) -> Result<[u8; N]> {
        let mut out = [0u8; N];
        out.copy_from_slice(self.take(N)?);
        Ok(out)
    }

    pub fn position(&self) -> usize {
        self.pos
    }

    pub fn remaining(&self) -> usize {
        self.buf.len().saturating_sub(self.pos)
    }

    pub fn read_u8(&mut self) -> Result<u8> {
        Ok(self.take_array::<1>()?[0])
    }

    pub fn read_bool(&mut self) -> Result<bool> {
        Ok(self.read_u8()? != 0)
    }

    pub fn read_u16(&mut self) -> Result<u16> {
        Ok(u16::from_be_bytes(self.take_array()?))
    }

    pub fn read_i16(&mut self) -> Result<i16> {
        Ok(i16::from_be_bytes(self.take_array()?))
    }

    pub fn read_u32(&mut self) -> Result<u32> {
        Ok(u32::from_be_bytes(self.take_array()?))
    }

    pub fn read_i32(&mut self) -> Result<i32> {
        Ok(i32::from_be_bytes(self.take_array()?))
    }

    pub fn read_u64(&mut self) -> Result<u64> {
        Ok(u64::from_be_bytes(self.take_array()?))
    }

    pub fn read_i64(&mut self) -> Result<i64> {
        Ok(i64::from_be_bytes(self.take_array()?))
    }

    pub fn read_f32(&mut self) -> Result<f32> {
        Ok(f32::from_bits(self.read_u32()?))
    }

    pub fn read_f64(&mut self) -> Result<f64> {
        Ok(f64::from_bits(self.read_u64()?))
    }

    /// Reads a JDWP `int` element count.
    ///
    /// Negative counts are rejected rather than reinterpreted as huge lengths.
    pub fn read_count(&mut self) -> Result<usize> {
        let count = self.read_i32()?;
        usize::try_from(count)
            .map_err(|_| JdiError::Protocol(format!("negative element count: {count}")))
    }

    pub fn read_string(&mut self) -> Result<String> {
        let len = self.read_u32()? as usize;
        let bytes = self.take(len)?;
        let mut out = Vec::new();
        out.try_reserve_exact(len).map_err(|_| {
            JdiError::Protocol(format!("unable to allocate string buffer ({len} bytes)"))
        })?;
        out.extend_from_slice(bytes);
        String::from_utf8(out)
            .map_err(|e| JdiError::Protocol(format!("invalid utf-8 string: {e}")))
    }

    pub fn read_bytes(&mut self, len: usize) -> Result<&'a [u8]> {
        self.take(len)
    }

    pub fn read_id(&mut self, size: usize) -> Result<u64> {
        if size == 0 || size > 8 {
            return Err(JdiError::Protocol(format!("invalid id size: {size}")));
        }
        let mut be = [0u8; 8];
        be[8 - size..].copy_from_slice(self.take(size)?);
        Ok(u64::from_be_bytes(be))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reads_big_endian_primitives() {
        let bytes = [0x00, 0x01, 0xff, 0xff, 0xff, 0xfe, 0x3f, 0x80, 0x00, 0x00];
        let mut r = JdwpReader::new(&bytes);
        assert_eq!(r.read_u16().unwrap(), 1);
        assert_eq!(r.read_i32().unwrap(), -2);
        assert_eq!(r.read_f32().unwrap(), 1.0);
        assert_eq!(r.remaining(), 0);
    }

    #[test]
    fn underflow_is_a_protocol_error() {
        let mut r = JdwpReader::new(&[0, 0]);
        let err = r.read_u32().unwrap_err();
        match err {
            JdiError::Protocol(msg) => {
                assert_eq!(msg, "buffer underflow: need 4 bytes at 0, have 2")
            }
            other => panic!("expected protocol error, got {other:?}"),
        }
        // A failed read does not advance the cursor.
        assert_eq!(r.position(), 0);
    }

    #[test]
    fn rejects_invalid_id_width() {
        let mut r = JdwpReader::new(&[0; 16]);
        assert!(matches!(r.read_id(0), Err(JdiError::Protocol(_))));
        assert!(matches!(r.read_id(9), Err(JdiError::Protocol(_))));
    }

    #[test]
    fn rejects_negative_count() {
        let bytes = (-1i32).to_be_bytes();
        let mut r = JdwpReader::new(&bytes);
        assert!(matches!(r.read_count(), Err(JdiError::Protocol(_))));
    }

    #[test]
    fn writes_narrow_ids() {
        let mut w = JdwpWriter::new();
        w.write_id(0x0102_0304, 4);
        w.write_id(0x05, 2);
        assert_eq!(w.into_vec(), vec![1, 2, 3, 4, 0, 5]);
    }

    #[test]
    #[should_panic(expected = "invalid id size: 9")]
    fn write_id_refuses_oversized_width() {
        JdwpWriter::new().write_id(1, 9);
    }

    #[test]
    #[should_panic(expected = "invalid id size: 0")]
    fn write_id_refuses_zero_width() {
        JdwpWriter::new().write_id(1, 0);
    }

    #[test]
    fn strings_are_length_prefixed() {
        let mut w = JdwpWriter::new();
        w.write_string("main");
        let bytes = w.into_vec();
        assert_eq!(&bytes[..4], &4u32.to_be_bytes());

        let mut r = JdwpReader::new(&bytes);
        assert_eq!(r.read_string().unwrap(), "main");
    }
}
