//! Byte-stream primitives of the module-file encoding.
//!
//! Little-endian fixed widths, `u32` length prefixes, length-prefixed
//! UTF-8 strings, one-byte tags and presence flags. The [`Read`] and
//! [`Write`] traits keep the encoder and decoder symmetric and testable on
//! plain byte slices.

/// Why a stream failed to decode. Everything except `SchemaMismatch` and
/// `UnresolvedExternal` means the stream is malformed.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DecodeError {
    #[error("unexpected end of stream")]
    Eof,
    #[error("bad magic number")]
    BadMagic,
    #[error("unsupported schema version {found} (this reader implements {supported})")]
    SchemaMismatch { found: u16, supported: u16 },
    #[error("invalid utf-8 in string")]
    InvalidUtf8,
    #[error("bad {what} tag {tag}")]
    BadTag { what: &'static str, tag: u8 },
    #[error("ordinal {ordinal} does not name an encoded {what}")]
    BadOrdinal { what: &'static str, ordinal: u32 },
    #[error("malformed stream: {0}")]
    Corrupt(&'static str),
    #[error("{0} trailing bytes after the encoded unit")]
    TrailingBytes(usize),
    #[error("external symbol `{name}` via module `{module}` did not re-resolve")]
    UnresolvedExternal { module: String, name: String },
}

impl From<std::str::Utf8Error> for DecodeError {
    fn from(_: std::str::Utf8Error) -> Self {
        Self::InvalidUtf8
    }
}

pub type Result<T, E = DecodeError> = std::result::Result<T, E>;

pub trait Read {
    fn read_slice(&mut self, n: u32) -> Result<&[u8]>;

    /// Bytes left in the stream; the framing layer uses this to reject
    /// trailing data.
    fn remaining(&self) -> usize;

    fn read_array<const N: usize>(&mut self) -> Result<&[u8; N]> {
        self.read_slice(N as u32).map(|s| {
            s.try_into()
                .unwrap_or_else(|_| unreachable!("read_slice returned a wrong length"))
        })
    }

    fn read_str(&mut self, len: u32) -> Result<&str> {
        Ok(std::str::from_utf8(self.read_slice(len)?)?)
    }

    fn read_u8(&mut self) -> Result<u8> {
        Ok(u8::from_le_bytes(*self.read_array()?))
    }

    fn read_u16(&mut self) -> Result<u16> {
        Ok(u16::from_le_bytes(*self.read_array()?))
    }

    fn read_u32(&mut self) -> Result<u32> {
        Ok(u32::from_le_bytes(*self.read_array()?))
    }

    fn read_u64(&mut self) -> Result<u64> {
        Ok(u64::from_le_bytes(*self.read_array()?))
    }

    fn read_i64(&mut self) -> Result<i64> {
        Ok(i64::from_le_bytes(*self.read_array()?))
    }

    fn read_f64(&mut self) -> Result<f64> {
        Ok(f64::from_bits(self.read_u64()?))
    }

    fn read_bool(&mut self) -> Result<bool> {
        match self.read_u8()? {
            0 => Ok(false),
            1 => Ok(true),
            tag => Err(DecodeError::BadTag { what: "bool", tag }),
        }
    }

    /// Length-prefixed UTF-8 string.
    fn read_string(&mut self) -> Result<String> {
        let len = self.read_u32()?;
        Ok(self.read_str(len)?.to_owned())
    }
}

impl Read for &[u8] {
    fn read_slice(&mut self, n: u32) -> Result<&[u8]> {
        let data = self.get(..n as usize).ok_or(DecodeError::Eof)?;
        *self = &self[n as usize..];
        Ok(data)
    }

    fn remaining(&self) -> usize {
        self.len()
    }
}

pub trait Write {
    fn write_slice(&mut self, slice: &[u8]);

    fn write_u8(&mut self, v: u8) {
        self.write_slice(&v.to_le_bytes());
    }

    fn write_u16(&mut self, v: u16) {
        self.write_slice(&v.to_le_bytes());
    }

    fn write_u32(&mut self, v: u32) {
        self.write_slice(&v.to_le_bytes());
    }

    fn write_u64(&mut self, v: u64) {
        self.write_slice(&v.to_le_bytes());
    }

    fn write_i64(&mut self, v: i64) {
        self.write_slice(&v.to_le_bytes());
    }

    fn write_f64(&mut self, v: f64) {
        self.write_u64(v.to_bits());
    }

    fn write_bool(&mut self, v: bool) {
        self.write_u8(u8::from(v));
    }

    fn write_len(&mut self, len: usize) {
        let Ok(len) = u32::try_from(len) else {
            panic!("sequence too long to serialize")
        };
        self.write_u32(len);
    }

    fn write_str(&mut self, s: &str) {
        self.write_len(s.len());
        self.write_slice(s.as_bytes());
    }
}

impl Write for Vec<u8> {
    fn write_slice(&mut self, slice: &[u8]) {
        self.extend_from_slice(slice);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_scalars() {
        let mut buf = Vec::new();
        buf.write_u16(0xBEEF);
        buf.write_u32(7);
        buf.write_i64(-42);
        buf.write_f64(1.5);
        buf.write_bool(true);
        buf.write_str("hello");

        let mut rdr: &[u8] = &buf;
        assert_eq!(rdr.read_u16().unwrap(), 0xBEEF);
        assert_eq!(rdr.read_u32().unwrap(), 7);
        assert_eq!(rdr.read_i64().unwrap(), -42);
        assert_eq!(rdr.read_f64().unwrap(), 1.5);
        assert!(rdr.read_bool().unwrap());
        assert_eq!(rdr.read_string().unwrap(), "hello");
        assert_eq!(rdr.remaining(), 0);
    }

    #[test]
    fn short_reads_are_eof() {
        let mut rdr: &[u8] = &[1, 2];
        assert_eq!(rdr.read_u32().unwrap_err(), DecodeError::Eof);
    }

    #[test]
    fn bad_bool_tag_is_rejected() {
        let mut rdr: &[u8] = &[7];
        assert!(matches!(
            rdr.read_bool().unwrap_err(),
            DecodeError::BadTag { what: "bool", .. }
        ));
    }
}
