//! Length-delimited framing over a byte stream
//!
//! Each frame is a base-128 varint holding the payload length (low 7-bit
//! group first, high bit set on every byte but the last) followed by the
//! payload itself. This is the same delimiting protobuf uses for streamed
//! messages, so the simulation side can use its stock writer.
//!
//! Reading treats a zero-byte read anywhere inside a frame as the peer
//! closing the connection ([`Error::TruncatedStream`]), never as a
//! transient empty read.

use crate::{Error, Result};
use std::io::{self, BufReader, Read, Write};

/// Widest varint a `u64` length can take
pub const MAX_VARINT_LEN: usize = 10;

/// Append the varint encoding of `value` to `buf`
pub fn encode_varint(mut value: u64, buf: &mut Vec<u8>) {
    while value >= 0x80 {
        buf.push((value as u8 & 0x7F) | 0x80);
        value >>= 7;
    }
    buf.push(value as u8);
}

/// Encode a payload as one frame
pub fn encode_frame(payload: &[u8]) -> Vec<u8> {
    let mut frame = Vec::with_capacity(payload.len() + MAX_VARINT_LEN);
    encode_varint(payload.len() as u64, &mut frame);
    frame.extend_from_slice(payload);
    frame
}

/// Write one frame and flush
pub fn write_frame<W: Write>(writer: &mut W, payload: &[u8]) -> io::Result<()> {
    let mut prefix = Vec::with_capacity(MAX_VARINT_LEN);
    encode_varint(payload.len() as u64, &mut prefix);
    writer.write_all(&prefix)?;
    writer.write_all(payload)?;
    writer.flush()
}

/// Read a varint length prefix one byte at a time
pub fn read_varint<R: Read>(reader: &mut R) -> Result<u64> {
    let mut value = 0u64;
    let mut byte = [0u8; 1];

    for i in 0..MAX_VARINT_LEN {
        loop {
            match reader.read(&mut byte) {
                Ok(0) => return Err(Error::TruncatedStream("length prefix")),
                Ok(_) => break,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e.into()),
            }
        }

        let group = u64::from(byte[0] & 0x7F);
        // The tenth byte may only carry the single remaining bit
        if i == MAX_VARINT_LEN - 1 && group > 1 {
            return Err(Error::MalformedLength);
        }
        value |= group << (7 * i);

        if byte[0] & 0x80 == 0 {
            return Ok(value);
        }
    }

    Err(Error::MalformedLength)
}

/// Read one frame's payload
///
/// No upper bound is placed on the length; see [`read_frame_limited`].
pub fn read_frame<R: Read>(reader: &mut R) -> Result<Vec<u8>> {
    let len = read_varint(reader)?;
    read_payload(reader, len)
}

/// Read one frame's payload, rejecting lengths above `max`
pub fn read_frame_limited<R: Read>(reader: &mut R, max: usize) -> Result<Vec<u8>> {
    let len = read_varint(reader)?;
    if len > max as u64 {
        return Err(Error::FrameTooLarge { len, max });
    }
    read_payload(reader, len)
}

fn read_payload<R: Read>(reader: &mut R, len: u64) -> Result<Vec<u8>> {
    // Grow with the data actually received instead of trusting the prefix
    let mut payload = Vec::new();
    reader.by_ref().take(len).read_to_end(&mut payload)?;
    if (payload.len() as u64) < len {
        return Err(Error::TruncatedStream("payload"));
    }
    Ok(payload)
}

/// Buffered frame reader for the receiving half of a connection
#[derive(Debug)]
pub struct FrameReader<R: Read> {
    inner: BufReader<R>,
    max_frame_len: Option<usize>,
}

impl<R: Read> FrameReader<R> {
    /// Wrap a reader with no frame size limit
    pub fn new(reader: R) -> Self {
        Self {
            inner: BufReader::new(reader),
            max_frame_len: None,
        }
    }

    /// Set the largest frame accepted, `None` for unlimited
    pub fn with_max_frame_len(mut self, max_frame_len: Option<usize>) -> Self {
        self.max_frame_len = max_frame_len;
        self
    }

    /// Read the next frame's payload
    pub fn read_frame(&mut self) -> Result<Vec<u8>> {
        match self.max_frame_len {
            Some(max) => read_frame_limited(&mut self.inner, max),
            None => read_frame(&mut self.inner),
        }
    }

    /// Get the wrapped reader
    pub fn get_ref(&self) -> &R {
        self.inner.get_ref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn test_varint_encoding() {
        let cases: [(u64, &[u8]); 5] = [
            (0, &[0x00]),
            (1, &[0x01]),
            (127, &[0x7F]),
            (128, &[0x80, 0x01]),
            (300, &[0xAC, 0x02]),
        ];
        for (value, expected) in cases {
            let mut buf = Vec::new();
            encode_varint(value, &mut buf);
            assert_eq!(buf, expected, "encoding {}", value);
        }

        let mut buf = Vec::new();
        encode_varint(u64::MAX, &mut buf);
        assert_eq!(buf.len(), MAX_VARINT_LEN);
        assert_eq!(read_varint(&mut Cursor::new(buf)).unwrap(), u64::MAX);
    }

    #[test]
    fn test_roundtrip_at_varint_boundaries() {
        for len in [0usize, 1, 127, 128, 16_384, 2_097_151] {
            let payload: Vec<u8> = (0..len).map(|i| (i % 251) as u8).collect();
            let frame = encode_frame(&payload);

            let mut cursor = Cursor::new(frame);
            let recovered = read_frame(&mut cursor).unwrap();
            assert_eq!(recovered.len(), len);
            assert_eq!(recovered, payload);
            assert_eq!(cursor.position() as usize, cursor.get_ref().len());
        }
    }

    #[test]
    fn test_write_frame_matches_encode_frame() {
        let payload = vec![7u8; 200];
        let mut written = Vec::new();
        write_frame(&mut written, &payload).unwrap();
        assert_eq!(written, encode_frame(&payload));
    }

    #[test]
    fn test_multiple_frames_in_sequence() {
        let messages: Vec<&[u8]> = vec![b"spawn", b"", b"observation"];
        let mut buf = Vec::new();
        for msg in &messages {
            write_frame(&mut buf, msg).unwrap();
        }

        let mut reader = FrameReader::new(Cursor::new(buf));
        for expected in &messages {
            assert_eq!(reader.read_frame().unwrap(), *expected);
        }
        assert!(matches!(
            reader.read_frame(),
            Err(Error::TruncatedStream("length prefix"))
        ));
    }

    #[test]
    fn test_empty_stream_is_truncated() {
        let err = read_frame(&mut Cursor::new(Vec::new())).unwrap_err();
        assert!(matches!(err, Error::TruncatedStream("length prefix")));
        assert!(err.is_disconnect());
    }

    #[test]
    fn test_truncated_length_prefix() {
        // Continuation bit set, then the stream ends
        let err = read_frame(&mut Cursor::new(vec![0x80])).unwrap_err();
        assert!(matches!(err, Error::TruncatedStream("length prefix")));
    }

    #[test]
    fn test_truncated_payload() {
        let mut frame = encode_frame(b"hello tank");
        frame.truncate(frame.len() - 3);
        let err = read_frame(&mut Cursor::new(frame)).unwrap_err();
        assert!(matches!(err, Error::TruncatedStream("payload")));
    }

    #[test]
    fn test_overlong_length_prefix() {
        let err = read_frame(&mut Cursor::new(vec![0xFF; 11])).unwrap_err();
        assert!(matches!(err, Error::MalformedLength));
        assert!(!err.is_disconnect());
    }

    #[test]
    fn test_limit_rejects_large_frame() {
        let frame = encode_frame(&[0u8; 100]);
        let mut reader = FrameReader::new(Cursor::new(frame)).with_max_frame_len(Some(64));
        assert!(matches!(
            reader.read_frame(),
            Err(Error::FrameTooLarge { len: 100, max: 64 })
        ));
    }
}
