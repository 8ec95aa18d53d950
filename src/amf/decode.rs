// AMF0 decoding cursor

use byteorder::{BigEndian, ByteOrder};

use crate::amf::value::AmfValue;
use crate::error::{RtmpError, RtmpResult};

/// Tracks how much of a shared buffer has been consumed so that recursive
/// Object/ECMAArray decoding shares one consumption point instead of every
/// call site re-deriving it from slice lengths.
pub struct AmfCursor {
    pos: usize,
    len: usize,
}

impl AmfCursor {
    pub fn new(len: usize) -> AmfCursor {
        AmfCursor { pos: 0, len }
    }

    /// Consumes and returns the next `n` bytes of `buffer`.
    pub fn read<'a>(&mut self, buffer: &'a [u8], n: usize) -> RtmpResult<&'a [u8]> {
        let slice = self.look(buffer, n)?;
        self.pos += n;
        Ok(slice)
    }

    /// Returns the next `n` bytes of `buffer` without consuming them.
    pub fn look<'a>(&self, buffer: &'a [u8], n: usize) -> RtmpResult<&'a [u8]> {
        if self.pos + n > self.len || self.pos + n > buffer.len() {
            return Err(RtmpError::MalformedAmf("truncated input".to_string()));
        }
        Ok(&buffer[self.pos..self.pos + n])
    }

    pub fn skip(&mut self, n: usize) -> RtmpResult<()> {
        if self.pos + n > self.len {
            return Err(RtmpError::MalformedAmf("truncated input".to_string()));
        }
        self.pos += n;
        Ok(())
    }

    pub fn ended(&self) -> bool {
        self.pos >= self.len
    }

    pub fn position(&self) -> usize {
        self.pos
    }
}

/// Decodes a single AMF0 value starting at the front of `bytes`.
///
/// Returns the value and the number of bytes consumed.
pub fn read_value(bytes: &[u8]) -> RtmpResult<(AmfValue, usize)> {
    let mut cursor = AmfCursor::new(bytes.len());
    let value = read_value_at(&mut cursor, bytes)?;
    Ok((value, cursor.position()))
}

/// Decodes a sequence of AMF0 values until `bytes` is exhausted.
pub fn read_array(bytes: &[u8]) -> RtmpResult<Vec<AmfValue>> {
    let mut cursor = AmfCursor::new(bytes.len());
    let mut values = Vec::new();
    while !cursor.ended() {
        values.push(read_value_at(&mut cursor, bytes)?);
    }
    Ok(values)
}

fn read_value_at(cursor: &mut AmfCursor, buffer: &[u8]) -> RtmpResult<AmfValue> {
    let type_byte = cursor.read(buffer, 1)?[0];

    match type_byte {
        0x00 => {
            let bytes = cursor.read(buffer, 8)?;
            Ok(AmfValue::Number(BigEndian::read_f64(bytes)))
        }
        0x01 => {
            let byte = cursor.read(buffer, 1)?[0];
            Ok(AmfValue::Boolean(byte != 0))
        }
        0x02 => {
            let len = BigEndian::read_u16(cursor.read(buffer, 2)?) as usize;
            let bytes = cursor.read(buffer, len)?;
            Ok(AmfValue::String(String::from_utf8_lossy(bytes).into_owned()))
        }
        0x03 => Ok(AmfValue::Object(read_pairs(cursor, buffer)?)),
        0x05 => Ok(AmfValue::Null),
        0x08 => {
            let declared_count = BigEndian::read_u32(cursor.read(buffer, 4)?);
            let entries = read_pairs(cursor, buffer)?;
            Ok(AmfValue::EcmaArray {
                declared_count,
                entries,
            })
        }
        0x09 => Ok(AmfValue::ObjectEnd),
        other => Err(RtmpError::MalformedAmf(format!(
            "unknown type byte: {other:#04x}"
        ))),
    }
}

/// Reads (key, value) pairs until a pair's value decodes as `ObjectEnd`.
fn read_pairs(cursor: &mut AmfCursor, buffer: &[u8]) -> RtmpResult<Vec<(String, AmfValue)>> {
    let mut pairs = Vec::new();

    loop {
        let key_len = BigEndian::read_u16(cursor.read(buffer, 2)?) as usize;
        let key = String::from_utf8_lossy(cursor.read(buffer, key_len)?).into_owned();
        let value = read_value_at(cursor, buffer)?;

        if matches!(value, AmfValue::ObjectEnd) {
            break;
        }

        pairs.push((key, value));
    }

    Ok(pairs)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn truncated_string_is_malformed() {
        let bytes = [0x02, 0x00, 0x05, b'h', b'i'];
        assert!(matches!(read_value(&bytes), Err(RtmpError::MalformedAmf(_))));
    }

    #[test]
    fn unknown_type_byte_is_malformed() {
        let bytes = [0xff];
        assert!(matches!(read_value(&bytes), Err(RtmpError::MalformedAmf(_))));
    }

    #[test]
    fn ecma_array_count_mismatch_still_decodes() {
        // declared_count says 5 but only one pair is present before the terminator.
        let mut bytes = vec![0x08, 0x00, 0x00, 0x00, 0x05];
        bytes.extend_from_slice(&[0x00, 0x01, b'a']);
        bytes.extend_from_slice(&AmfValue::Number(1.0).encode());
        bytes.extend_from_slice(&[0, 0, 0x09]);

        let (value, consumed) = read_value(&bytes).unwrap();
        assert_eq!(consumed, bytes.len());
        match value {
            AmfValue::EcmaArray {
                declared_count,
                entries,
            } => {
                assert_eq!(declared_count, 5);
                assert_eq!(entries.len(), 1);
            }
            _ => panic!("expected ecma array"),
        }
    }
}
