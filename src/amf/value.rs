// AMF0 value model

/// An AMF0-encoded value.
///
/// `Object` and `EcmaArray` carry an insertion-order-preserving list of pairs
/// rather than a map: AMF0 Objects round-trip key order on the wire, and a
/// hash map would silently scramble it on re-encode.
#[derive(Debug, Clone, PartialEq)]
pub enum AmfValue {
    Number(f64),
    Boolean(bool),
    String(String),
    Object(Vec<(String, AmfValue)>),
    /// `declared_count` is whatever 4-byte count accompanied the array on
    /// the wire. It is informational only: the ObjectEnd marker is what
    /// actually terminates the pair list on read, so a mismatched count is
    /// not an error.
    EcmaArray {
        declared_count: u32,
        entries: Vec<(String, AmfValue)>,
    },
    Null,
    /// Only ever appears transiently while decoding an Object/EcmaArray; a
    /// well-formed top-level value list never contains one.
    ObjectEnd,
}

pub const AMF_TYPE_NUMBER: u8 = 0x00;
pub const AMF_TYPE_BOOLEAN: u8 = 0x01;
pub const AMF_TYPE_STRING: u8 = 0x02;
pub const AMF_TYPE_OBJECT: u8 = 0x03;
pub const AMF_TYPE_NULL: u8 = 0x05;
pub const AMF_TYPE_ECMA_ARRAY: u8 = 0x08;
pub const AMF_TYPE_OBJECT_END: u8 = 0x09;

impl AmfValue {
    pub fn object<I, S>(pairs: I) -> AmfValue
    where
        I: IntoIterator<Item = (S, AmfValue)>,
        S: Into<String>,
    {
        AmfValue::Object(pairs.into_iter().map(|(k, v)| (k.into(), v)).collect())
    }

    pub fn string<S: Into<String>>(s: S) -> AmfValue {
        AmfValue::String(s.into())
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            AmfValue::Number(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            AmfValue::Boolean(b) => Some(*b),
            AmfValue::Number(n) => Some(*n != 0.0),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            AmfValue::String(s) => Some(s.as_str()),
            _ => None,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, AmfValue::Null)
    }

    /// Looks up a property by key on an `Object` or `EcmaArray`; `None` for
    /// any other variant or a missing key.
    pub fn get(&self, key: &str) -> Option<&AmfValue> {
        let entries = match self {
            AmfValue::Object(entries) => entries,
            AmfValue::EcmaArray { entries, .. } => entries,
            _ => return None,
        };

        entries.iter().find(|(k, _)| k == key).map(|(_, v)| v)
    }

    /// Encodes this value, including its leading type byte.
    pub fn encode(&self) -> Vec<u8> {
        match self {
            AmfValue::Number(n) => {
                let mut out = vec![AMF_TYPE_NUMBER];
                out.extend_from_slice(&n.to_be_bytes());
                out
            }
            AmfValue::Boolean(b) => vec![AMF_TYPE_BOOLEAN, if *b { 1 } else { 0 }],
            AmfValue::String(s) => {
                let mut out = vec![AMF_TYPE_STRING];
                encode_utf8_field(s, &mut out);
                out
            }
            AmfValue::Object(entries) => {
                let mut out = vec![AMF_TYPE_OBJECT];
                encode_pairs(entries, &mut out);
                out
            }
            AmfValue::EcmaArray {
                declared_count,
                entries,
            } => {
                let mut out = vec![AMF_TYPE_ECMA_ARRAY];
                out.extend_from_slice(&declared_count.to_be_bytes());
                encode_pairs(entries, &mut out);
                out
            }
            AmfValue::Null => vec![AMF_TYPE_NULL],
            AmfValue::ObjectEnd => vec![AMF_TYPE_OBJECT_END],
        }
    }
}

fn encode_utf8_field(s: &str, out: &mut Vec<u8>) {
    let bytes = s.as_bytes();
    out.extend_from_slice(&(bytes.len() as u16).to_be_bytes());
    out.extend_from_slice(bytes);
}

/// Encodes `entries` as a run of (key, value) pairs and appends the
/// empty-key + ObjectEnd terminator. Order is preserved exactly as given.
fn encode_pairs(entries: &[(String, AmfValue)], out: &mut Vec<u8>) {
    for (key, value) in entries {
        encode_utf8_field(key, out);
        out.extend_from_slice(&value.encode());
    }
    out.extend_from_slice(&[0, 0, AMF_TYPE_OBJECT_END]);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::amf::read_value;

    #[test]
    fn number_round_trips() {
        let v = AmfValue::Number(3.14);
        let encoded = v.encode();
        assert_eq!(
            encoded,
            vec![0x00, 0x40, 0x09, 0x1E, 0xB8, 0x51, 0xEB, 0x85, 0x1F]
        );
        let (decoded, consumed) = read_value(&encoded).unwrap();
        assert_eq!(consumed, encoded.len());
        assert_eq!(decoded, v);
    }

    #[test]
    fn object_preserves_insertion_order() {
        let v = AmfValue::object(vec![
            ("zebra", AmfValue::Number(1.0)),
            ("apple", AmfValue::Number(2.0)),
        ]);
        let encoded = v.encode();
        let (decoded, _) = read_value(&encoded).unwrap();
        match decoded {
            AmfValue::Object(entries) => {
                assert_eq!(entries[0].0, "zebra");
                assert_eq!(entries[1].0, "apple");
            }
            _ => panic!("expected object"),
        }
    }
}
