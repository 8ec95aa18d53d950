// AMF command messages: an ordered [name, transaction-id, command-object, optional-args?] sequence

use crate::amf::{read_value, AmfValue};
use crate::error::{RtmpError, RtmpResult};

/// A decoded AMF command message.
#[derive(Debug, Clone)]
pub struct RtmpCommand {
    pub name: String,
    pub transaction_id: f64,
    pub command_object: AmfValue,
    pub optional_args: Option<AmfValue>,
}

impl RtmpCommand {
    pub fn new(name: impl Into<String>, transaction_id: f64, command_object: AmfValue) -> RtmpCommand {
        RtmpCommand {
            name: name.into(),
            transaction_id,
            command_object,
            optional_args: None,
        }
    }

    pub fn with_args(mut self, args: AmfValue) -> RtmpCommand {
        self.optional_args = Some(args);
        self
    }

    /// Decodes `[name:String, transaction-id:Number, command-object:AMF, optional-args:AMF?]`.
    pub fn decode(bytes: &[u8]) -> RtmpResult<RtmpCommand> {
        let mut pos = 0usize;

        let (name_value, consumed) = read_value(&bytes[pos..])?;
        pos += consumed;
        let name = name_value
            .as_str()
            .ok_or_else(|| RtmpError::ProtocolViolation("command name is not a string".to_string()))?
            .to_string();

        let (txn_value, consumed) = read_value(&bytes[pos..])?;
        pos += consumed;
        let transaction_id = txn_value
            .as_f64()
            .ok_or_else(|| RtmpError::ProtocolViolation("transaction id is not a number".to_string()))?;

        let (command_object, consumed) = read_value(&bytes[pos..])?;
        pos += consumed;

        let optional_args = if pos < bytes.len() {
            let (args, _) = read_value(&bytes[pos..])?;
            Some(args)
        } else {
            None
        };

        Ok(RtmpCommand {
            name,
            transaction_id,
            command_object,
            optional_args,
        })
    }

    pub fn encode(&self) -> Vec<u8> {
        let mut out = AmfValue::String(self.name.clone()).encode();
        out.extend_from_slice(&AmfValue::Number(self.transaction_id).encode());
        out.extend_from_slice(&self.command_object.encode());
        if let Some(args) = &self.optional_args {
            out.extend_from_slice(&args.encode());
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_connect_shape() {
        let cmd_obj = AmfValue::object(vec![("app", AmfValue::string("live"))]);
        let cmd = RtmpCommand::new("connect", 1.0, cmd_obj);
        let encoded = cmd.encode();

        let decoded = RtmpCommand::decode(&encoded).unwrap();
        assert_eq!(decoded.name, "connect");
        assert_eq!(decoded.transaction_id, 1.0);
        assert_eq!(decoded.command_object.get("app").and_then(|v| v.as_str()), Some("live"));
        assert!(decoded.optional_args.is_none());
    }

    #[test]
    fn decodes_publish_with_optional_stream_name() {
        let cmd = RtmpCommand::new("publish", 0.0, AmfValue::Null).with_args(AmfValue::string("mystream"));
        let encoded = cmd.encode();

        let decoded = RtmpCommand::decode(&encoded).unwrap();
        assert_eq!(decoded.optional_args.and_then(|v| v.as_str().map(|s| s.to_string())), Some("mystream".to_string()));
    }
}
