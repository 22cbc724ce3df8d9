// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Standard message codec: the binary encoding the mobile shell's method
// channels use on the wire.
//
// Only the value types a method call can carry here are supported: null,
// booleans, 32/64-bit integers, doubles, UTF-8 strings, byte buffers, lists
// and maps. Multi-byte values are little-endian. Sizes use a compact form:
// one byte below 254, `254` + u16, or `255` + u32. Doubles are aligned to 8
// bytes relative to the start of the message.

use scanx_core::error::{Result, ScanxError};

use crate::channel::{MethodCall, MethodResult};
use crate::value::MessageValue;

const NULL: u8 = 0;
const TRUE: u8 = 1;
const FALSE: u8 = 2;
const INT32: u8 = 3;
const INT64: u8 = 4;
const FLOAT64: u8 = 6;
const STRING: u8 = 7;
const UINT8_LIST: u8 = 8;
const LIST: u8 = 12;
const MAP: u8 = 13;

/// Deepest list/map nesting a decoded message may have.
pub const MAX_NESTING_DEPTH: usize = 64;

const ENVELOPE_SUCCESS: u8 = 0;
const ENVELOPE_ERROR: u8 = 1;

// -- Values -------------------------------------------------------------------

/// Append the encoding of `value` to `buf`.
pub fn write_value(buf: &mut Vec<u8>, value: &MessageValue) {
    match value {
        MessageValue::Null => buf.push(NULL),
        MessageValue::Bool(true) => buf.push(TRUE),
        MessageValue::Bool(false) => buf.push(FALSE),
        MessageValue::Int32(v) => {
            buf.push(INT32);
            buf.extend_from_slice(&v.to_le_bytes());
        }
        MessageValue::Int64(v) => {
            buf.push(INT64);
            buf.extend_from_slice(&v.to_le_bytes());
        }
        MessageValue::Float64(v) => {
            buf.push(FLOAT64);
            align(buf, 8);
            buf.extend_from_slice(&v.to_le_bytes());
        }
        MessageValue::String(s) => {
            buf.push(STRING);
            write_size(buf, s.len());
            buf.extend_from_slice(s.as_bytes());
        }
        MessageValue::Bytes(bytes) => {
            buf.push(UINT8_LIST);
            write_size(buf, bytes.len());
            buf.extend_from_slice(bytes);
        }
        MessageValue::List(items) => {
            buf.push(LIST);
            write_size(buf, items.len());
            for item in items {
                write_value(buf, item);
            }
        }
        MessageValue::Map(entries) => {
            buf.push(MAP);
            write_size(buf, entries.len());
            for (key, value) in entries {
                write_value(buf, key);
                write_value(buf, value);
            }
        }
    }
}

fn write_size(buf: &mut Vec<u8>, size: usize) {
    if size < 254 {
        buf.push(size as u8);
    } else if size <= u16::MAX as usize {
        buf.push(254);
        buf.extend_from_slice(&(size as u16).to_le_bytes());
    } else {
        buf.push(255);
        buf.extend_from_slice(&(size as u32).to_le_bytes());
    }
}

fn align(buf: &mut Vec<u8>, alignment: usize) {
    let rem = buf.len() % alignment;
    if rem != 0 {
        buf.resize(buf.len() + alignment - rem, 0);
    }
}

/// Cursor over an encoded message.
struct Reader<'a> {
    data: &'a [u8],
    pos: usize,
    /// Lists and maps currently open.
    depth: usize,
}

impl<'a> Reader<'a> {
    fn new(data: &'a [u8]) -> Self {
        Self {
            data,
            pos: 0,
            depth: 0,
        }
    }

    fn enter(&mut self) -> Result<()> {
        if self.depth >= MAX_NESTING_DEPTH {
            return Err(ScanxError::Codec(format!(
                "nesting deeper than {MAX_NESTING_DEPTH} at offset {}",
                self.pos - 1
            )));
        }
        self.depth += 1;
        Ok(())
    }

    fn has_remaining(&self) -> bool {
        self.pos < self.data.len()
    }

    fn take(&mut self, n: usize) -> Result<&'a [u8]> {
        let end = self
            .pos
            .checked_add(n)
            .filter(|&end| end <= self.data.len())
            .ok_or_else(|| {
                ScanxError::Codec(format!(
                    "message truncated: need {n} bytes at offset {}, have {}",
                    self.pos,
                    self.data.len() - self.pos
                ))
            })?;
        let slice = &self.data[self.pos..end];
        self.pos = end;
        Ok(slice)
    }

    fn byte(&mut self) -> Result<u8> {
        Ok(self.take(1)?[0])
    }

    fn array<const N: usize>(&mut self) -> Result<[u8; N]> {
        let mut out = [0u8; N];
        out.copy_from_slice(self.take(N)?);
        Ok(out)
    }

    fn size(&mut self) -> Result<usize> {
        match self.byte()? {
            254 => Ok(u16::from_le_bytes(self.array()?) as usize),
            255 => Ok(u32::from_le_bytes(self.array()?) as usize),
            n => Ok(n as usize),
        }
    }

    fn align(&mut self, alignment: usize) -> Result<()> {
        let rem = self.pos % alignment;
        if rem != 0 {
            self.take(alignment - rem)?;
        }
        Ok(())
    }

    fn value(&mut self) -> Result<MessageValue> {
        let tag = self.byte()?;
        let value = match tag {
            NULL => MessageValue::Null,
            TRUE => MessageValue::Bool(true),
            FALSE => MessageValue::Bool(false),
            INT32 => MessageValue::Int32(i32::from_le_bytes(self.array()?)),
            INT64 => MessageValue::Int64(i64::from_le_bytes(self.array()?)),
            FLOAT64 => {
                self.align(8)?;
                MessageValue::Float64(f64::from_le_bytes(self.array()?))
            }
            STRING => {
                let len = self.size()?;
                let bytes = self.take(len)?;
                let s = std::str::from_utf8(bytes)
                    .map_err(|err| ScanxError::Codec(format!("invalid UTF-8 string: {err}")))?;
                MessageValue::String(s.to_owned())
            }
            UINT8_LIST => {
                let len = self.size()?;
                MessageValue::Bytes(self.take(len)?.to_vec())
            }
            LIST => {
                self.enter()?;
                let len = self.size()?;
                // Every element takes at least one byte.
                let mut items = Vec::with_capacity(len.min(self.data.len() - self.pos));
                for _ in 0..len {
                    items.push(self.value()?);
                }
                self.depth -= 1;
                MessageValue::List(items)
            }
            MAP => {
                self.enter()?;
                let len = self.size()?;
                let mut entries = Vec::with_capacity(len.min(self.data.len() - self.pos));
                for _ in 0..len {
                    let key = self.value()?;
                    let value = self.value()?;
                    entries.push((key, value));
                }
                self.depth -= 1;
                MessageValue::Map(entries)
            }
            other => {
                return Err(ScanxError::Codec(format!(
                    "unsupported value type {other} at offset {}",
                    self.pos - 1
                )));
            }
        };
        Ok(value)
    }

    fn finish(&self) -> Result<()> {
        if self.has_remaining() {
            return Err(ScanxError::Codec(format!(
                "{} unexpected trailing bytes",
                self.data.len() - self.pos
            )));
        }
        Ok(())
    }
}

/// Encode a single value as a complete message.
pub fn encode_value(value: &MessageValue) -> Vec<u8> {
    let mut buf = Vec::new();
    write_value(&mut buf, value);
    buf
}

/// Decode a message holding exactly one value.
pub fn decode_value(data: &[u8]) -> Result<MessageValue> {
    let mut reader = Reader::new(data);
    let value = reader.value()?;
    reader.finish()?;
    Ok(value)
}

// -- Method call envelopes ----------------------------------------------------

/// Encode a method call: the method name followed by its arguments.
pub fn encode_method_call(call: &MethodCall) -> Vec<u8> {
    let mut buf = Vec::new();
    write_value(&mut buf, &MessageValue::String(call.method.clone()));
    write_value(&mut buf, &call.arguments);
    buf
}

pub fn decode_method_call(data: &[u8]) -> Result<MethodCall> {
    let mut reader = Reader::new(data);
    let method = match reader.value()? {
        MessageValue::String(name) => name,
        other => {
            return Err(ScanxError::Codec(format!(
                "method name must be a string, got {}",
                other.type_name()
            )));
        }
    };
    let arguments = reader.value()?;
    reader.finish()?;
    Ok(MethodCall { method, arguments })
}

/// Encode a reply envelope. "Not implemented" is the empty message.
pub fn encode_reply(result: &MethodResult) -> Vec<u8> {
    let mut buf = Vec::new();
    match result {
        MethodResult::Success(value) => {
            buf.push(ENVELOPE_SUCCESS);
            write_value(&mut buf, value);
        }
        MethodResult::Error {
            code,
            message,
            details,
        } => {
            buf.push(ENVELOPE_ERROR);
            write_value(&mut buf, &MessageValue::String(code.clone()));
            let message = message
                .as_ref()
                .map_or(MessageValue::Null, |m| MessageValue::String(m.clone()));
            write_value(&mut buf, &message);
            write_value(&mut buf, details);
        }
        MethodResult::NotImplemented => {}
    }
    buf
}

/// Decode a reply envelope. An error envelope may carry a trailing
/// stack-trace string, which is accepted and dropped.
pub fn decode_reply(data: &[u8]) -> Result<MethodResult> {
    if data.is_empty() {
        return Ok(MethodResult::NotImplemented);
    }

    let mut reader = Reader::new(data);
    let result = match reader.byte()? {
        ENVELOPE_SUCCESS => MethodResult::Success(reader.value()?),
        ENVELOPE_ERROR => {
            let code = match reader.value()? {
                MessageValue::String(code) => code,
                other => {
                    return Err(ScanxError::Codec(format!(
                        "error code must be a string, got {}",
                        other.type_name()
                    )));
                }
            };
            let message = match reader.value()? {
                MessageValue::String(message) => Some(message),
                MessageValue::Null => None,
                other => {
                    return Err(ScanxError::Codec(format!(
                        "error message must be a string or null, got {}",
                        other.type_name()
                    )));
                }
            };
            let details = reader.value()?;
            if reader.has_remaining() {
                reader.value()?;
            }
            MethodResult::Error {
                code,
                message,
                details,
            }
        }
        other => {
            return Err(ScanxError::Codec(format!("invalid reply envelope tag {other}")));
        }
    };
    reader.finish()?;
    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn image_call(bytes: Vec<u8>) -> MethodCall {
        MethodCall::new(
            "processDocument",
            MessageValue::Map(vec![(
                MessageValue::String("image".into()),
                MessageValue::Bytes(bytes),
            )]),
        )
    }

    #[test]
    fn encodes_process_document_call_byte_for_byte() {
        let encoded = encode_method_call(&image_call(vec![0xAA, 0xBB]));
        let mut expected = vec![STRING, 15];
        expected.extend_from_slice(b"processDocument");
        expected.extend_from_slice(&[MAP, 1, STRING, 5]);
        expected.extend_from_slice(b"image");
        expected.extend_from_slice(&[UINT8_LIST, 2, 0xAA, 0xBB]);
        assert_eq!(encoded, expected);
    }

    #[test]
    fn method_call_survives_the_wire() {
        let call = image_call((0..=255u8).cycle().take(70_000).collect());
        let decoded = decode_method_call(&encode_method_call(&call)).unwrap();
        assert_eq!(decoded, call);
    }

    #[test]
    fn sizes_use_compact_forms() {
        let mut buf = Vec::new();
        write_size(&mut buf, 253);
        write_size(&mut buf, 254);
        write_size(&mut buf, 70_000);
        assert_eq!(buf, vec![253, 254, 254, 0, 255, 0x70, 0x11, 0x01, 0x00]);
    }

    #[test]
    fn doubles_are_aligned_to_eight_bytes() {
        let value = MessageValue::List(vec![MessageValue::Float64(1.5)]);
        let encoded = encode_value(&value);
        // tag, size, tag, 5 bytes padding, 8 bytes payload
        assert_eq!(encoded.len(), 16);
        assert_eq!(&encoded[3..8], &[0u8; 5]);
        assert_eq!(decode_value(&encoded).unwrap(), value);
    }

    #[test]
    fn mixed_values_decode_to_what_was_encoded() {
        let value = MessageValue::Map(vec![
            (MessageValue::String("n".into()), MessageValue::Null),
            (MessageValue::Int32(-7), MessageValue::Bool(true)),
            (MessageValue::Int64(1 << 40), MessageValue::Bool(false)),
            (
                MessageValue::String("list".into()),
                MessageValue::List(vec![
                    MessageValue::String("ünïcødé".into()),
                    MessageValue::Float64(-0.25),
                ]),
            ),
        ]);
        assert_eq!(decode_value(&encode_value(&value)).unwrap(), value);
    }

    #[test]
    fn truncated_message_is_rejected() {
        let encoded = encode_method_call(&image_call(vec![1, 2, 3, 4]));
        let err = decode_method_call(&encoded[..encoded.len() - 1]).unwrap_err();
        assert!(matches!(err, ScanxError::Codec(_)));
    }

    #[test]
    fn trailing_bytes_are_rejected() {
        let mut encoded = encode_value(&MessageValue::Null);
        encoded.push(0);
        assert!(matches!(decode_value(&encoded), Err(ScanxError::Codec(_))));
    }

    fn nested_lists(depth: usize) -> Vec<u8> {
        let mut data = [LIST, 1].repeat(depth);
        data.push(NULL);
        data
    }

    #[test]
    fn nesting_up_to_the_limit_decodes() {
        let mut value = decode_value(&nested_lists(MAX_NESTING_DEPTH)).unwrap();
        let mut depth = 0;
        while let MessageValue::List(mut items) = value {
            depth += 1;
            value = items.remove(0);
        }
        assert_eq!(depth, MAX_NESTING_DEPTH);
        assert_eq!(value, MessageValue::Null);
    }

    #[test]
    fn excessive_nesting_is_rejected() {
        let err = decode_value(&nested_lists(MAX_NESTING_DEPTH + 1)).unwrap_err();
        assert!(matches!(err, ScanxError::Codec(_)), "got {err:?}");

        // Far deeper than the thread stack could follow.
        let err = decode_value(&nested_lists(200_000)).unwrap_err();
        assert!(matches!(err, ScanxError::Codec(_)));
    }

    #[test]
    fn deeply_nested_map_arguments_are_rejected() {
        let mut data = vec![STRING, 1, b'm'];
        data.extend([MAP, 1, NULL].repeat(100_000));
        data.push(NULL);
        assert!(matches!(decode_method_call(&data), Err(ScanxError::Codec(_))));
    }

    #[test]
    fn unknown_type_tag_is_rejected() {
        assert!(matches!(decode_value(&[42]), Err(ScanxError::Codec(_))));
    }

    #[test]
    fn non_string_method_name_is_rejected() {
        let mut buf = encode_value(&MessageValue::Int32(1));
        write_value(&mut buf, &MessageValue::Null);
        assert!(matches!(decode_method_call(&buf), Err(ScanxError::Codec(_))));
    }

    #[test]
    fn no_image_error_envelope_layout() {
        let reply = MethodResult::Error {
            code: "NO_IMAGE".into(),
            message: Some("No image provided".into()),
            details: MessageValue::Null,
        };
        let encoded = encode_reply(&reply);
        assert_eq!(encoded[0], ENVELOPE_ERROR);
        assert_eq!(*encoded.last().unwrap(), NULL);
        assert_eq!(decode_reply(&encoded).unwrap(), reply);
    }

    #[test]
    fn error_envelope_with_stack_trace_is_accepted() {
        let mut encoded = encode_reply(&MethodResult::Error {
            code: "X".into(),
            message: None,
            details: MessageValue::Null,
        });
        write_value(&mut encoded, &MessageValue::String("at main()".into()));
        assert!(matches!(decode_reply(&encoded), Ok(MethodResult::Error { .. })));
    }

    #[test]
    fn not_implemented_is_the_empty_reply() {
        assert!(encode_reply(&MethodResult::NotImplemented).is_empty());
        assert_eq!(decode_reply(&[]).unwrap(), MethodResult::NotImplemented);
    }

    #[test]
    fn success_reply_carries_bytes() {
        let reply = MethodResult::Success(MessageValue::Bytes(vec![9, 8, 7]));
        assert_eq!(decode_reply(&encode_reply(&reply)).unwrap(), reply);
    }
}
