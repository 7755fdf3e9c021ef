//! Minimal OSC 1.0 codec for the message shapes avatar control uses.
//!
//! Supported argument tags: `i` (int32), `f` (float32), `s` (string), `T`/`F`
//! (booleans without payload). Bundles are unpacked recursively on decode.

use crate::command::ActionValue;

const BUNDLE_TAG: &[u8] = b"#bundle\0";
const BUNDLE_TIMETAG_LEN: usize = 8;

#[derive(Debug, Clone, PartialEq)]
pub enum OscArg {
    Int(i32),
    Float(f32),
    Str(String),
    Bool(bool),
}

impl OscArg {
    fn type_tag(&self) -> char {
        match self {
            Self::Int(_) => 'i',
            Self::Float(_) => 'f',
            Self::Str(_) => 's',
            Self::Bool(true) => 'T',
            Self::Bool(false) => 'F',
        }
    }

    /// Scalar view for parameter updates; strings are not parameter values.
    pub fn as_action_value(&self) -> Option<ActionValue> {
        match self {
            Self::Int(value) => Some(ActionValue::Int(*value)),
            Self::Float(value) => Some(ActionValue::Float(*value)),
            Self::Bool(value) => Some(ActionValue::Bool(*value)),
            Self::Str(_) => None,
        }
    }
}

/// Arguments carried on the wire for an outbound value.
pub fn args_for_value(value: &ActionValue) -> Vec<OscArg> {
    match value {
        ActionValue::Int(value) => vec![OscArg::Int(*value)],
        ActionValue::Float(value) => vec![OscArg::Float(*value)],
        ActionValue::Bool(value) => vec![OscArg::Bool(*value)],
        ActionValue::Chatbox(payload) => vec![
            OscArg::Str(payload.text.clone()),
            OscArg::Bool(payload.immediate_send),
            OscArg::Bool(payload.play_notification),
        ],
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct OscMessage {
    pub address: String,
    pub args: Vec<OscArg>,
}

impl OscMessage {
    pub fn new(address: impl Into<String>, args: Vec<OscArg>) -> Self {
        Self {
            address: address.into(),
            args,
        }
    }

    pub fn encode(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(64);
        push_padded_str(&mut out, &self.address);
        let tags: String = std::iter::once(',')
            .chain(self.args.iter().map(OscArg::type_tag))
            .collect();
        push_padded_str(&mut out, &tags);
        for arg in &self.args {
            match arg {
                OscArg::Int(value) => out.extend_from_slice(&value.to_be_bytes()),
                OscArg::Float(value) => out.extend_from_slice(&value.to_be_bytes()),
                OscArg::Str(value) => push_padded_str(&mut out, value),
                OscArg::Bool(_) => {}
            }
        }
        out
    }
}

fn push_padded_str(out: &mut Vec<u8>, value: &str) {
    out.extend_from_slice(value.as_bytes());
    out.push(0);
    while out.len() % 4 != 0 {
        out.push(0);
    }
}

/// Errors raised while decoding an inbound packet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OscDecodeError {
    Truncated,
    InvalidString,
    MissingTypeTags,
    UnsupportedTag(char),
    InvalidBundle,
}

impl std::fmt::Display for OscDecodeError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Truncated => write!(f, "packet truncated"),
            Self::InvalidString => write!(f, "invalid OSC string"),
            Self::MissingTypeTags => write!(f, "missing type tag string"),
            Self::UnsupportedTag(tag) => write!(f, "unsupported type tag '{tag}'"),
            Self::InvalidBundle => write!(f, "malformed bundle element"),
        }
    }
}

impl std::error::Error for OscDecodeError {}

/// Decode a UDP payload into its messages, flattening bundles.
pub fn decode_packet(bytes: &[u8]) -> Result<Vec<OscMessage>, OscDecodeError> {
    let mut messages = Vec::new();
    decode_into(bytes, &mut messages)?;
    Ok(messages)
}

fn decode_into(bytes: &[u8], messages: &mut Vec<OscMessage>) -> Result<(), OscDecodeError> {
    if bytes.starts_with(BUNDLE_TAG) {
        let mut cursor = Cursor::new(bytes);
        cursor.take(BUNDLE_TAG.len() + BUNDLE_TIMETAG_LEN)?;
        while !cursor.is_empty() {
            let size = cursor.read_i32()?;
            let size = usize::try_from(size).map_err(|_| OscDecodeError::InvalidBundle)?;
            if size % 4 != 0 {
                return Err(OscDecodeError::InvalidBundle);
            }
            decode_into(cursor.take(size)?, messages)?;
        }
        return Ok(());
    }
    messages.push(decode_message(bytes)?);
    Ok(())
}

fn decode_message(bytes: &[u8]) -> Result<OscMessage, OscDecodeError> {
    let mut cursor = Cursor::new(bytes);
    let address = cursor.read_str()?;
    if cursor.is_empty() {
        // Type tags are optional in very old senders; treat as no arguments.
        return Ok(OscMessage::new(address, Vec::new()));
    }
    let tags = cursor.read_str()?;
    let Some(tags) = tags.strip_prefix(',') else {
        return Err(OscDecodeError::MissingTypeTags);
    };
    let mut args = Vec::with_capacity(tags.len());
    for tag in tags.chars() {
        let arg = match tag {
            'i' => OscArg::Int(cursor.read_i32()?),
            'f' => OscArg::Float(f32::from_bits(cursor.read_i32()? as u32)),
            's' => OscArg::Str(cursor.read_str()?),
            'T' => OscArg::Bool(true),
            'F' => OscArg::Bool(false),
            other => return Err(OscDecodeError::UnsupportedTag(other)),
        };
        args.push(arg);
    }
    Ok(OscMessage::new(address, args))
}

struct Cursor<'a> {
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> Cursor<'a> {
    fn new(bytes: &'a [u8]) -> Self {
        Self { bytes, pos: 0 }
    }

    fn is_empty(&self) -> bool {
        self.pos >= self.bytes.len()
    }

    fn take(&mut self, len: usize) -> Result<&'a [u8], OscDecodeError> {
        let end = self.pos.checked_add(len).ok_or(OscDecodeError::Truncated)?;
        let slice = self
            .bytes
            .get(self.pos..end)
            .ok_or(OscDecodeError::Truncated)?;
        self.pos = end;
        Ok(slice)
    }

    fn read_i32(&mut self) -> Result<i32, OscDecodeError> {
        let raw = self.take(4)?;
        Ok(i32::from_be_bytes([raw[0], raw[1], raw[2], raw[3]]))
    }

    fn read_str(&mut self) -> Result<String, OscDecodeError> {
        let rest = self.bytes.get(self.pos..).ok_or(OscDecodeError::Truncated)?;
        let nul = rest
            .iter()
            .position(|byte| *byte == 0)
            .ok_or(OscDecodeError::InvalidString)?;
        let text = std::str::from_utf8(&rest[..nul])
            .map_err(|_| OscDecodeError::InvalidString)?
            .to_string();
        let padded = (nul + 4) & !3;
        self.take(padded.min(rest.len()))?;
        Ok(text)
    }
}
