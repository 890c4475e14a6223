/// Bitcoin wire-format decoding failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecodeError {
    UnexpectedEof,
}

impl std::fmt::Display for DecodeError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DecodeError::UnexpectedEof => write!(f, "unexpected end of input"),
        }
    }
}

impl std::error::Error for DecodeError {}

/// Decodes a Bitcoin VarInt at `offset`, returning the value and the number
/// of bytes consumed (selector included).
pub fn decode_var_int(bytes: &[u8], offset: usize) -> Result<(u64, usize), DecodeError> {
    let selector = *bytes.get(offset).ok_or(DecodeError::UnexpectedEof)?;
    let width = match selector {
        0xfd => 2,
        0xfe => 4,
        0xff => 8,
        value => return Ok((u64::from(value), 1)),
    };

    let payload = bytes
        .get(offset + 1..offset + 1 + width)
        .ok_or(DecodeError::UnexpectedEof)?;
    let mut buf = [0u8; 8];
    buf[..width].copy_from_slice(payload);
    Ok((u64::from_le_bytes(buf), 1 + width))
}
