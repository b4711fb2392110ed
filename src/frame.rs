
use crate::error::{Error, Result};

// Binary transfers are wrapped in an IEEE 488.2 definite-length block:
// `#`, one ASCII digit giving the width of the length field, that many ASCII
// digits giving the payload length, the payload itself, one terminator byte.
// Header length is always 2 + width and the whole frame is header + payload + 1.

/// Strip the header and trailing terminator from a transfer frame, returning
/// the interior payload bytes unchanged.
pub fn strip(data: &[u8]) -> Result<&[u8]> {
    if data.len() < 2 {
        return Err(Error::Protocol(format!(
            "block frame of {} bytes is too short for a header",
            data.len()
        )));
    }
    if data[0] != b'#' {
        return Err(Error::Protocol(format!(
            "block frame starts with 0x{:02x} instead of '#'",
            data[0]
        )));
    }
    if !data[1].is_ascii_digit() {
        return Err(Error::Protocol(format!(
            "block frame width descriptor 0x{:02x} is not an ASCII digit",
            data[1]
        )));
    }

    let width: usize = (data[1] - b'0') as usize;
    let header_len: usize = 2 + width;
    if data.len() < header_len {
        return Err(Error::Protocol(format!(
            "block frame of {} bytes is shorter than its {}-byte header",
            data.len(),
            header_len
        )));
    }

    let mut payload_len: usize = 0;
    for &digit in &data[2..header_len] {
        if !digit.is_ascii_digit() {
            return Err(Error::Protocol(format!(
                "block frame length field contains non-digit 0x{:02x}",
                digit
            )));
        }
        payload_len = payload_len * 10 + (digit - b'0') as usize;
    }

    // Header, payload, and the single terminator byte must all be present
    if data.len() < header_len + payload_len + 1 {
        return Err(Error::Protocol(format!(
            "block frame declares {} payload bytes but only {} bytes follow the header",
            payload_len,
            data.len() - header_len
        )));
    }

    Ok(&data[header_len..header_len + payload_len])
}

/// Wrap a payload in a definite-length block with a minimal-width length field
/// and a newline terminator.  Inverse of `strip`.
pub fn wrap(payload: &[u8]) -> Vec<u8> {
    let digits: String = payload.len().to_string();

    let mut framed: Vec<u8> = Vec::with_capacity(2 + digits.len() + payload.len() + 1);
    framed.push(b'#');
    framed.push(b'0' + digits.len() as u8);
    framed.extend_from_slice(digits.as_bytes());
    framed.extend_from_slice(payload);
    framed.push(b'\n');
    framed
}
