//! Builders for client-to-server frames.

use runewire_codec::{CodecError, Frame, STRING_TERMINATOR};

use crate::protocol::client;

/// Empty frame sent after a run of idle ticks.
pub fn keepalive() -> Frame {
    Frame::new(client::KEEPALIVE)
}

/// Public chat: `[effect: sub u8][color: sub u8][text]`, preceded by a
/// back-patched length byte.
pub fn public_chat(effect: u8, color: u8, text: &str) -> Result<Frame, CodecError> {
    let mut frame = Frame::new(client::PUBLIC_CHAT);
    let payload = &mut frame.payload;
    payload.write_u8(0);
    let start = payload.position();
    payload.write_u8_sub(effect);
    payload.write_u8_sub(color);
    for ch in text.chars() {
        payload.write_u8(u8::try_from(u32::from(ch)).unwrap_or(b'?'));
    }
    payload.write_length(payload.position() - start)?;
    Ok(frame)
}

/// Client command, e.g. `::tele 3200 3200` without the leading colons.
pub fn command(text: &str) -> Result<Frame, CodecError> {
    let mut frame = Frame::new(client::COMMAND);
    frame.payload.write_u8(0);
    let start = frame.payload.position();
    frame.payload.write_string(text, STRING_TERMINATOR);
    let length = frame.payload.position() - start;
    frame.payload.write_length(length)?;
    Ok(frame)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keepalive_is_empty_opcode_zero() {
        let frame = keepalive();
        assert_eq!(frame.opcode, 0);
        assert!(frame.is_empty());
    }

    #[test]
    fn test_public_chat_layout() {
        let mut frame = public_chat(1, 2, "hi").unwrap();
        assert_eq!(frame.opcode, client::PUBLIC_CHAT);
        let payload = &mut frame.payload;
        payload.set_position(0);
        assert_eq!(payload.read_u8().unwrap(), 4);
        assert_eq!(payload.read_u8_sub().unwrap(), 1);
        assert_eq!(payload.read_u8_sub().unwrap(), 2);
        assert_eq!(payload.read_bytes(2).unwrap(), b"hi");
    }

    #[test]
    fn test_command_is_length_prefixed_string() {
        let mut frame = command("home").unwrap();
        frame.payload.set_position(0);
        assert_eq!(frame.payload.read_u8().unwrap(), 5);
        let text = frame.payload.read_string(STRING_TERMINATOR).unwrap();
        assert_eq!(text, "home");
    }

    #[test]
    fn test_overlong_chat_is_rejected() {
        let text = "x".repeat(300);
        assert!(matches!(
            public_chat(0, 0, &text),
            Err(CodecError::LengthOutOfRange(302))
        ));
    }
}
