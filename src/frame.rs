//! Wire-format definitions for every frame exchanged with the peer.
//!
//! This module is responsible for:
//! - Defining the on-wire binary layout (offset header + body).
//! - Serialising a [`Frame`] into a byte buffer ready for transmission.
//! - Parsing raw datagrams back into a [`Frame`], returning errors for
//!   truncated or undecodable input instead of panicking.
//!
//! No I/O happens here.
//!
//! # Wire format
//!
//! The header is a single **big-endian, two's-complement** `i32`.
//!
//! ```text
//!  0               1               2               3
//!  0 1 2 3 4 5 6 7 0 1 2 3 4 5 6 7 0 1 2 3 4 5 6 7 0 1 2 3 4 5 6 7
//! +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
//! |                     Offset (signed, BE)                       |
//! +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
//! |                           Body ...                            |
//! +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
//! ```
//!
//! | Frame    | Header                          | Body           |
//! |----------|---------------------------------|----------------|
//! | Data     | byte offset of the chunk        | raw chunk      |
//! | Terminal | total payload length            | empty          |
//! | ACK      | next expected byte (cumulative) | `ack`          |
//! | FIN      | any                             | `fin`          |
//! | FINACK   | `0`                             | `==FINACK==`   |
//!
//! Direction decides how a body is read: frames from the peer are always
//! control text ([`Frame::parse_control`]); frames from the sender carry raw
//! bytes ([`Frame::parse_outbound`]).

use thiserror::Error;

/// Byte length of the offset header.
pub const HEADER_LEN: usize = 4;

/// Body of an acknowledgement frame.
pub const ACK_BODY: &str = "ack";
/// Body of the peer's finish frame.
pub const FIN_BODY: &str = "fin";
/// Body of the sender's final frame.
pub const FINACK_BODY: &str = "==FINACK==";

/// One protocol frame, in either direction.
///
/// The terminal frame is a [`Frame::Data`] with an empty body whose offset
/// equals the total payload length.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Frame {
    /// Payload chunk starting at `offset`.
    Data { offset: i32, body: Vec<u8> },
    /// Cumulative acknowledgement: every byte below `offset` has arrived.
    Ack { offset: i32 },
    /// The peer has everything and wants to close.
    Fin { offset: i32 },
    /// The sender's last word.
    FinAck,
}

impl Frame {
    /// Build the zero-length terminal frame for a payload of `total` bytes.
    pub fn terminal(total: i32) -> Self {
        Frame::Data {
            offset: total,
            body: Vec::new(),
        }
    }

    /// `true` for a data frame with an empty body.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Frame::Data { body, .. } if body.is_empty())
    }

    /// Serialise this frame into a newly allocated byte vector.
    pub fn encode(&self) -> Vec<u8> {
        match self {
            Frame::Data { offset, body } => encode_data(*offset, body),
            Frame::Ack { offset } => encode_data(*offset, ACK_BODY.as_bytes()),
            Frame::Fin { offset } => encode_data(*offset, FIN_BODY.as_bytes()),
            Frame::FinAck => encode_data(0, FINACK_BODY.as_bytes()),
        }
    }

    /// Parse a frame sent *by the peer* (ACK, FIN or FINACK).
    ///
    /// Returns [`Err`] if:
    /// - `buf` is shorter than [`HEADER_LEN`],
    /// - the body is not valid UTF-8 text, or
    /// - the text is not one of the control bodies.
    pub fn parse_control(buf: &[u8]) -> Result<Self, FrameError> {
        let (offset, body) = split_header(buf)?;
        let text = std::str::from_utf8(body).map_err(|_| FrameError::NotText)?;
        match text {
            ACK_BODY => Ok(Frame::Ack { offset }),
            FIN_BODY => Ok(Frame::Fin { offset }),
            FINACK_BODY => Ok(Frame::FinAck),
            other => Err(FrameError::UnknownControl(other.to_owned())),
        }
    }

    /// Parse a frame sent *by the sender* (data, terminal or FINACK).
    ///
    /// A zero header with the FINACK body is read as [`Frame::FinAck`];
    /// everything else is data.
    pub fn parse_outbound(buf: &[u8]) -> Result<Self, FrameError> {
        let (offset, body) = split_header(buf)?;
        if offset == 0 && body == FINACK_BODY.as_bytes() {
            return Ok(Frame::FinAck);
        }
        Ok(Frame::Data {
            offset,
            body: body.to_vec(),
        })
    }
}

/// Encode a data frame without building a [`Frame`] first.
pub fn encode_data(offset: i32, body: &[u8]) -> Vec<u8> {
    let mut buf = Vec::with_capacity(HEADER_LEN + body.len());
    buf.extend_from_slice(&offset.to_be_bytes());
    buf.extend_from_slice(body);
    buf
}

/// Convert a byte offset into the signed 4-byte header value.
pub fn wire_offset(offset: usize) -> Result<i32, FrameError> {
    i32::try_from(offset).map_err(|_| FrameError::OffsetOutOfRange(offset))
}

fn split_header(buf: &[u8]) -> Result<(i32, &[u8]), FrameError> {
    if buf.len() < HEADER_LEN {
        return Err(FrameError::TooShort(buf.len()));
    }
    let (head, body) = buf.split_at(HEADER_LEN);
    let offset = i32::from_be_bytes([head[0], head[1], head[2], head[3]]);
    Ok((offset, body))
}

/// Errors that can arise when parsing a raw datagram.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FrameError {
    /// Datagram shorter than the offset header.
    #[error("frame of {0} bytes is shorter than the {HEADER_LEN}-byte header")]
    TooShort(usize),
    /// Control body is not UTF-8.
    #[error("control frame body is not valid text")]
    NotText,
    /// Control body is text but not `ack`, `fin` or `==FINACK==`.
    #[error("unrecognised control body {0:?}")]
    UnknownControl(String),
    /// Offset does not fit in the signed 4-byte header.
    #[error("offset {0} does not fit in a 4-byte signed header")]
    OffsetOutOfRange(usize),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn data_frame_layout() {
        let bytes = Frame::Data {
            offset: 0x0102_0304,
            body: b"xyz".to_vec(),
        }
        .encode();
        assert_eq!(bytes, [0x01, 0x02, 0x03, 0x04, b'x', b'y', b'z']);
    }

    #[test]
    fn header_is_twos_complement() {
        let bytes = Frame::Ack { offset: -1 }.encode();
        assert_eq!(&bytes[..HEADER_LEN], &[0xff, 0xff, 0xff, 0xff]);
        assert_eq!(Frame::parse_control(&bytes), Ok(Frame::Ack { offset: -1 }));
    }

    #[test]
    fn terminal_frame_is_header_only() {
        let bytes = Frame::terminal(10).encode();
        assert_eq!(bytes, 10i32.to_be_bytes());
        assert!(Frame::terminal(10).is_terminal());
    }

    #[test]
    fn finack_layout() {
        let bytes = Frame::FinAck.encode();
        assert_eq!(&bytes[..HEADER_LEN], &[0, 0, 0, 0]);
        assert_eq!(&bytes[HEADER_LEN..], b"==FINACK==");
    }

    #[test]
    fn parses_peer_control_frames() {
        let mut ack = 20i32.to_be_bytes().to_vec();
        ack.extend_from_slice(b"ack");
        assert_eq!(Frame::parse_control(&ack), Ok(Frame::Ack { offset: 20 }));

        let mut fin = 7i32.to_be_bytes().to_vec();
        fin.extend_from_slice(b"fin");
        assert_eq!(Frame::parse_control(&fin), Ok(Frame::Fin { offset: 7 }));
    }

    #[test]
    fn short_frame_is_rejected() {
        assert_eq!(Frame::parse_control(&[]), Err(FrameError::TooShort(0)));
        assert_eq!(
            Frame::parse_control(&[0, 0, 1]),
            Err(FrameError::TooShort(3))
        );
        assert_eq!(Frame::parse_outbound(&[9]), Err(FrameError::TooShort(1)));
    }

    #[test]
    fn binary_control_body_is_rejected() {
        let buf = [0, 0, 0, 5, 0xff, 0xfe];
        assert_eq!(Frame::parse_control(&buf), Err(FrameError::NotText));
    }

    #[test]
    fn unknown_control_text_is_rejected() {
        let mut buf = 0i32.to_be_bytes().to_vec();
        buf.extend_from_slice(b"nak");
        assert_eq!(
            Frame::parse_control(&buf),
            Err(FrameError::UnknownControl("nak".into()))
        );
    }

    #[test]
    fn outbound_parse_distinguishes_finack() {
        assert_eq!(
            Frame::parse_outbound(&Frame::FinAck.encode()),
            Ok(Frame::FinAck)
        );
        let data = Frame::Data {
            offset: 1020,
            body: vec![1, 2, 3],
        };
        assert_eq!(Frame::parse_outbound(&data.encode()), Ok(data));
        assert!(Frame::parse_outbound(&Frame::terminal(30).encode())
            .unwrap()
            .is_terminal());
    }

    #[test]
    fn wire_offset_bounds() {
        assert_eq!(wire_offset(0), Ok(0));
        assert_eq!(wire_offset(i32::MAX as usize), Ok(i32::MAX));
        let too_big = i32::MAX as usize + 1;
        assert_eq!(wire_offset(too_big), Err(FrameError::OffsetOutOfRange(too_big)));
    }
}
