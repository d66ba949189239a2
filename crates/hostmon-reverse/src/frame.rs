use crate::error::ReverseError;

/// Largest payload a single frame may carry: max unsigned short minus the
/// 6-byte header.
pub const MAX_PAYLOAD_LEN: u32 = 65529;

/// Frame header: 2 bytes channel word, 4 bytes payload length, big-endian.
pub const HEADER_LEN: usize = 6;

/// Decoded frame header. Bit 15 of the channel word is the direction flag
/// (set on broker-originated commands); the codec is the only place that
/// masks or sets it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameHeader {
    pub channel_id: u16,
    pub is_command: bool,
    pub payload_len: u32,
}

impl FrameHeader {
    pub fn decode(data: &[u8]) -> Result<Self, ReverseError> {
        if data.len() < HEADER_LEN {
            return Err(ReverseError::ShortRead {
                expected: HEADER_LEN,
                got: data.len(),
            });
        }
        let word = u16::from_be_bytes([data[0], data[1]]);
        Ok(Self {
            channel_id: word & 0x7fff,
            is_command: word & 0x8000 != 0,
            payload_len: u32::from_be_bytes([data[2], data[3], data[4], data[5]]),
        })
    }
}

/// Build an outbound frame: the command bit is always clear and the channel
/// echoes the inbound request being answered.
pub fn encode_frame(channel_id: u16, payload: &[u8]) -> Vec<u8> {
    let mut frame = Vec::with_capacity(HEADER_LEN + payload.len());
    frame.extend_from_slice(&(channel_id & 0x7fff).to_be_bytes());
    frame.extend_from_slice(&(payload.len() as u32).to_be_bytes());
    frame.extend_from_slice(payload);
    frame
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encode_decode_roundtrip() {
        let frame = encode_frame(9, b"hello");
        assert_eq!(frame.len(), HEADER_LEN + 5);

        let hdr = FrameHeader::decode(&frame).unwrap();
        assert_eq!(hdr.channel_id, 9);
        assert!(!hdr.is_command);
        assert_eq!(hdr.payload_len, 5);
        assert_eq!(&frame[HEADER_LEN..], b"hello");
    }

    #[test]
    fn encode_masks_the_command_bit() {
        let frame = encode_frame(0x8001, b"x");
        let hdr = FrameHeader::decode(&frame).unwrap();
        assert_eq!(hdr.channel_id, 1);
        assert!(!hdr.is_command);
    }

    #[test]
    fn decode_extracts_the_command_bit() {
        let hdr = FrameHeader::decode(&[0x80, 0x07, 0x00, 0x00, 0x00, 0x08]).unwrap();
        assert_eq!(hdr.channel_id, 7);
        assert!(hdr.is_command);
        assert_eq!(hdr.payload_len, 8);
    }

    #[test]
    fn decode_rejects_short_headers() {
        let err = FrameHeader::decode(&[0x00, 0x01, 0x00]).unwrap_err();
        assert!(matches!(
            err,
            crate::error::ReverseError::ShortRead {
                expected: HEADER_LEN,
                got: 3
            }
        ));
    }

    #[test]
    fn max_payload_frame_fits_sixteen_bits() {
        let payload = vec![0u8; MAX_PAYLOAD_LEN as usize];
        let frame = encode_frame(1, &payload);
        assert_eq!(frame.len(), 65535);
    }
}
