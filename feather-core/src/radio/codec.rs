//! Framing for the TCP radio bridge.
//!
//! ```text
//! kind:    u8   0x01 = data, 0x02 = ack
//! length:  u8   payload bytes (≤ 252, always 0 for ack)
//! payload: [u8]
//! ```

use bytes::{Buf, BufMut, Bytes, BytesMut};
use tokio_util::codec::{Decoder, Encoder};

use crate::error::FeatherError;
use crate::frame::MAX_FRAME_SIZE;

const KIND_DATA: u8 = 0x01;
const KIND_ACK: u8 = 0x02;
const HEADER_LEN: usize = 2;

/// A unit on the bridge: either a radio frame or the peer's ack for one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RadioFrame {
    Data(Bytes),
    Ack,
}

#[derive(Debug, Default)]
pub struct RadioCodec;

impl Decoder for RadioCodec {
    type Item = RadioFrame;
    type Error = FeatherError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        if src.len() < HEADER_LEN {
            return Ok(None);
        }

        let kind = src[0];
        let len = src[1] as usize;
        if len > MAX_FRAME_SIZE {
            return Err(FeatherError::FrameTooLarge {
                size: len,
                max: MAX_FRAME_SIZE,
            });
        }
        if src.len() < HEADER_LEN + len {
            src.reserve(HEADER_LEN + len - src.len());
            return Ok(None);
        }

        src.advance(HEADER_LEN);
        let payload = src.split_to(len).freeze();
        match kind {
            KIND_DATA => Ok(Some(RadioFrame::Data(payload))),
            KIND_ACK if payload.is_empty() => Ok(Some(RadioFrame::Ack)),
            KIND_ACK => Err(FeatherError::Transport("ack carried a payload".into())),
            other => Err(FeatherError::Transport(format!("unknown frame kind {other:#04x}"))),
        }
    }
}

impl Encoder<RadioFrame> for RadioCodec {
    type Error = FeatherError;

    fn encode(&mut self, item: RadioFrame, dst: &mut BytesMut) -> Result<(), Self::Error> {
        match item {
            RadioFrame::Data(payload) => {
                if payload.len() > MAX_FRAME_SIZE {
                    return Err(FeatherError::FrameTooLarge {
                        size: payload.len(),
                        max: MAX_FRAME_SIZE,
                    });
                }
                dst.reserve(HEADER_LEN + payload.len());
                dst.put_u8(KIND_DATA);
                dst.put_u8(payload.len() as u8);
                dst.extend_from_slice(&payload);
            }
            RadioFrame::Ack => {
                dst.put_u8(KIND_ACK);
                dst.put_u8(0);
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn data_and_ack_share_a_stream() {
        let mut codec = RadioCodec;
        let mut buf = BytesMut::new();
        codec
            .encode(RadioFrame::Data(Bytes::from_static(b"STATUS")), &mut buf)
            .unwrap();
        codec.encode(RadioFrame::Ack, &mut buf).unwrap();
        assert_eq!(&buf[..2], &[KIND_DATA, 6]);

        assert_eq!(
            codec.decode(&mut buf).unwrap(),
            Some(RadioFrame::Data(Bytes::from_static(b"STATUS")))
        );
        assert_eq!(codec.decode(&mut buf).unwrap(), Some(RadioFrame::Ack));
        assert_eq!(codec.decode(&mut buf).unwrap(), None);
    }

    #[test]
    fn partial_frame_waits_for_more() {
        let mut codec = RadioCodec;
        let mut buf = BytesMut::from(&[KIND_DATA, 4, b'a', b'b'][..]);
        assert_eq!(codec.decode(&mut buf).unwrap(), None);
        buf.extend_from_slice(b"cd");
        assert_eq!(
            codec.decode(&mut buf).unwrap(),
            Some(RadioFrame::Data(Bytes::from_static(b"abcd")))
        );
    }

    #[test]
    fn oversized_rejected_both_ways() {
        let mut codec = RadioCodec;
        let mut buf = BytesMut::new();
        let big = Bytes::from(vec![0u8; MAX_FRAME_SIZE + 1]);
        assert!(codec.encode(RadioFrame::Data(big), &mut buf).is_err());

        let mut buf = BytesMut::from(&[KIND_DATA, 253][..]);
        assert!(matches!(
            codec.decode(&mut buf),
            Err(FeatherError::FrameTooLarge { size: 253, .. })
        ));
    }

    #[tokio::test]
    async fn frames_split_across_reads() {
        use futures::StreamExt;
        use tokio_util::codec::FramedRead;

        let mock = tokio_test::io::Builder::new()
            .read(&[KIND_DATA, 5, b'E', b'C'])
            .read(b"HO")
            .read(&[b'!', KIND_ACK, 0])
            .build();
        let mut frames = FramedRead::new(mock, RadioCodec);

        assert_eq!(
            frames.next().await.unwrap().unwrap(),
            RadioFrame::Data(Bytes::from_static(b"ECHO!"))
        );
        assert_eq!(frames.next().await.unwrap().unwrap(), RadioFrame::Ack);
        assert!(frames.next().await.is_none());
    }

    #[test]
    fn unknown_kind_is_an_error() {
        let mut codec = RadioCodec;
        let mut buf = BytesMut::from(&[0x7f, 0][..]);
        assert!(codec.decode(&mut buf).is_err());
    }
}
