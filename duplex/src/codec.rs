//! Wire format for one call.
//!
//! Every frame travels behind a 4-byte big-endian length prefix
//! ([`LengthDelimitedCodec`]). Inside the frame:
//!
//! ```text
//! request  = u16 endpoint_len | endpoint (utf-8) | payload
//! response = u8 code | u32 message_len | message (utf-8) | payload
//! ```

use crate::status::{Code, Status};
use bytes::{Buf, BufMut, Bytes, BytesMut};
use tokio::io::DuplexStream;
use tokio_util::codec::{Framed, LengthDelimitedCodec};

pub const MAX_ENDPOINT_LEN: usize = u16::MAX as usize;

const RESPONSE_HEADER_LEN: usize = 5;

pub(crate) type Transport = Framed<DuplexStream, LengthDelimitedCodec>;

pub(crate) fn framed(
    stream: DuplexStream,
    max_frame_length: usize,
) -> Transport {
    let codec = LengthDelimitedCodec::builder()
        .max_frame_length(max_frame_length)
        .new_codec();
    Framed::new(stream, codec)
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FrameError {
    #[error("frame truncated, {needed} more byte(s) expected")]
    Truncated { needed: usize },

    #[error("endpoint is not valid utf-8")]
    InvalidEndpoint,

    #[error("status message is not valid utf-8")]
    InvalidMessage,

    #[error("unknown status code {0}")]
    UnknownCode(u8),

    #[error("endpoint is {0} bytes, at most {max} allowed", max = MAX_ENDPOINT_LEN)]
    EndpointTooLong(usize),
}

fn need(
    frame: &Bytes,
    len: usize,
) -> Result<(), FrameError> {
    match len.checked_sub(frame.remaining()) {
        Some(needed) if needed > 0 => Err(FrameError::Truncated { needed }),
        _ => Ok(()),
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Request {
    pub endpoint: String,
    pub payload: Bytes,
}

impl Request {
    pub fn new(
        endpoint: impl Into<String>,
        payload: impl Into<Bytes>,
    ) -> Self {
        Self {
            endpoint: endpoint.into(),
            payload: payload.into(),
        }
    }

    pub fn encode(&self) -> Result<Bytes, FrameError> {
        let endpoint = self.endpoint.as_bytes();
        if endpoint.len() > MAX_ENDPOINT_LEN {
            return Err(FrameError::EndpointTooLong(endpoint.len()));
        }

        let mut buf = BytesMut::with_capacity(2 + endpoint.len() + self.payload.len());
        buf.put_u16(endpoint.len() as u16);
        buf.put_slice(endpoint);
        buf.put_slice(&self.payload);
        Ok(buf.freeze())
    }

    pub fn decode(mut frame: Bytes) -> Result<Self, FrameError> {
        need(&frame, 2)?;
        let len = frame.get_u16() as usize;
        need(&frame, len)?;

        let endpoint = frame.split_to(len);
        let endpoint =
            String::from_utf8(endpoint.to_vec()).map_err(|_| FrameError::InvalidEndpoint)?;

        Ok(Self {
            endpoint,
            payload: frame,
        })
    }
}

/// A handler's answer: payload on success, [`Status`] otherwise.
pub type Response = Result<Bytes, Status>;

pub fn encode_response(response: &Response) -> Bytes {
    let (code, message, payload) = match response {
        Ok(payload) => (Code::Ok, "", payload.as_ref()),
        Err(status) => (status.code, status.message.as_str(), &[][..]),
    };

    let mut buf = BytesMut::with_capacity(RESPONSE_HEADER_LEN + message.len() + payload.len());
    buf.put_u8(code as u8);
    buf.put_u32(message.len() as u32);
    buf.put_slice(message.as_bytes());
    buf.put_slice(payload);
    buf.freeze()
}

pub fn decode_response(mut frame: Bytes) -> Result<Response, FrameError> {
    need(&frame, RESPONSE_HEADER_LEN)?;
    let raw = frame.get_u8();
    let code = Code::from_u8(raw).ok_or(FrameError::UnknownCode(raw))?;
    let len = frame.get_u32() as usize;
    need(&frame, len)?;

    let message = frame.split_to(len);
    let message = String::from_utf8(message.to_vec()).map_err(|_| FrameError::InvalidMessage)?;

    Ok(match code {
        Code::Ok => Ok(frame),
        code => Err(Status::new(code, message)),
    })
}
