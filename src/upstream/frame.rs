//! Opaque data frames carried between downstream and upstream.

use tokio_tungstenite::tungstenite::Message;

/// A data message relayed verbatim in either direction.
///
/// Control frames (ping, pong, close) are handled per hop and never relayed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Frame {
    Text(String),
    Binary(Vec<u8>),
}

impl Frame {
    /// Extract the data frame from an upstream message, if it carries one.
    pub fn from_upstream(message: Message) -> Option<Self> {
        match message {
            Message::Text(text) => Some(Frame::Text(text.as_str().to_owned())),
            Message::Binary(data) => Some(Frame::Binary(data.to_vec())),
            Message::Ping(_) | Message::Pong(_) | Message::Close(_) | Message::Frame(_) => None,
        }
    }

    pub fn into_upstream(self) -> Message {
        match self {
            Frame::Text(text) => Message::text(text),
            Frame::Binary(data) => Message::binary(data),
        }
    }
}
