//! Wire frames exchanged with clients.
//!
//! Outbound values travel as JSON text frames of the form
//! `{"Number":"<decimal>"}`. The number is a string so that consumers with
//! narrow integer types do not lose precision.

use crate::{Result, U256};
use serde::{Deserialize, Serialize};
use std::borrow::Cow;

/// WebSocket close codes (RFC 6455 §7.4.1) that the service produces or
/// recognizes.
pub mod close_code {
    /// Normal closure; the purpose of the connection has been fulfilled.
    pub const NORMAL: u16 = 1000;
    /// The peer is going away (page navigation, server shutdown).
    pub const AWAY: u16 = 1001;
    /// No status code was present in the close frame.
    ///
    /// Reserved like [`ABNORMAL`]: it must never appear in a close frame on
    /// the wire. A peer that sends it anyway is out of protocol, but it is
    /// still classified as an expected disconnect.
    pub const NO_STATUS: u16 = 1005;
    /// The connection dropped without a close frame. Reserved; see
    /// [`NO_STATUS`].
    pub const ABNORMAL: u16 = 1006;
}

/// Close reason sent to a connection whose address already has a stream.
pub const DUPLICATE_ADDRESS_REASON: &str = "Ip address is already connected";

/// One generated value, as sent to the client.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValueFrame {
    #[serde(rename = "Number")]
    pub number: U256,
}

impl ValueFrame {
    pub const fn new(number: U256) -> Self {
        Self { number }
    }

    /// Encodes the frame as JSON text.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }
}

/// A protocol-level close frame.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CloseFrame {
    pub code: u16,
    pub reason: Cow<'static, str>,
}

impl CloseFrame {
    /// The rejection sent when an address is already streaming. It uses the
    /// normal-closure code because a duplicate is a policy outcome, not a
    /// fault.
    pub const fn duplicate_address() -> Self {
        Self {
            code: close_code::NORMAL,
            reason: Cow::Borrowed(DUPLICATE_ADDRESS_REASON),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn value_frame_carries_number_as_decimal_string() {
        let frame = ValueFrame::new(U256::MAX);
        let json = frame.to_json().expect("encode");
        assert_eq!(
            json,
            r#"{"Number":"115792089237316195423570985008687907853269984665640564039457584007913129639935"}"#
        );
        let back: ValueFrame = serde_json::from_str(&json).expect("decode");
        assert_eq!(back, frame);
    }

    #[test]
    fn duplicate_address_close_is_a_normal_closure() {
        let frame = CloseFrame::duplicate_address();
        assert_eq!(frame.code, close_code::NORMAL);
        assert_eq!(frame.reason, DUPLICATE_ADDRESS_REASON);
    }
}
