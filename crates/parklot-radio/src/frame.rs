// ── Protocol frames ──
//
// Every frame starts with a one-byte ASCII tag naming the message kind.
// Inbound fields are single bytes; display coordinates are 16-bit
// big-endian so pixel positions on larger lot maps survive the trip.

use bytes::{Buf, BufMut, Bytes, BytesMut};
use strum::Display;

use crate::error::FrameError;

pub const TAG_VEHICLE_ARRIVAL: u8 = b'E';
pub const TAG_SPACE_STATUS: u8 = b'S';
pub const TAG_DISPLAY_SPACES: u8 = b'D';
pub const TAG_RESERVATION_REQUEST: u8 = b'R';

const STATE_AVAILABLE: u8 = b'A';
const STATE_OCCUPIED: u8 = b'O';

/// Coordinate value reserved for "no space to suggest".
pub const NO_SPACE: u16 = u16::MAX;

/// Largest coordinate a real lot entity may carry on the wire.
pub const MAX_COORDINATE: u16 = NO_SPACE - 1;

/// Reported occupancy of a single parking space.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum SpaceState {
    Available,
    Occupied,
}

impl SpaceState {
    fn from_wire(byte: u8) -> Result<Self, FrameError> {
        match byte {
            STATE_AVAILABLE => Ok(Self::Available),
            STATE_OCCUPIED => Ok(Self::Occupied),
            other => Err(FrameError::InvalidState(other)),
        }
    }

    fn to_wire(self) -> u8 {
        match self {
            Self::Available => STATE_AVAILABLE,
            Self::Occupied => STATE_OCCUPIED,
        }
    }
}

// ── Inbound ──────────────────────────────────────────────────────────

/// Messages sent by entrance and group controllers to the coordinator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InboundMessage {
    /// A vehicle was detected at an entrance.
    VehicleArrival { sequence: u8, entrance: u8 },
    /// A group controller reports a change in one of its spaces.
    SpaceStatus { space_number: u8, state: SpaceState },
}

impl InboundMessage {
    pub fn decode(payload: &[u8]) -> Result<Self, FrameError> {
        let (&tag, rest) = payload.split_first().ok_or(FrameError::Empty)?;
        match tag {
            TAG_VEHICLE_ARRIVAL => {
                let [sequence, entrance] = fields(tag, payload, rest)?;
                Ok(Self::VehicleArrival { sequence, entrance })
            }
            TAG_SPACE_STATUS => {
                let [space_number, state] = fields(tag, payload, rest)?;
                Ok(Self::SpaceStatus {
                    space_number,
                    state: SpaceState::from_wire(state)?,
                })
            }
            tag => Err(FrameError::UnknownTag { tag }),
        }
    }

    /// Encode as a remote controller would. Used by simulators and tests.
    pub fn encode(&self) -> Bytes {
        match *self {
            Self::VehicleArrival { sequence, entrance } => {
                Bytes::from(vec![TAG_VEHICLE_ARRIVAL, sequence, entrance])
            }
            Self::SpaceStatus {
                space_number,
                state,
            } => Bytes::from(vec![TAG_SPACE_STATUS, space_number, state.to_wire()]),
        }
    }
}

/// Read the two single-byte fields every inbound kind carries.
/// Trailing bytes are tolerated.
fn fields(tag: u8, payload: &[u8], rest: &[u8]) -> Result<[u8; 2], FrameError> {
    match rest {
        [a, b, ..] => Ok([*a, *b]),
        _ => Err(FrameError::Truncated {
            tag: char::from(tag),
            expected: 3,
            actual: payload.len(),
        }),
    }
}

// ── Outbound ─────────────────────────────────────────────────────────

/// One suggestion on an entrance display, positionally aligned with the
/// lot's destination list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DisplaySlot {
    Space { x: u16, y: u16 },
    /// No available space for this destination.
    NoSpace,
}

impl DisplaySlot {
    /// Build a slot from lot coordinates, checking the wire range.
    pub fn at(x: i32, y: i32) -> Result<Self, FrameError> {
        Ok(Self::Space {
            x: wire_coordinate(x)?,
            y: wire_coordinate(y)?,
        })
    }
}

fn wire_coordinate(value: i32) -> Result<u16, FrameError> {
    u16::try_from(value)
        .ok()
        .filter(|v| *v <= MAX_COORDINATE)
        .ok_or(FrameError::CoordinateOutOfRange {
            value: i64::from(value),
            max: MAX_COORDINATE,
        })
}

/// Messages sent by the coordinator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutboundMessage {
    /// Suggested spaces for an entrance display, one slot per destination.
    DisplaySpaces { slots: Vec<DisplaySlot> },
    /// Ask a group controller to hold one of its spaces.
    ReservationRequest { space_number: u8 },
}

impl OutboundMessage {
    pub fn encode(&self) -> Bytes {
        match self {
            Self::DisplaySpaces { slots } => {
                let mut buf = BytesMut::with_capacity(1 + slots.len() * 4);
                buf.put_u8(TAG_DISPLAY_SPACES);
                for slot in slots {
                    let (x, y) = match *slot {
                        DisplaySlot::Space { x, y } => (x, y),
                        DisplaySlot::NoSpace => (NO_SPACE, NO_SPACE),
                    };
                    buf.put_u16(x);
                    buf.put_u16(y);
                }
                buf.freeze()
            }
            Self::ReservationRequest { space_number } => {
                Bytes::from(vec![TAG_RESERVATION_REQUEST, *space_number])
            }
        }
    }

    /// Decode as a remote controller would. Used by simulators and tests.
    pub fn decode(payload: &[u8]) -> Result<Self, FrameError> {
        let (&tag, mut rest) = payload.split_first().ok_or(FrameError::Empty)?;
        match tag {
            TAG_DISPLAY_SPACES => {
                if rest.len() % 4 != 0 {
                    return Err(FrameError::Truncated {
                        tag: char::from(tag),
                        expected: 1 + rest.len().div_ceil(4) * 4,
                        actual: payload.len(),
                    });
                }
                let mut slots = Vec::with_capacity(rest.len() / 4);
                while rest.has_remaining() {
                    let x = rest.get_u16();
                    let y = rest.get_u16();
                    slots.push(if x == NO_SPACE && y == NO_SPACE {
                        DisplaySlot::NoSpace
                    } else {
                        DisplaySlot::Space { x, y }
                    });
                }
                Ok(Self::DisplaySpaces { slots })
            }
            TAG_RESERVATION_REQUEST => match rest.first() {
                Some(&space_number) => Ok(Self::ReservationRequest { space_number }),
                None => Err(FrameError::Truncated {
                    tag: char::from(tag),
                    expected: 2,
                    actual: payload.len(),
                }),
            },
            tag => Err(FrameError::UnknownTag { tag }),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn decodes_vehicle_arrival() {
        let msg = InboundMessage::decode(b"E\x07\x01").unwrap();
        assert_eq!(
            msg,
            InboundMessage::VehicleArrival {
                sequence: 7,
                entrance: 1
            }
        );
    }

    #[test]
    fn decodes_space_status_states() {
        assert_eq!(
            InboundMessage::decode(b"S\x03A").unwrap(),
            InboundMessage::SpaceStatus {
                space_number: 3,
                state: SpaceState::Available
            }
        );
        assert_eq!(
            InboundMessage::decode(b"S\x03O").unwrap(),
            InboundMessage::SpaceStatus {
                space_number: 3,
                state: SpaceState::Occupied
            }
        );
    }

    #[test]
    fn trailing_bytes_are_ignored() {
        assert!(InboundMessage::decode(b"E\x00\x00\xFF\xFF").is_ok());
    }

    #[test]
    fn rejects_malformed_inbound() {
        assert_eq!(InboundMessage::decode(b""), Err(FrameError::Empty));
        assert_eq!(
            InboundMessage::decode(b"X\x01\x02"),
            Err(FrameError::UnknownTag { tag: b'X' })
        );
        assert_eq!(
            InboundMessage::decode(b"E\x01"),
            Err(FrameError::Truncated {
                tag: 'E',
                expected: 3,
                actual: 2
            })
        );
        assert_eq!(
            InboundMessage::decode(b"S\x01Z"),
            Err(FrameError::InvalidState(b'Z'))
        );
    }

    #[test]
    fn display_frame_layout() {
        let msg = OutboundMessage::DisplaySpaces {
            slots: vec![
                DisplaySlot::Space { x: 278, y: 305 },
                DisplaySlot::NoSpace,
            ],
        };
        let bytes = msg.encode();
        assert_eq!(
            bytes.as_ref(),
            &[b'D', 0x01, 0x16, 0x01, 0x31, 0xFF, 0xFF, 0xFF, 0xFF]
        );
        assert_eq!(OutboundMessage::decode(&bytes).unwrap(), msg);
    }

    #[test]
    fn reservation_frame_layout() {
        let bytes = OutboundMessage::ReservationRequest { space_number: 4 }.encode();
        assert_eq!(bytes.as_ref(), b"R\x04");
    }

    #[test]
    fn display_slot_checks_wire_range() {
        assert!(DisplaySlot::at(0, 65534).is_ok());
        assert!(DisplaySlot::at(-1, 0).is_err());
        assert!(DisplaySlot::at(65535, 0).is_err());
    }
}
