// ── Entrance sequence deduplication ──
//
// Entrance controllers number each vehicle event and resend the same
// number when an acknowledgment is lost. One counter per entrance starts
// at a sentinel below every valid sequence. A frame is accepted only if
// its number is strictly greater than the counter; acceptance advances
// the counter by exactly one (not to the received number). Receiving the
// top of the 8-bit range drops the counter back to the sentinel, which
// also resynchronizes a counter that drifted behind the entrance.

use crate::error::CoreError;

const NONE_ACCEPTED: i16 = -1;

/// Last-accepted sequence counters, one per physical entrance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntranceSequences {
    last: Vec<i16>,
}

impl EntranceSequences {
    pub fn new(entrances: usize) -> Self {
        Self {
            last: vec![NONE_ACCEPTED; entrances],
        }
    }

    /// Whether a vehicle-arrival frame should be processed.
    pub fn accept(&mut self, entrance: u8, sequence: u8) -> Result<bool, CoreError> {
        let configured = self.last.len();
        let last = self
            .last
            .get_mut(usize::from(entrance))
            .ok_or(CoreError::UnknownEntrance {
                entrance,
                configured,
            })?;

        if i16::from(sequence) <= *last {
            return Ok(false);
        }

        *last = if sequence == u8::MAX {
            NONE_ACCEPTED
        } else {
            *last + 1
        };
        Ok(true)
    }

    /// The counter for an entrance; `None` before anything was accepted
    /// (or after a wrap) and for unknown entrances.
    pub fn last_accepted(&self, entrance: u8) -> Option<u8> {
        self.last
            .get(usize::from(entrance))
            .and_then(|v| u8::try_from(*v).ok())
    }
}
