//! Scripted torque injection into the steering-column torque status frame.
//!
//! The frame carries two packed fields:
//! - column torque, 11 bits: `byte0 | (byte1 & 0x07) << 8`
//! - output torque, 12 bits: `byte6 >> 4 | byte7 << 4`
//!
//! plus an additive checksum in byte 3. While the ramp counter is inside the
//! active window both fields are replaced and the checksum is recomputed.

use serde::Deserialize;
use tracing::{debug, trace};

use crate::error::{GatewayError, Result};
use crate::types::{CanId, Config, Frame, MAX_PAYLOAD};

/// Steering-column torque status frame (MDPS12)
pub const TORQUE_STATUS_ID: CanId = 593;

const COLUMN_TORQUE_MASK: u16 = 0x7FF;
const OUTPUT_TORQUE_MASK: u16 = 0xFFF;

/// How the first step of the ramp picks its column torque
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RampBase {
    /// Always start from this value
    Fixed(u16),
    /// Start this far below the torque the frame carried
    BelowObserved(u16),
}

/// Constants driving the torque ramp
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct TamperScript {
    pub target_id: CanId,
    /// First counter value that rewrites the frame
    pub first_step: u16,
    /// Last counter value; the counter wraps to zero after it
    pub max_step: u16,
    pub base: RampBase,
    /// Added to the last emitted column torque on every later step
    pub increment: u16,
    pub output_torque: u16,
    pub checksum_index: usize,
}

impl Default for TamperScript {
    fn default() -> Self {
        Self {
            target_id: TORQUE_STATUS_ID,
            first_step: 331,
            max_step: 344,
            base: RampBase::BelowObserved(164),
            increment: 34,
            output_torque: 2058,
            checksum_index: 3,
        }
    }
}

impl Config for TamperScript {
    fn validate(&self) -> Result<()> {
        if self.first_step > self.max_step {
            return Err(GatewayError::InvalidTamperScript(format!(
                "first step {} is past max step {}",
                self.first_step, self.max_step
            )));
        }
        // byte 1 and bytes 6..7 hold the torque fields
        if !matches!(self.checksum_index, 2..=5) {
            return Err(GatewayError::InvalidTamperScript(format!(
                "checksum byte {} overlaps the torque fields",
                self.checksum_index
            )));
        }
        if self.output_torque > OUTPUT_TORQUE_MASK {
            return Err(GatewayError::InvalidTamperScript(format!(
                "output torque {} does not fit 12 bits",
                self.output_torque
            )));
        }
        match self.base {
            RampBase::Fixed(value) | RampBase::BelowObserved(value)
                if value > COLUMN_TORQUE_MASK =>
            {
                Err(GatewayError::InvalidTamperScript(format!(
                    "ramp base {value} does not fit 11 bits"
                )))
            }
            _ => Ok(()),
        }
    }
}

/// Rewrites the torque status frame along the scripted ramp
#[derive(Debug, Clone)]
pub struct TamperUnit {
    script: TamperScript,
    counter: u16,
    last_column_torque: u16,
}

impl TamperUnit {
    pub fn new(script: TamperScript) -> Result<Self> {
        script.validate()?;
        Ok(Self {
            script,
            counter: 0,
            last_column_torque: 0,
        })
    }

    pub fn script(&self) -> &TamperScript {
        &self.script
    }

    pub fn counter(&self) -> u16 {
        self.counter
    }

    /// Whether `frame` is the one this unit rewrites
    pub fn targets(&self, frame: &Frame) -> bool {
        frame.carries(self.script.target_id) && usize::from(frame.len()) == MAX_PAYLOAD
    }

    /// Runs one step: returns the frame to transmit and advances the counter.
    ///
    /// Frames outside the active window come back unchanged.
    pub fn apply(&mut self, frame: &Frame) -> Frame {
        let step = self.counter;
        self.counter = if step >= self.script.max_step {
            0
        } else {
            step + 1
        };

        if step < self.script.first_step {
            return *frame;
        }

        let mut data = *frame.data();
        let torque = if step == self.script.first_step {
            let base = match self.script.base {
                RampBase::Fixed(value) => value,
                RampBase::BelowObserved(offset) => column_torque(&data).wrapping_sub(offset),
            } & COLUMN_TORQUE_MASK;
            debug!(step, base, "torque ramp started");
            base
        } else {
            self.last_column_torque.wrapping_add(self.script.increment) & COLUMN_TORQUE_MASK
        };
        self.last_column_torque = torque;

        write_column_torque(&mut data, torque);
        write_output_torque(&mut data, self.script.output_torque);
        data[self.script.checksum_index] = 0;
        data[self.script.checksum_index] = checksum(&data);

        trace!(step, torque, "torque status rewritten");
        frame.with_payload(data)
    }

    pub fn reset(&mut self) {
        self.counter = 0;
        self.last_column_torque = 0;
    }
}

/// Unsigned byte sum modulo 256
pub fn checksum(data: &[u8]) -> u8 {
    data.iter().fold(0u8, |sum, b| sum.wrapping_add(*b))
}

pub fn column_torque(data: &[u8; MAX_PAYLOAD]) -> u16 {
    u16::from(data[0]) | (u16::from(data[1] & 0x07) << 8)
}

pub fn output_torque(data: &[u8; MAX_PAYLOAD]) -> u16 {
    u16::from(data[6] >> 4) | (u16::from(data[7]) << 4)
}

fn write_column_torque(data: &mut [u8; MAX_PAYLOAD], value: u16) {
    data[0] = (value & 0xFF) as u8;
    data[1] = (data[1] & 0xF8) | ((value >> 8) & 0x07) as u8;
}

fn write_output_torque(data: &mut [u8; MAX_PAYLOAD], value: u16) {
    data[6] = (data[6] & 0x0F) | (((value & 0x0F) as u8) << 4);
    data[7] = ((value >> 4) & 0xFF) as u8;
}

#[cfg(test)]
mod tests {
    use super::*;

    fn status(payload: [u8; 8]) -> Frame {
        Frame::standard(0, TORQUE_STATUS_ID, &payload).unwrap()
    }

    fn at_step(step: u16) -> TamperUnit {
        let mut unit = TamperUnit::new(TamperScript::default()).unwrap();
        let idle = status([0; 8]);
        for _ in 0..step {
            unit.apply(&idle);
        }
        unit
    }

    fn checksum_holds(frame: &Frame, index: usize) -> bool {
        let mut data = *frame.data();
        let stored = data[index];
        data[index] = 0;
        checksum(&data) == stored
    }

    #[test]
    fn test_passthrough_before_window() {
        let mut unit = at_step(0);
        let frame = status([1, 2, 3, 4, 5, 6, 7, 8]);
        assert_eq!(unit.apply(&frame), frame);
        assert_eq!(unit.counter(), 1);
    }

    #[test]
    fn test_first_step_sets_base() {
        let mut unit = at_step(331);
        // column torque 1024 (0x400), output torque 0x123
        let frame = status([0x00, 0x04, 0x00, 0x55, 0x00, 0x00, 0x30, 0x12]);
        let out = unit.apply(&frame);
        assert_eq!(column_torque(out.data()), 1024 - 164);
        assert_eq!(output_torque(out.data()), 2058);
        assert!(checksum_holds(&out, 3));
        assert_eq!(out.id(), TORQUE_STATUS_ID);
    }

    #[test]
    fn test_second_step_adds_increment() {
        let mut unit = at_step(331);
        let frame = status([0x00, 0x04, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00]);
        let first = unit.apply(&frame);
        let second = unit.apply(&frame);
        assert_eq!(column_torque(second.data()), 1024 - 164 + 34);
        assert_eq!(output_torque(second.data()), 2058);
        assert!(checksum_holds(&second, 3));
        assert_ne!(first.data()[3], second.data()[3]);
    }

    #[test]
    fn test_fixed_base() {
        let script = TamperScript {
            base: RampBase::Fixed(100),
            first_step: 0,
            ..Default::default()
        };
        let mut unit = TamperUnit::new(script).unwrap();
        let frame = status([0xFF; 8]);
        let first = unit.apply(&frame);
        let second = unit.apply(&frame);
        assert_eq!(column_torque(first.data()), 100);
        assert_eq!(column_torque(second.data()), 134);
        // unrelated bits survive
        assert_eq!(second.data()[1] & 0xF8, 0xF8);
        assert_eq!(second.data()[6] & 0x0F, 0x0F);
        assert_eq!(second.data()[2], 0xFF);
    }

    #[test]
    fn test_counter_wraps_after_max() {
        let mut unit = at_step(344);
        assert_eq!(unit.counter(), 344);
        let frame = status([0; 8]);
        let last = unit.apply(&frame);
        assert_ne!(last, frame);
        assert_eq!(unit.counter(), 0);
        assert_eq!(unit.apply(&frame), frame);
    }

    #[test]
    fn test_column_torque_wraps_in_11_bits() {
        let mut unit = at_step(331);
        let out = unit.apply(&status([10, 0, 0, 0, 0, 0, 0, 0]));
        assert_eq!(column_torque(out.data()), (10u16.wrapping_sub(164)) & 0x7FF);
    }

    #[test]
    fn test_checksum_holds_across_window() {
        let mut unit = at_step(320);
        let frame = status([0x21, 0x03, 0x00, 0x9A, 0x11, 0x22, 0x3F, 0x44]);
        for _ in 320..=344 {
            let out = unit.apply(&frame);
            if out != frame {
                assert!(checksum_holds(&out, 3));
            }
        }
        assert_eq!(unit.counter(), 0);
    }

    #[test]
    fn test_targets_only_full_status_frames() {
        let unit = at_step(0);
        assert!(unit.targets(&status([0; 8])));
        assert!(!unit.targets(&Frame::standard(0, TORQUE_STATUS_ID, &[0; 4]).unwrap()));
        assert!(!unit.targets(&Frame::standard(0, 832, &[0; 8]).unwrap()));
        assert!(!unit.targets(&Frame::extended(0, TORQUE_STATUS_ID, &[0; 8]).unwrap()));
    }

    #[test]
    fn test_rejects_bad_scripts() {
        let script = TamperScript {
            checksum_index: 7,
            ..Default::default()
        };
        assert!(TamperUnit::new(script).is_err());
        let script = TamperScript {
            first_step: 400,
            ..Default::default()
        };
        assert!(TamperUnit::new(script).is_err());
        let script = TamperScript {
            output_torque: 0x1000,
            ..Default::default()
        };
        assert!(TamperUnit::new(script).is_err());
    }
}
