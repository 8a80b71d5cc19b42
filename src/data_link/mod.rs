//! Mailbox register encoding of CAN frames.
//!
//! The peripheral hands every frame over as four 32-bit registers:
//! - `RIR`: identifier plus the IDE/RTR/TXRQ flag bits
//! - `RDTR`: declared length (bits 0..3) and bus number (bits 4..7)
//! - `RDLR`/`RDHR`: payload bytes 0..3 and 4..7, little-endian
//!
//! Standard identifiers sit at `RIR >> 21`, extended ones at `RIR >> 3`.

use bitflags::bitflags;

use crate::types::{BusId, CanId, Frame, MAX_EXTENDED_ID, MAX_PAYLOAD, MAX_STANDARD_ID};

const STD_ID_SHIFT: u32 = 21;
const EXT_ID_SHIFT: u32 = 3;
const DLC_MASK: u32 = 0xF;
const BUS_SHIFT: u32 = 4;
const BUS_MASK: u32 = 0xF;

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct MailboxFlags: u32 {
        const TXRQ = 1;
        const RTR = 2;
        const IDE = 4;
    }
}

/// Raw mailbox register set
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Mailbox {
    pub rir: u32,
    pub rdtr: u32,
    pub rdlr: u32,
    pub rdhr: u32,
}

impl Mailbox {
    pub fn flags(&self) -> MailboxFlags {
        MailboxFlags::from_bits_truncate(self.rir)
    }

    pub fn is_extended(&self) -> bool {
        self.flags().contains(MailboxFlags::IDE)
    }

    pub fn id(&self) -> CanId {
        if self.is_extended() {
            (self.rir >> EXT_ID_SHIFT) & MAX_EXTENDED_ID
        } else {
            (self.rir >> STD_ID_SHIFT) & MAX_STANDARD_ID
        }
    }

    pub fn bus(&self) -> BusId {
        ((self.rdtr >> BUS_SHIFT) & BUS_MASK) as BusId
    }

    pub fn len(&self) -> u8 {
        (self.rdtr & DLC_MASK) as u8
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn byte(&self, index: usize) -> Option<u8> {
        self.bytes().get(index).copied()
    }

    fn bytes(&self) -> [u8; MAX_PAYLOAD] {
        let mut data = [0u8; MAX_PAYLOAD];
        data[..4].copy_from_slice(&self.rdlr.to_le_bytes());
        data[4..].copy_from_slice(&self.rdhr.to_le_bytes());
        data
    }
}

impl From<&Mailbox> for Frame {
    fn from(mailbox: &Mailbox) -> Self {
        Frame::from_wire(
            mailbox.bus(),
            mailbox.id(),
            mailbox.len(),
            mailbox.bytes(),
            mailbox.is_extended(),
        )
    }
}

impl From<&Frame> for Mailbox {
    fn from(frame: &Frame) -> Self {
        let rir = if frame.is_extended() {
            ((frame.id() & MAX_EXTENDED_ID) << EXT_ID_SHIFT) | MailboxFlags::IDE.bits()
        } else {
            (frame.id() & MAX_STANDARD_ID) << STD_ID_SHIFT
        };
        let rdtr = (u32::from(frame.len()) & DLC_MASK)
            | ((u32::from(frame.bus()) & BUS_MASK) << BUS_SHIFT);
        let [b0, b1, b2, b3, b4, b5, b6, b7] = *frame.data();
        Mailbox {
            rir,
            rdtr,
            rdlr: u32::from_le_bytes([b0, b1, b2, b3]),
            rdhr: u32::from_le_bytes([b4, b5, b6, b7]),
        }
    }
}
