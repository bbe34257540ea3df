use bitflags::bitflags;
use zerocopy::{Immutable, IntoBytes};

bitflags! {
    /// Conditions that end a block or the whole recording.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Hash)]
    #[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
    pub struct TerminationFlags: u8 {
        /// End the block on a rising trigger edge.
        const BLK_TERM_RISING    = 1 << 7;
        /// End the block on a falling trigger edge.
        const BLK_TERM_FALLING   = 1 << 6;
        /// End the block while the trigger is high.
        const BLK_TERM_HIGH      = 1 << 5;
        /// End the block while the trigger is low.
        const BLK_TERM_LOW       = 1 << 4;
        /// End the block when it is full.
        const BLK_TERM_FULL      = 1 << 3;
        /// End the recording at the end of the block.
        const REC_TERM_BLOCK_END = 1 << 2;
        /// End the recording when the region is full.
        const REC_TERM_MEMORY    = 1 << 1;
        /// End the recording on trigger.
        const REC_TERM_TRIGGER   = 1 << 0;
    }
}

/// A recording sequencer state as stored in the sequencer program memory.
#[bitfield_struct::bitfield(u64)]
#[derive(IntoBytes, Immutable, PartialEq, Eq)]
pub struct SeqCommand {
    #[bits(8)]
    termination_bits: u8,
    #[bits(4)]
    pub next_state: u8,
    #[bits(32)]
    block_size_minus_one: u32,
    #[bits(20)]
    __: u32,
}

impl SeqCommand {
    /// Creates a command for a block of `block_size` frames.
    ///
    /// `block_size` must be at least one.
    #[must_use]
    pub const fn encode(termination: TerminationFlags, next_state: u8, block_size: u32) -> Self {
        Self::new()
            .with_termination_bits(termination.bits())
            .with_next_state(next_state)
            .with_block_size_minus_one(block_size.saturating_sub(1))
    }

    /// Block size in frames.
    #[must_use]
    pub const fn block_size(&self) -> u64 {
        self.block_size_minus_one() as u64 + 1
    }

    /// Termination conditions.
    #[must_use]
    pub const fn termination(&self) -> TerminationFlags {
        TerminationFlags::from_bits_retain(self.termination_bits())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[rstest::rstest]
    #[case(0x0000_0000_0000_0000, TerminationFlags::empty(), 0, 1)]
    #[case(0x0000_0000_0000_010E, TerminationFlags::BLK_TERM_FULL | TerminationFlags::REC_TERM_BLOCK_END | TerminationFlags::REC_TERM_MEMORY, 1, 1)]
    #[case(0x0000_0000_0006_3F80, TerminationFlags::BLK_TERM_RISING, 0xF, 100)]
    #[case(0x0000_0FFF_FFFF_E001, TerminationFlags::REC_TERM_TRIGGER, 0, u32::MAX)]
    fn encode(
        #[case] expect: u64,
        #[case] termination: TerminationFlags,
        #[case] next_state: u8,
        #[case] block_size: u32,
    ) {
        let cmd = SeqCommand::encode(termination, next_state, block_size);
        assert_eq!(expect, cmd.into_bits());
        assert_eq!(expect.to_le_bytes(), cmd.as_bytes());
        assert_eq!(termination, cmd.termination());
        assert_eq!(next_state, cmd.next_state());
        assert_eq!(block_size as u64, cmd.block_size());
    }
}
