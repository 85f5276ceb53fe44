//! ADC channel-to-rank maps.
//!
//! The three converters run in triple interleaved mode: their regular
//! sequences are sampled together and land in one DMA buffer, converter by
//! converter for each rank. ADC1 and ADC2 also carry a short injected
//! sequence for the phase current samples taken at the PWM trigger.

use serde::{Deserialize, Serialize};

use super::BoardError;

/// Converter instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Adc {
    Adc1 = 0,
    Adc2 = 1,
    Adc3 = 2,
}

pub const ADC_COUNT: usize = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Sequence {
    Regular,
    Injected,
}

impl Sequence {
    /// Number of ranks the hardware provides for this sequence.
    pub const fn max_rank(self) -> u8 {
        match self {
            Sequence::Regular => 16,
            Sequence::Injected => 4,
        }
    }
}

/// Input channel of a converter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdcChannel(pub u8);

impl AdcChannel {
    /// Internal reference voltage, ADC1 only.
    pub const VREFINT: AdcChannel = AdcChannel(17);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SampleTime {
    Cycles3,
    Cycles15,
    Cycles28,
    Cycles56,
    Cycles84,
    Cycles112,
    Cycles144,
    Cycles480,
}

impl SampleTime {
    pub const fn cycles(self) -> u16 {
        match self {
            SampleTime::Cycles3 => 3,
            SampleTime::Cycles15 => 15,
            SampleTime::Cycles28 => 28,
            SampleTime::Cycles56 => 56,
            SampleTime::Cycles84 => 84,
            SampleTime::Cycles112 => 112,
            SampleTime::Cycles144 => 144,
            SampleTime::Cycles480 => 480,
        }
    }
}

/// 1-based position inside a conversion sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Rank(u8);

impl Rank {
    /// Const constructor for tables; an out-of-range rank fails the build.
    pub const fn of(
        sequence: Sequence,
        rank: u8,
    ) -> Rank {
        assert!(rank >= 1 && rank <= sequence.max_rank(), "rank out of range");
        Rank(rank)
    }

    pub fn new(
        sequence: Sequence,
        rank: u8,
    ) -> Result<Rank, BoardError> {
        if rank == 0 || rank > sequence.max_rank() {
            return Err(BoardError::InvalidRank { sequence, rank });
        }
        Ok(Rank(rank))
    }

    pub const fn get(self) -> u8 {
        self.0
    }
}

/// One `(channel, rank, sample time)` assignment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChannelSlot {
    pub channel: AdcChannel,
    pub rank: Rank,
    pub sample_time: SampleTime,
}

/// Ordered slots of one sequence of one converter.
#[derive(Debug, Clone, Copy)]
pub struct SequenceMap {
    pub adc: Adc,
    pub sequence: Sequence,
    pub slots: &'static [ChannelSlot],
}

/// Channel/sequence configuration primitive of the converters.
pub trait AdcSequencer {
    fn configure_channel(
        &mut self,
        adc: Adc,
        sequence: Sequence,
        slot: ChannelSlot,
    );
}

impl<S: AdcSequencer + ?Sized> AdcSequencer for &mut S {
    fn configure_channel(
        &mut self,
        adc: Adc,
        sequence: Sequence,
        slot: ChannelSlot,
    ) {
        (**self).configure_channel(adc, sequence, slot)
    }
}

const fn regular(
    channel: u8,
    rank: u8,
) -> ChannelSlot {
    ChannelSlot {
        channel: AdcChannel(channel),
        rank: Rank::of(Sequence::Regular, rank),
        sample_time: SampleTime::Cycles15,
    }
}

const fn injected(
    channel: u8,
    rank: u8,
) -> ChannelSlot {
    ChannelSlot {
        channel: AdcChannel(channel),
        rank: Rank::of(Sequence::Injected, rank),
        sample_time: SampleTime::Cycles15,
    }
}

const ADC1_REGULAR: [ChannelSlot; 4] = [
    regular(0, 1),
    regular(8, 2),
    regular(AdcChannel::VREFINT.0, 3),
    regular(4, 4),
];
const ADC2_REGULAR: [ChannelSlot; 4] = [regular(1, 1), regular(9, 2), regular(6, 3), regular(5, 4)];
const ADC3_REGULAR: [ChannelSlot; 4] = [regular(2, 1), regular(3, 2), regular(12, 3), regular(10, 4)];

const ADC1_INJECTED: [ChannelSlot; 2] = [injected(9, 1), injected(8, 2)];
const ADC2_INJECTED: [ChannelSlot; 2] = [injected(8, 1), injected(9, 2)];

/// Every sequence of the board, in the order it is programmed.
pub const VOLLEY_ADC_TABLES: [SequenceMap; 5] = [
    SequenceMap {
        adc: Adc::Adc1,
        sequence: Sequence::Regular,
        slots: &ADC1_REGULAR,
    },
    SequenceMap {
        adc: Adc::Adc2,
        sequence: Sequence::Regular,
        slots: &ADC2_REGULAR,
    },
    SequenceMap {
        adc: Adc::Adc3,
        sequence: Sequence::Regular,
        slots: &ADC3_REGULAR,
    },
    SequenceMap {
        adc: Adc::Adc1,
        sequence: Sequence::Injected,
        slots: &ADC1_INJECTED,
    },
    SequenceMap {
        adc: Adc::Adc2,
        sequence: Sequence::Injected,
        slots: &ADC2_INJECTED,
    },
];

/// Program every slot of every map, in table order.
pub fn apply_adc_tables<S: AdcSequencer>(
    sequencer: &mut S,
    tables: &[SequenceMap],
) {
    for map in tables {
        for &slot in map.slots {
            sequencer.configure_channel(map.adc, map.sequence, slot);
        }
    }
    tracing::debug!(sequences = tables.len(), "adc channel maps applied");
}

pub fn setup_adc_channels<S: AdcSequencer>(sequencer: &mut S) {
    apply_adc_tables(sequencer, &VOLLEY_ADC_TABLES);
}

/// Position of `channel` of `adc` in the interleaved regular DMA buffer.
///
/// Returns `None` when the channel is not part of that converter's regular
/// sequence.
pub fn regular_buffer_index(
    adc: Adc,
    channel: AdcChannel,
) -> Option<usize> {
    VOLLEY_ADC_TABLES
        .iter()
        .filter(|map| map.adc == adc && map.sequence == Sequence::Regular)
        .flat_map(|map| map.slots.iter())
        .find(|slot| slot.channel == channel)
        .map(|slot| (slot.rank.get() as usize - 1) * ADC_COUNT + adc as usize)
}
