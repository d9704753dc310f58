//! # Bitplane Decoding
//!
//! Turns raw ROM bytes into a flat sequence of palette indices.
//!
//! A [`PixelPlaneLayout`] describes one chunk of the bit stream: every bit position names the
//! pixel (channel) it belongs to and the weight it adds to that pixel's palette index when set.
//! Planar formats (Game Boy 2bpp, SNES 4bpp) and packed formats (NDS 4bpp nibbles) are both
//! expressed this way, only the order of the pairs differs.

use std::fmt;

use log::debug;
use serde::Serialize;

use crate::error::{BitmapError, Result};

/// Name of the pixel a layout bit contributes to. Channels are emitted in ascending order.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(transparent)]
pub struct ChannelId(String);

impl ChannelId {
    pub fn new(name: impl Into<String>) -> Self {
        ChannelId(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for ChannelId {
    fn from(name: &str) -> Self {
        ChannelId(name.to_string())
    }
}

impl From<String> for ChannelId {
    fn from(name: String) -> Self {
        ChannelId(name)
    }
}

impl fmt::Display for ChannelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// One bit position of a chunk
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct PlaneBit {
    pub channel: ChannelId,
    pub weight: u32,
}

/// Ordered bit layout of one decode chunk
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct PixelPlaneLayout {
    bits: Vec<PlaneBit>,
}

impl PixelPlaneLayout {
    pub fn new(bits: Vec<PlaneBit>) -> Self {
        PixelPlaneLayout { bits }
    }

    /// Build a layout from `(channel, weight)` pairs, e.g. `[("a", 1), ("b", 1), ("a", 2)]`
    pub fn from_pairs<I, C>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (C, u32)>,
        C: Into<ChannelId>,
    {
        PixelPlaneLayout {
            bits: pairs
                .into_iter()
                .map(|(channel, weight)| PlaneBit {
                    channel: channel.into(),
                    weight,
                })
                .collect(),
        }
    }

    pub fn bits(&self) -> &[PlaneBit] {
        &self.bits
    }

    /// Number of bits consumed per chunk
    pub fn len(&self) -> usize {
        self.bits.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bits.is_empty()
    }

    /// Distinct channels in emission order
    pub fn channels(&self) -> Vec<&ChannelId> {
        let mut channels: Vec<&ChannelId> = self.bits.iter().map(|b| &b.channel).collect();
        channels.sort();
        channels.dedup();
        channels
    }
}

/// Per-bit accumulator slot, resolved once before the bit stream is walked
struct ChunkPlan {
    slots: Vec<usize>,
    weights: Vec<u32>,
    channel_count: usize,
}

impl ChunkPlan {
    fn new(layout: &PixelPlaneLayout) -> Result<Self> {
        if layout.is_empty() {
            return Err(BitmapError::InvalidLayout(
                "pixel format declares no bits".to_string(),
            ));
        }

        let channels = layout.channels();
        let mut totals = vec![0u64; channels.len()];
        let mut slots = Vec::with_capacity(layout.len());
        let mut weights = Vec::with_capacity(layout.len());

        for (position, bit) in layout.bits().iter().enumerate() {
            if bit.weight == 0 {
                return Err(BitmapError::InvalidLayout(format!(
                    "bit {} of channel '{}' has zero weight",
                    position, bit.channel
                )));
            }
            // Channels come from the layout itself, so the search always succeeds
            let slot = channels
                .binary_search(&&bit.channel)
                .map_err(|_| BitmapError::InvalidLayout(format!("unknown channel '{}'", bit.channel)))?;
            totals[slot] += bit.weight as u64;
            slots.push(slot);
            weights.push(bit.weight);
        }

        if let Some(slot) = totals.iter().position(|&t| t > u32::MAX as u64) {
            return Err(BitmapError::InvalidLayout(format!(
                "weights of channel '{}' overflow a palette index",
                channels[slot]
            )));
        }

        Ok(ChunkPlan {
            slots,
            weights,
            channel_count: channels.len(),
        })
    }
}

#[inline]
fn bit_at(bytes: &[u8], position: usize) -> bool {
    (bytes[position / 8] >> (7 - position % 8)) & 1 == 1
}

/// Decode `bytes` into palette indices, one per distinct channel per complete chunk.
///
/// Bits are read most significant first. A trailing partial chunk is dropped.
pub fn decode(bytes: &[u8], layout: &PixelPlaneLayout) -> Result<Vec<u32>> {
    let plan = ChunkPlan::new(layout)?;
    let chunk_bits = layout.len();
    let total_bits = bytes.len() * 8;
    let chunk_count = total_bits / chunk_bits;

    let mut indexes = Vec::with_capacity(chunk_count * plan.channel_count);
    let mut accumulators = vec![0u32; plan.channel_count];

    for chunk in 0..chunk_count {
        accumulators.fill(0);
        let base = chunk * chunk_bits;
        for (offset, (&slot, &weight)) in plan.slots.iter().zip(&plan.weights).enumerate() {
            if bit_at(bytes, base + offset) {
                accumulators[slot] += weight;
            }
        }
        indexes.extend_from_slice(&accumulators);
    }

    let dropped = total_bits - chunk_count * chunk_bits;
    if dropped > 0 {
        debug!("discarding {} trailing bits after {} chunks", dropped, chunk_count);
    }
    debug!(
        "decoded {} palette indexes from {} bytes ({} bits per chunk)",
        indexes.len(),
        bytes.len(),
        chunk_bits
    );

    Ok(indexes)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accumulates_weights_per_channel() {
        let layout = PixelPlaneLayout::from_pairs([("a", 1), ("a", 2), ("b", 4)]);
        // chunks 111 and 101, then two bits that never complete a chunk
        let indexes = decode(&[0b1111_0100], &layout).unwrap();
        assert_eq!(indexes, vec![3, 4, 1, 4]);
    }

    #[test]
    fn emits_channels_in_ascending_order() {
        let layout = PixelPlaneLayout::from_pairs([("b", 1), ("a", 1)]);
        let indexes = decode(&[0b1000_0000], &layout).unwrap();
        assert_eq!(&indexes[..2], &[0, 1]);
        assert_eq!(indexes.len(), 8);
    }

    #[test]
    fn discards_trailing_partial_chunk() {
        // 10-bit chunks over 32 bits: 3 full chunks and 2 leftover bits
        let layout = PixelPlaneLayout::from_pairs(
            [1, 2, 4, 8, 16]
                .into_iter()
                .map(|w| ("a", w))
                .chain([1, 2, 4, 8, 16].into_iter().map(|w| ("b", w))),
        );
        let indexes = decode(&[0xFF, 0xFF, 0xFF, 0xFF], &layout).unwrap();
        assert_eq!(indexes, vec![31, 31, 31, 31, 31, 31]);
    }

    #[test]
    fn decodes_game_boy_planar_row() {
        // One 8-pixel row of a 2bpp tile: low plane byte, then high plane byte
        let names = ["a", "b", "c", "d", "e", "f", "g", "h"];
        let layout = PixelPlaneLayout::from_pairs(
            names
                .iter()
                .map(|&n| (n, 1))
                .chain(names.iter().map(|&n| (n, 2))),
        );
        let indexes = decode(&[0x3C, 0x7E], &layout).unwrap();
        assert_eq!(indexes, vec![0, 2, 3, 3, 3, 3, 2, 0]);
    }

    #[test]
    fn decodes_packed_nibbles_low_pixel_first() {
        // NDS 4bpp: low nibble is the left pixel
        let layout = PixelPlaneLayout::from_pairs([
            ("b", 8),
            ("b", 4),
            ("b", 2),
            ("b", 1),
            ("a", 8),
            ("a", 4),
            ("a", 2),
            ("a", 1),
        ]);
        let indexes = decode(&[0x21, 0xF0], &layout).unwrap();
        assert_eq!(indexes, vec![1, 2, 0, 15]);
    }

    #[test]
    fn rejects_empty_layout() {
        let err = decode(&[0xAA], &PixelPlaneLayout::default()).unwrap_err();
        assert!(matches!(err, BitmapError::InvalidLayout(_)));
    }

    #[test]
    fn rejects_zero_weight() {
        let layout = PixelPlaneLayout::from_pairs([("a", 1), ("a", 0)]);
        assert!(matches!(
            decode(&[0xAA], &layout),
            Err(BitmapError::InvalidLayout(_))
        ));
    }

    #[test]
    fn empty_input_decodes_to_nothing() {
        let layout = PixelPlaneLayout::from_pairs([("a", 1)]);
        assert!(decode(&[], &layout).unwrap().is_empty());
    }
}
