//! # Addressable LED strip
//!
//! Pixels are stored as 32-bit words with 24 significant bits in wire
//! order (green, red, blue from bit 23 down). A [`TimingEngine`] clocks the
//! whole buffer out on [`LedStrip::write`].
//!
//! ## Colour packing
//!
//! | Input | Stored word |
//! | ----- | ----------- |
//! | `Rgb([r, g, b])` | `(r << 8) \| (g << 16) \| b` |
//! | `Hex(0xRRGGBB)` | red and green bytes swapped into the same layout |
//!
//! Reading back with [`unpack`] extracts `[r, g, b]` from a stored word.
//! [`hex_to_list`] applies that extraction to a raw integer without the
//! byte swap, so `hex_to_list(0xRRGGBB)` yields `[GG, RR, BB]`. Both paths
//! are kept as-is; see the tests for the exact behaviour.

use crate::robot::error::{PeripheralError, PeripheralResult};
use crate::robot::timing_engine::TimingEngine;

/// Largest packed hex colour.
pub const MAX_HEX: u32 = 0x00FF_FFFF;

/// A pixel colour as given by the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Color {
    /// Red, green, blue components
    Rgb([u8; 3]),
    /// `0xRRGGBB`
    Hex(u32),
}

impl Color {
    pub const OFF: Color = Color::Rgb([0, 0, 0]);
}

impl From<[u8; 3]> for Color {
    fn from(rgb: [u8; 3]) -> Self {
        Color::Rgb(rgb)
    }
}

impl From<u32> for Color {
    fn from(hex: u32) -> Self {
        Color::Hex(hex)
    }
}

impl TryFrom<&[u8]> for Color {
    type Error = PeripheralError;

    fn try_from(components: &[u8]) -> Result<Self, Self::Error> {
        let rgb: [u8; 3] = components
            .try_into()
            .map_err(|_| PeripheralError::InvalidArgument)?;
        Ok(Color::Rgb(rgb))
    }
}

/// Pack `[r, g, b]` into a stored word.
#[inline]
pub const fn pack_rgb(rgb: [u8; 3]) -> u32 {
    let [r, g, b] = rgb;
    ((r as u32) << 8) | ((g as u32) << 16) | (b as u32)
}

/// Pack `0xRRGGBB` into a stored word. Values above 24 bits are rejected.
#[inline]
pub fn pack_hex(hex: u32) -> PeripheralResult<u32> {
    if hex > MAX_HEX {
        return Err(PeripheralError::InvalidArgument);
    }
    Ok(swap_red_green(hex))
}

/// Pack either colour representation into a stored word.
pub fn pack(color: Color) -> PeripheralResult<u32> {
    match color {
        Color::Rgb(rgb) => Ok(pack_rgb(rgb)),
        Color::Hex(hex) => pack_hex(hex),
    }
}

/// Extract `[r, g, b]` from a stored word.
#[inline]
pub const fn unpack(word: u32) -> [u8; 3] {
    [(word >> 8) as u8, (word >> 16) as u8, word as u8]
}

/// Convert a stored word back to `0xRRGGBB`.
#[inline]
pub const fn word_to_hex(word: u32) -> u32 {
    swap_red_green(word & MAX_HEX)
}

/// Split a raw integer into components using the stored-word layout.
///
/// No byte swap is applied, so this is *not* the inverse of [`pack_hex`].
#[inline]
pub const fn hex_to_list(value: u32) -> [u8; 3] {
    unpack(value)
}

#[inline]
const fn swap_red_green(v: u32) -> u32 {
    ((v & 0xFF_0000) >> 8) | ((v & 0x00_FF00) << 8) | (v & 0x00_00FF)
}

/// Fixed-length buffer of stored pixel words; index 0 is the first LED on
/// the wire.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PixelBuffer<const N: usize> {
    words: [u32; N],
}

impl<const N: usize> PixelBuffer<N> {
    pub const fn new() -> Self {
        Self { words: [0; N] }
    }

    #[inline]
    pub const fn len(&self) -> usize {
        N
    }

    #[inline]
    pub const fn is_empty(&self) -> bool {
        N == 0
    }

    pub fn word(&self, index: usize) -> PeripheralResult<u32> {
        self.words
            .get(index)
            .copied()
            .ok_or(PeripheralError::InvalidArgument)
    }

    pub fn set_word(&mut self, index: usize, word: u32) -> PeripheralResult<()> {
        let slot = self
            .words
            .get_mut(index)
            .ok_or(PeripheralError::InvalidArgument)?;
        *slot = word;
        Ok(())
    }

    pub fn fill_word(&mut self, word: u32) {
        self.words.fill(word);
    }

    #[inline]
    pub fn as_words(&self) -> &[u32] {
        &self.words
    }
}

impl<const N: usize> Default for PixelBuffer<N> {
    fn default() -> Self {
        Self::new()
    }
}

/// WS2812 strip of `N` pixels on a timing engine.
pub struct LedStrip<E: TimingEngine, const N: usize> {
    engine: E,
    pixels: PixelBuffer<N>,
}

impl<E: TimingEngine, const N: usize> LedStrip<E, N> {
    /// Wrap an engine; all pixels start off and nothing is sent.
    pub fn new(engine: E) -> Self {
        Self {
            engine,
            pixels: PixelBuffer::new(),
        }
    }

    #[inline]
    pub const fn len(&self) -> usize {
        N
    }

    #[inline]
    pub const fn is_empty(&self) -> bool {
        N == 0
    }

    /// Pixel `index` as `[r, g, b]`.
    pub fn get(&self, index: usize) -> PeripheralResult<[u8; 3]> {
        self.pixels.word(index).map(unpack)
    }

    /// Pixel `index` as `0xRRGGBB`.
    pub fn get_hex(&self, index: usize) -> PeripheralResult<u32> {
        self.pixels.word(index).map(word_to_hex)
    }

    /// Set pixel `index` without flushing.
    pub fn set(&mut self, index: usize, color: impl Into<Color>) -> PeripheralResult<()> {
        let word = pack(color.into())?;
        self.pixels.set_word(index, word)
    }

    pub fn set_hex(&mut self, index: usize, hex: u32) -> PeripheralResult<()> {
        self.set(index, Color::Hex(hex))
    }

    /// Set every pixel without flushing.
    pub fn fill(&mut self, color: impl Into<Color>) -> PeripheralResult<()> {
        let word = pack(color.into())?;
        self.pixels.fill_word(word);
        Ok(())
    }

    /// Copy `colors` into the leading pixels; extra colours are ignored.
    pub fn set_frame(&mut self, colors: &[[u8; 3]]) {
        for (word, rgb) in self.pixels.words.iter_mut().zip(colors) {
            *word = pack_rgb(*rgb);
        }
    }

    /// Hand the whole buffer to the timing engine.
    ///
    /// Returns once the engine accepted the transfer. The buffer must not
    /// be changed for a new frame while the previous one is still draining.
    pub fn write(&mut self) -> PeripheralResult<()> {
        self.engine
            .put(self.pixels.as_words())
            .map_err(|_| PeripheralError::Engine)?;
        trace!("led strip flushed {} pixels", N);
        Ok(())
    }

    /// Fill every pixel with `color` and flush.
    pub fn write_all(&mut self, color: impl Into<Color>) -> PeripheralResult<()> {
        self.fill(color)?;
        self.write()
    }

    /// Turn every pixel off and flush.
    pub fn clear(&mut self) -> PeripheralResult<()> {
        self.write_all(Color::OFF)
    }

    #[inline]
    pub fn pixels(&self) -> &PixelBuffer<N> {
        &self.pixels
    }

    #[inline]
    pub fn as_words(&self) -> &[u32] {
        self.pixels.as_words()
    }

    pub fn free(self) -> E {
        self.engine
    }
}
