//! # WS2812 bit-timing program
//!
//! WS2812-class LEDs decode a single self-clocked line: every bit starts
//! high and the length of the high phase tells `0` from `1`. The bit cell is
//! generated by a three-delay state machine:
//!
//! ```text
//!            ┌──────────── one bit cell (T1 + T2 + T3) ───────────┐
//!  bit = 1   ▔▔▔▔ T1 ▔▔▔▔▔▔▔▔▔ T2 ▔▔▔▔▔▔▔▔▔▁▁▁▁▁▁ T3 ▁▁▁▁▁
//!  bit = 0   ▔▔▔▔ T1 ▔▔▔▔▁▁▁▁▁▁ T2 ▁▁▁▁▁▁▁▁▁▁▁▁▁▁▁ T3 ▁▁▁▁▁
//! ```
//!
//! The same program drives a PIO-like co-processor (consume the words, run
//! the states) or a pulse-code peripheral such as the ESP32 RMT (compile each
//! bit into one high/low pulse pair with [`Ws2812Program::encode_word`]).

/// Engine that clocks pixel words onto the data line.
///
/// Each word carries 24 significant bits in its low bits, sent MSB first.
/// `put` returns once the engine has accepted the words; transmission may
/// still be in progress.
pub trait TimingEngine {
    type Error;

    fn put(&mut self, words: &[u32]) -> Result<(), Self::Error>;
}

/// Bits shifted out per pixel word.
pub const BITS_PER_WORD: u32 = 24;

/// Minimum low time that latches the frame into the LEDs.
pub const RESET_NS: u32 = 50_000;

/// Datasheet nominal phase lengths and tolerance, in nanoseconds.
pub mod ws2812 {
    pub const T0H_NS: u32 = 400;
    pub const T0L_NS: u32 = 850;
    pub const T1H_NS: u32 = 800;
    pub const T1L_NS: u32 = 450;
    pub const TOLERANCE_NS: u32 = 150;
}

/// One state of the bit-cell machine and the level it drives.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum EngineState {
    /// Shift the next bit out of the word while holding low for T3
    FetchBit,
    /// Drive high for T1 and branch on the fetched bit
    BranchOnBit,
    /// Bit is 1: stay high for T2
    EmitOne,
    /// Bit is 0: drop low for T2
    EmitZero,
}

impl EngineState {
    /// Output level while in this state.
    pub fn level(self) -> bool {
        matches!(self, EngineState::BranchOnBit | EngineState::EmitOne)
    }

    /// State that follows this one for `bit`.
    pub fn next(self, bit: bool) -> EngineState {
        match self {
            EngineState::FetchBit => EngineState::BranchOnBit,
            EngineState::BranchOnBit if bit => EngineState::EmitOne,
            EngineState::BranchOnBit => EngineState::EmitZero,
            EngineState::EmitOne | EngineState::EmitZero => EngineState::FetchBit,
        }
    }
}

/// High/low lengths of a decoded bit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct BitTiming {
    pub t0h: u32,
    pub t0l: u32,
    pub t1h: u32,
    pub t1l: u32,
}

impl BitTiming {
    /// Pulse pair for one bit.
    #[inline]
    pub fn pulse(&self, bit: bool) -> BitPulse {
        if bit {
            BitPulse {
                high: self.t1h,
                low: self.t1l,
            }
        } else {
            BitPulse {
                high: self.t0h,
                low: self.t0l,
            }
        }
    }
}

/// One bit as a high phase followed by a low phase, in engine ticks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct BitPulse {
    pub high: u32,
    pub low: u32,
}

/// Cycle counts of the three delays plus the engine clock they run at.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Ws2812Program {
    pub t1: u32,
    pub t2: u32,
    pub t3: u32,
    pub clock_hz: u32,
}

impl Ws2812Program {
    /// 8/8/9 cycles at 20 MHz: exactly 400/850 ns and 800/450 ns.
    pub const NOMINAL: Ws2812Program = Ws2812Program {
        t1: 8,
        t2: 8,
        t3: 9,
        clock_hz: 20_000_000,
    };

    /// 2/5/3 cycles at 8 MHz, the classic co-processor program. T0H and T0L
    /// sit on the edge of the tolerance window.
    pub const LEGACY_8MHZ: Ws2812Program = Ws2812Program {
        t1: 2,
        t2: 5,
        t3: 3,
        clock_hz: 8_000_000,
    };

    /// Cycles spent in `state`.
    pub fn cycles(&self, state: EngineState) -> u32 {
        match state {
            EngineState::FetchBit => self.t3,
            EngineState::BranchOnBit => self.t1,
            EngineState::EmitOne | EngineState::EmitZero => self.t2,
        }
    }

    /// Bit lengths in engine cycles.
    pub fn cycle_timing(&self) -> BitTiming {
        BitTiming {
            t0h: self.t1,
            t0l: self.t2 + self.t3,
            t1h: self.t1 + self.t2,
            t1l: self.t3,
        }
    }

    /// Bit lengths in nanoseconds.
    pub fn bit_timing(&self) -> BitTiming {
        self.compile(1_000_000_000)
    }

    /// Translate the program into ticks of another clock, rounding to the
    /// nearest tick.
    pub fn compile(&self, tick_hz: u32) -> BitTiming {
        let c = self.cycle_timing();
        let scale = |cycles: u32| -> u32 {
            let num = u64::from(cycles) * u64::from(tick_hz);
            let den = u64::from(self.clock_hz);
            ((num + den / 2) / den) as u32
        };
        BitTiming {
            t0h: scale(c.t0h),
            t0l: scale(c.t0l),
            t1h: scale(c.t1h),
            t1l: scale(c.t1l),
        }
    }

    /// Length of one bit cell in nanoseconds.
    pub fn bit_period_ns(&self) -> u32 {
        let cycles = u64::from(self.t1 + self.t2 + self.t3);
        (cycles * 1_000_000_000 / u64::from(self.clock_hz)) as u32
    }

    /// Whether every phase lands within the datasheet window.
    pub fn within_ws2812_tolerance(&self) -> bool {
        let t = self.bit_timing();
        let ok = |actual: u32, nominal: u32| actual.abs_diff(nominal) <= ws2812::TOLERANCE_NS;
        ok(t.t0h, ws2812::T0H_NS)
            && ok(t.t0l, ws2812::T0L_NS)
            && ok(t.t1h, ws2812::T1H_NS)
            && ok(t.t1l, ws2812::T1L_NS)
    }

    /// Low time that latches a frame, in ticks of `tick_hz`, rounded up so
    /// the gap is never shorter than [`RESET_NS`].
    pub fn reset_ticks(tick_hz: u32) -> u32 {
        (u64::from(RESET_NS) * u64::from(tick_hz)).div_ceil(1_000_000_000) as u32
    }

    /// Run the state machine over the 24 significant bits of `word`, MSB
    /// first, yielding one pulse per bit in ticks of `timing`.
    pub fn encode_word(word: u32, timing: BitTiming) -> impl Iterator<Item = BitPulse> {
        (0..BITS_PER_WORD)
            .rev()
            .map(move |bit| timing.pulse(word & (1 << bit) != 0))
    }

    /// Walk the state machine for one bit and return the `(level, cycles)`
    /// segments it emits, starting from [`EngineState::FetchBit`].
    pub fn trace_bit(&self, bit: bool) -> [(bool, u32); 3] {
        let mut state = EngineState::FetchBit;
        let mut out = [(false, 0); 3];
        for slot in out.iter_mut() {
            *slot = (state.level(), self.cycles(state));
            state = state.next(bit);
        }
        out
    }
}

impl Default for Ws2812Program {
    fn default() -> Self {
        Self::NOMINAL
    }
}
