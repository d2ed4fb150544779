//! Host-side stand-ins for the platform traits.

use core::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::rc::Rc;
use std::vec::Vec;

use embedded_hal::delay::DelayNs;
use embedded_hal::digital::{self, ErrorType as DigitalErrorType, InputPin, OutputPin};
use embedded_hal::pwm::{self, ErrorType as PwmErrorType, SetDutyCycle};

/// PWM channel whose last duty is observable through a shared probe.
#[derive(Clone)]
pub struct MockPwm {
    duty: Rc<Cell<u16>>,
    max: u16,
    fail: Rc<Cell<bool>>,
}

impl MockPwm {
    pub fn new(max: u16) -> Self {
        Self {
            duty: Rc::new(Cell::new(0)),
            max,
            fail: Rc::new(Cell::new(false)),
        }
    }

    pub fn duty(&self) -> u16 {
        self.duty.get()
    }

    pub fn set_failing(&self, fail: bool) {
        self.fail.set(fail);
    }
}

impl PwmErrorType for MockPwm {
    type Error = pwm::ErrorKind;
}

impl SetDutyCycle for MockPwm {
    fn max_duty_cycle(&self) -> u16 {
        self.max
    }

    fn set_duty_cycle(&mut self, duty: u16) -> Result<(), Self::Error> {
        if self.fail.get() {
            return Err(pwm::ErrorKind::Other);
        }
        self.duty.set(duty);
        Ok(())
    }
}

/// Output pin recording every level it was driven to.
#[derive(Clone, Default)]
pub struct MockOutput {
    levels: Rc<RefCell<Vec<bool>>>,
}

impl MockOutput {
    pub fn history(&self) -> Vec<bool> {
        self.levels.borrow().clone()
    }
}

impl DigitalErrorType for MockOutput {
    type Error = digital::ErrorKind;
}

impl OutputPin for MockOutput {
    fn set_low(&mut self) -> Result<(), Self::Error> {
        self.levels.borrow_mut().push(false);
        Ok(())
    }

    fn set_high(&mut self) -> Result<(), Self::Error> {
        self.levels.borrow_mut().push(true);
        Ok(())
    }
}

/// Microsecond clock advanced explicitly by the test or by [`MockInput`].
#[derive(Clone, Default)]
pub struct MockClock {
    now_us: Rc<Cell<u64>>,
}

impl MockClock {
    pub fn advance(&self, us: u64) {
        self.now_us.set(self.now_us.get() + us);
    }

    pub fn now(&self) -> u64 {
        self.now_us.get()
    }
}

/// Input pin replaying a level script, one entry per read. Every read
/// advances the shared clock by `step_us`; once the script runs out the
/// last level holds.
#[derive(Clone)]
pub struct MockInput {
    script: Rc<RefCell<VecDeque<bool>>>,
    last: Rc<Cell<bool>>,
    clock: MockClock,
    step_us: u64,
}

impl MockInput {
    pub fn new(clock: MockClock, step_us: u64, script: &[bool]) -> Self {
        Self {
            script: Rc::new(RefCell::new(script.iter().copied().collect())),
            last: Rc::new(Cell::new(false)),
            clock,
            step_us,
        }
    }

    /// Low for `lead` reads, high for `width` reads, then low.
    pub fn pulse(clock: MockClock, step_us: u64, lead: usize, width: usize) -> Self {
        let mut script = std::vec![false; lead];
        script.extend(std::iter::repeat(true).take(width));
        script.push(false);
        Self::new(clock, step_us, &script)
    }

    fn next_level(&mut self) -> bool {
        self.clock.advance(self.step_us);
        if let Some(level) = self.script.borrow_mut().pop_front() {
            self.last.set(level);
        }
        self.last.get()
    }
}

impl DigitalErrorType for MockInput {
    type Error = digital::ErrorKind;
}

impl InputPin for MockInput {
    fn is_high(&mut self) -> Result<bool, Self::Error> {
        Ok(self.next_level())
    }

    fn is_low(&mut self) -> Result<bool, Self::Error> {
        Ok(!self.next_level())
    }
}

/// Delay that only accumulates the requested time.
#[derive(Clone, Default)]
pub struct MockDelay {
    total_ns: Rc<Cell<u64>>,
}

impl MockDelay {
    pub fn total_ns(&self) -> u64 {
        self.total_ns.get()
    }
}

impl DelayNs for MockDelay {
    fn delay_ns(&mut self, ns: u32) {
        self.total_ns.set(self.total_ns.get() + u64::from(ns));
    }
}

/// Timing engine that keeps every accepted frame.
#[derive(Clone, Default)]
pub struct MockEngine {
    frames: Rc<RefCell<Vec<Vec<u32>>>>,
    reject: Rc<Cell<bool>>,
}

impl MockEngine {
    pub fn frames(&self) -> Vec<Vec<u32>> {
        self.frames.borrow().clone()
    }

    pub fn last_frame(&self) -> Option<Vec<u32>> {
        self.frames.borrow().last().cloned()
    }

    pub fn set_rejecting(&self, reject: bool) {
        self.reject.set(reject);
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EngineBusy;

impl crate::robot::timing_engine::TimingEngine for MockEngine {
    type Error = EngineBusy;

    fn put(&mut self, words: &[u32]) -> Result<(), Self::Error> {
        if self.reject.get() {
            return Err(EngineBusy);
        }
        self.frames.borrow_mut().push(words.to_vec());
        Ok(())
    }
}
