//! HC-SR04 style ultrasonic ranger.
//!
//! A 10 µs trigger pulse starts a measurement; the sensor answers with an
//! echo pulse whose high time is the round-trip time of flight.

use embedded_hal::delay::DelayNs;
use embedded_hal::digital::{InputPin, OutputPin};

use crate::robot::error::{PeripheralError, PeripheralResult};
use crate::utils::config::RangerConfig;

/// Free-running microsecond clock.
pub trait Monotonic {
    fn now_us(&self) -> u64;
}

/// Blocking measurement of one high pulse on the echo line.
pub trait EchoTimer {
    type Error;

    /// Wait for the line to be low, then for a rise, then time how long it
    /// stays high. A pulse already in progress when the call starts is never
    /// measured.
    ///
    /// Returns `Ok(None)` when the whole measurement does not finish within
    /// `timeout_us` of the call.
    fn high_pulse_us(&mut self, timeout_us: u32) -> Result<Option<u32>, Self::Error>;
}

/// [`EchoTimer`] that busy-polls an input pin against a [`Monotonic`] clock.
pub struct PolledEchoTimer<P, M> {
    pin: P,
    clock: M,
}

impl<P, M> PolledEchoTimer<P, M>
where
    P: InputPin,
    M: Monotonic,
{
    pub fn new(pin: P, clock: M) -> Self {
        Self { pin, clock }
    }

    /// Poll until the pin reads `level` or the deadline passes. Returns the
    /// timestamp of the transition.
    fn wait_for(&mut self, level: bool, deadline: u64) -> Result<Option<u64>, P::Error> {
        loop {
            let now = self.clock.now_us();
            if self.pin.is_high()? == level {
                return Ok(Some(now));
            }
            if now >= deadline {
                return Ok(None);
            }
        }
    }

    pub fn free(self) -> (P, M) {
        (self.pin, self.clock)
    }
}

impl<P, M> EchoTimer for PolledEchoTimer<P, M>
where
    P: InputPin,
    M: Monotonic,
{
    type Error = P::Error;

    fn high_pulse_us(&mut self, timeout_us: u32) -> Result<Option<u32>, Self::Error> {
        let deadline = self.clock.now_us() + u64::from(timeout_us);

        // a previous echo may still be draining
        if self.wait_for(false, deadline)?.is_none() {
            return Ok(None);
        }
        let Some(rise) = self.wait_for(true, deadline)? else {
            return Ok(None);
        };
        let Some(fall) = self.wait_for(false, deadline)? else {
            return Ok(None);
        };

        Ok(Some((fall - rise).min(u64::from(u32::MAX)) as u32))
    }
}

/// Ultrasonic distance sensor.
pub struct UltrasonicRanger<T, E, D>
where
    T: OutputPin,
    E: EchoTimer,
    D: DelayNs,
{
    trigger: T,
    echo: E,
    delay: D,
    config: RangerConfig,
}

impl<T, E, D> UltrasonicRanger<T, E, D>
where
    T: OutputPin,
    E: EchoTimer,
    D: DelayNs,
{
    /// Create a ranger with the trigger line held low.
    pub fn new(mut trigger: T, echo: E, delay: D, config: RangerConfig) -> PeripheralResult<Self> {
        trigger.set_low().map_err(|_| PeripheralError::Gpio)?;
        Ok(Self {
            trigger,
            echo,
            delay,
            config,
        })
    }

    fn pulse(&mut self) -> PeripheralResult<()> {
        self.trigger.set_high().map_err(|_| PeripheralError::Gpio)?;
        self.delay.delay_us(self.config.trigger_pulse_us);
        self.trigger.set_low().map_err(|_| PeripheralError::Gpio)?;
        Ok(())
    }

    /// Run one trigger/echo round and return the distance in centimetres.
    ///
    /// Blocks for up to the echo timeout. A missing or zero-width echo is
    /// reported as [`PeripheralError::Timeout`]; there is no retry.
    pub fn get_distance(&mut self) -> PeripheralResult<f32> {
        self.pulse()?;

        let width = self
            .echo
            .high_pulse_us(self.config.echo_timeout_us)
            .map_err(|_| PeripheralError::Gpio)?;

        match width {
            Some(us) if us > 0 => Ok(self.distance_cm(us)),
            _ => {
                warn!("no echo within {} us", self.config.echo_timeout_us);
                Err(PeripheralError::Timeout)
            }
        }
    }

    /// Convert a round-trip echo width to a one-way distance in centimetres.
    pub fn distance_cm(&self, pulse_us: u32) -> f32 {
        let seconds = pulse_us as f32 / 1_000_000.0;
        seconds / 2.0 * self.config.speed_of_sound_m_s * 100.0
    }

    #[inline]
    pub fn config(&self) -> &RangerConfig {
        &self.config
    }

    pub fn free(self) -> (T, E, D) {
        (self.trigger, self.echo, self.delay)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::robot::mock::{MockClock, MockDelay, MockInput, MockOutput};

    impl Monotonic for MockClock {
        fn now_us(&self) -> u64 {
            self.now()
        }
    }

    /// Echo timer that hands back a scripted result.
    struct FixedEcho(Option<u32>);

    impl EchoTimer for FixedEcho {
        type Error = core::convert::Infallible;

        fn high_pulse_us(&mut self, _timeout_us: u32) -> Result<Option<u32>, Self::Error> {
            Ok(self.0)
        }
    }

    fn ranger(echo: Option<u32>) -> (UltrasonicRanger<MockOutput, FixedEcho, MockDelay>, MockOutput, MockDelay) {
        let trig = MockOutput::default();
        let delay = MockDelay::default();
        let ranger =
            UltrasonicRanger::new(trig.clone(), FixedEcho(echo), delay.clone(), RangerConfig::default()).unwrap();
        (ranger, trig, delay)
    }

    #[test]
    fn test_trigger_pulse_shape() {
        let (mut ranger, trig, delay) = ranger(Some(1_000));
        ranger.get_distance().unwrap();
        // construction low, then high/low around a 10 us delay
        assert_eq!(trig.history(), [false, true, false]);
        assert_eq!(delay.total_ns(), 10_000);
    }

    #[test]
    fn test_distance_from_echo_width() {
        let (mut ranger, _, _) = ranger(Some(1_000));
        let d = ranger.get_distance().unwrap();
        // 1 ms round trip at 340 m/s is 17 cm one way
        assert!((d - 17.0).abs() < 1e-3, "{d}");
    }

    #[test]
    fn test_missing_echo_times_out() {
        let (mut ranger, _, _) = ranger(None);
        assert_eq!(ranger.get_distance(), Err(PeripheralError::Timeout));
    }

    #[test]
    fn test_zero_width_echo_is_not_a_distance() {
        let (mut ranger, _, _) = ranger(Some(0));
        assert_eq!(ranger.get_distance(), Err(PeripheralError::Timeout));
    }

    #[test]
    fn test_polled_timer_measures_high_time() {
        let clock = MockClock::default();
        // 5 us per read: 3 low reads, 40 high reads
        let pin = MockInput::pulse(clock.clone(), 5, 3, 40);
        let mut timer = PolledEchoTimer::new(pin, clock);
        assert_eq!(timer.high_pulse_us(30_000), Ok(Some(200)));
    }

    #[test]
    fn test_polled_timer_times_out_without_rise() {
        let clock = MockClock::default();
        let pin = MockInput::new(clock.clone(), 10, &[false]);
        let mut timer = PolledEchoTimer::new(pin, clock.clone());
        assert_eq!(timer.high_pulse_us(1_000), Ok(None));
        assert!(clock.now() >= 1_000);
    }

    #[test]
    fn test_polled_timer_times_out_on_stuck_high() {
        let clock = MockClock::default();
        let pin = MockInput::new(clock.clone(), 10, &[false, true]);
        let mut timer = PolledEchoTimer::new(pin, clock);
        assert_eq!(timer.high_pulse_us(500), Ok(None));
    }

    #[test]
    fn test_polled_timer_skips_pulse_in_progress() {
        let clock = MockClock::default();
        // tail of an earlier echo, then nothing
        let pin = MockInput::new(clock.clone(), 10, &[true, true, true, false]);
        let mut timer = PolledEchoTimer::new(pin, clock);
        assert_eq!(timer.high_pulse_us(30_000), Ok(None));
    }

    #[test]
    fn test_polled_timer_measures_pulse_after_stale_tail() {
        let clock = MockClock::default();
        let mut script = std::vec![true, true, false];
        script.extend([true; 10]);
        script.push(false);
        let pin = MockInput::new(clock.clone(), 10, &script);
        let mut timer = PolledEchoTimer::new(pin, clock);
        assert_eq!(timer.high_pulse_us(30_000), Ok(Some(100)));
    }

    #[test]
    fn test_polled_timer_single_deadline() {
        let clock = MockClock::default();
        // 600 us before the rise and 600 us high: each phase fits, the sum does not
        let pin = MockInput::pulse(clock.clone(), 10, 60, 60);
        let mut timer = PolledEchoTimer::new(pin, clock.clone());
        assert_eq!(timer.high_pulse_us(1_000), Ok(None));
        assert!(clock.now() <= 1_010, "{}", clock.now());
    }

    #[test]
    fn test_ranger_rejects_partial_echo() {
        let clock = MockClock::default();
        let pin = MockInput::new(clock.clone(), 10, &[true, true, true, false]);
        let echo = PolledEchoTimer::new(pin, clock);
        let mut ranger =
            UltrasonicRanger::new(MockOutput::default(), echo, MockDelay::default(), RangerConfig::default()).unwrap();
        assert_eq!(ranger.get_distance(), Err(PeripheralError::Timeout));
    }

    #[test]
    fn test_ranger_over_polled_timer() {
        let clock = MockClock::default();
        // 1160 us high at 10 us per read
        let pin = MockInput::pulse(clock.clone(), 10, 2, 116);
        let echo = PolledEchoTimer::new(pin, clock);
        let mut ranger =
            UltrasonicRanger::new(MockOutput::default(), echo, MockDelay::default(), RangerConfig::default()).unwrap();
        let d = ranger.get_distance().unwrap();
        assert!((d - 19.72).abs() < 1e-3, "{d}");
    }
}
