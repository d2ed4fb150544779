//! # Two-channel PWM motor driver
//!
//! Drives one DC motor through a pair of PWM outputs (IN1/IN2 style H-bridge
//! inputs such as the DRV8833 or L9110). Direction is chosen by which of the
//! two channels carries the duty; the other one is held at zero.

use embedded_hal::pwm::SetDutyCycle;

use crate::robot::error::{PeripheralError, PeripheralResult};
use crate::utils::config::{MotorConfig, Polarity, DUTY_SCALE};
use crate::utils::math::round2;

/// Largest raw duty magnitude accepted by [`MotorDriver::set_value`].
pub const MAX_RAW_VALUE: i32 = DUTY_SCALE as i32;

/// Largest power magnitude accepted by [`MotorDriver::set_power`], in percent.
pub const MAX_POWER: f32 = 100.0;

/// Which channel currently carries the duty.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum MotorDirection {
    /// Both channels low
    Stopped,
    /// Duty on channel B
    Forward,
    /// Duty on channel A
    Backward,
}

/// Single motor on two PWM channels.
#[derive(Debug)]
pub struct MotorDriver<A, B>
where
    A: SetDutyCycle,
    B: SetDutyCycle,
{
    pwm_a: A,
    pwm_b: B,
    polarity: Polarity,
    value: i32,
    power: f32,
    direction: MotorDirection,
}

impl<A, B> MotorDriver<A, B>
where
    A: SetDutyCycle,
    B: SetDutyCycle,
{
    /// Create a motor driver and drive both channels low.
    pub fn new(mut pwm_a: A, mut pwm_b: B, config: MotorConfig) -> PeripheralResult<Self> {
        pwm_a.set_duty_cycle_fully_off().map_err(|_| PeripheralError::Pwm)?;
        pwm_b.set_duty_cycle_fully_off().map_err(|_| PeripheralError::Pwm)?;

        Ok(MotorDriver {
            pwm_a,
            pwm_b,
            polarity: config.polarity,
            value: 0,
            power: 0.0,
            direction: MotorDirection::Stopped,
        })
    }

    /// Set the motor effort in percent (`-100.0..=100.0`).
    ///
    /// Out-of-range values are clamped. The raw value is the truncated
    /// fraction of full-scale duty.
    pub fn set_power(&mut self, power: f32) -> PeripheralResult<()> {
        if !power.is_finite() {
            return Err(PeripheralError::InvalidArgument);
        }
        let power = power.clamp(-MAX_POWER, MAX_POWER);
        let value = (power / MAX_POWER * DUTY_SCALE as f32) as i32;
        self.set_value(value)
    }

    /// Set the raw signed duty (`-0xFFFF..=0xFFFF`), clamping out-of-range values.
    pub fn set_value(&mut self, value: i32) -> PeripheralResult<()> {
        let value = value.clamp(-MAX_RAW_VALUE, MAX_RAW_VALUE);
        let duty = value.unsigned_abs() as u16;
        let direction = match value.signum() * self.polarity.sign() {
            1 => MotorDirection::Forward,
            -1 => MotorDirection::Backward,
            _ => MotorDirection::Stopped,
        };

        match direction {
            MotorDirection::Forward => {
                self.pwm_a.set_duty_cycle_fully_off().map_err(|_| PeripheralError::Pwm)?;
                self.pwm_b
                    .set_duty_cycle_fraction(duty, DUTY_SCALE)
                    .map_err(|_| PeripheralError::Pwm)?;
            }
            MotorDirection::Backward => {
                self.pwm_b.set_duty_cycle_fully_off().map_err(|_| PeripheralError::Pwm)?;
                self.pwm_a
                    .set_duty_cycle_fraction(duty, DUTY_SCALE)
                    .map_err(|_| PeripheralError::Pwm)?;
            }
            MotorDirection::Stopped => {
                self.pwm_a.set_duty_cycle_fully_off().map_err(|_| PeripheralError::Pwm)?;
                self.pwm_b.set_duty_cycle_fully_off().map_err(|_| PeripheralError::Pwm)?;
            }
        }

        if direction != self.direction {
            debug!("motor direction {:?} -> {:?}", self.direction, direction);
        }

        self.value = value;
        self.power = round2(value as f32 / DUTY_SCALE as f32 * MAX_POWER);
        self.direction = direction;
        Ok(())
    }

    /// Drive both channels low.
    pub fn stop(&mut self) -> PeripheralResult<()> {
        self.set_value(0)
    }

    /// Last commanded power in percent, rounded to two decimals.
    #[inline]
    pub fn power(&self) -> f32 {
        self.power
    }

    /// Last commanded raw duty, after clamping.
    #[inline]
    pub fn value(&self) -> i32 {
        self.value
    }

    #[inline]
    pub fn direction(&self) -> MotorDirection {
        self.direction
    }

    #[inline]
    pub fn polarity(&self) -> Polarity {
        self.polarity
    }

    /// Release the PWM channels.
    pub fn free(self) -> (A, B) {
        (self.pwm_a, self.pwm_b)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::robot::mock::MockPwm;

    fn motor(polarity: Polarity) -> (MotorDriver<MockPwm, MockPwm>, MockPwm, MockPwm) {
        let a = MockPwm::new(0xFFFF);
        let b = MockPwm::new(0xFFFF);
        let config = MotorConfig {
            polarity,
            ..MotorConfig::default()
        };
        let driver = MotorDriver::new(a.clone(), b.clone(), config).unwrap();
        (driver, a, b)
    }

    #[test]
    fn test_zero_drives_both_low() {
        let (mut driver, a, b) = motor(Polarity::Normal);
        driver.set_value(40_000).unwrap();
        driver.set_value(0).unwrap();
        assert_eq!((a.duty(), b.duty()), (0, 0));
        assert_eq!(driver.direction(), MotorDirection::Stopped);

        driver.set_value(-40_000).unwrap();
        driver.set_value(0).unwrap();
        assert_eq!((a.duty(), b.duty()), (0, 0));
    }

    #[test]
    fn test_full_scale_uses_one_channel() {
        let (mut driver, a, b) = motor(Polarity::Normal);
        driver.set_value(MAX_RAW_VALUE).unwrap();
        assert_eq!((a.duty(), b.duty()), (0, 0xFFFF));

        let (mut driver, a, b) = motor(Polarity::Inverted);
        driver.set_value(MAX_RAW_VALUE).unwrap();
        assert_eq!((a.duty(), b.duty()), (0xFFFF, 0));
    }

    #[test]
    fn test_out_of_range_is_clamped() {
        let (mut driver, a, b) = motor(Polarity::Normal);
        driver.set_value(1_000_000).unwrap();
        assert_eq!(driver.value(), MAX_RAW_VALUE);
        assert_eq!((a.duty(), b.duty()), (0, 0xFFFF));

        driver.set_power(-250.0).unwrap();
        assert_eq!(driver.value(), -MAX_RAW_VALUE);
        assert_eq!(driver.power(), -100.0);
        assert_eq!((a.duty(), b.duty()), (0xFFFF, 0));
    }

    #[test]
    fn test_power_and_value_stay_linked() {
        let (mut driver, _, b) = motor(Polarity::Normal);
        driver.set_power(50.0).unwrap();
        assert_eq!(driver.value(), 32_767);
        assert_eq!(driver.power(), 50.0);
        assert_eq!(b.duty(), 32_767);

        driver.set_value(6_553).unwrap();
        assert_eq!(driver.power(), 10.0);
    }

    #[test]
    fn test_inverted_polarity_swaps_channels() {
        let (mut driver, a, b) = motor(Polarity::from(-1));

        driver.set_power(50.0).unwrap();
        let forward = (a.duty(), b.duty());
        driver.set_power(-50.0).unwrap();
        let reverse = (a.duty(), b.duty());

        assert_eq!(forward, (32_767, 0));
        assert_eq!(reverse, (0, 32_767));
    }

    #[test]
    fn test_duty_scales_to_channel_resolution() {
        let a = MockPwm::new(1023);
        let b = MockPwm::new(1023);
        let mut driver = MotorDriver::new(a.clone(), b.clone(), MotorConfig::default()).unwrap();
        driver.set_value(MAX_RAW_VALUE).unwrap();
        assert_eq!(b.duty(), 1023);
        driver.set_power(-50.0).unwrap();
        assert_eq!(a.duty(), 511);
        assert_eq!(b.duty(), 0);
    }

    #[test]
    fn test_non_finite_power_rejected() {
        let (mut driver, _, _) = motor(Polarity::Normal);
        driver.set_power(10.0).unwrap();
        assert_eq!(driver.set_power(f32::NAN), Err(PeripheralError::InvalidArgument));
        assert_eq!(driver.value(), 6_553);
    }

    #[test]
    fn test_pwm_failure_propagates() {
        let (mut driver, a, _) = motor(Polarity::Normal);
        a.set_failing(true);
        assert_eq!(driver.set_value(100), Err(PeripheralError::Pwm));
        assert_eq!(driver.value(), 0);
    }
}
