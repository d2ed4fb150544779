//! Hobby servo on a 50 Hz PWM channel.
//!
//! The commanded angle is clamped to ±90°, mapped affinely onto a
//! 500–2500 µs pulse, and written as a 16-bit fraction of the 20 ms frame.

use core::str::FromStr;

use embedded_hal::pwm::SetDutyCycle;

use crate::robot::error::{PeripheralError, PeripheralResult};
use crate::utils::config::{ServoConfig, DUTY_SCALE, SERVO_MAX_ANGLE, SERVO_MIN_ANGLE};
use crate::utils::math::map_range;

/// Servo angle in whole degrees, always within `-90..=90`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct AngleCommand(i32);

impl AngleCommand {
    pub const MIN: AngleCommand = AngleCommand(SERVO_MIN_ANGLE);
    pub const MAX: AngleCommand = AngleCommand(SERVO_MAX_ANGLE);
    pub const CENTER: AngleCommand = AngleCommand(0);

    /// Clamp `degrees` into the servo range.
    pub fn clamped(degrees: i32) -> Self {
        AngleCommand(degrees.clamp(SERVO_MIN_ANGLE, SERVO_MAX_ANGLE))
    }

    #[inline]
    pub fn degrees(self) -> i32 {
        self.0
    }
}

impl TryFrom<i32> for AngleCommand {
    type Error = PeripheralError;

    fn try_from(degrees: i32) -> Result<Self, Self::Error> {
        Ok(AngleCommand::clamped(degrees))
    }
}

impl TryFrom<i64> for AngleCommand {
    type Error = PeripheralError;

    fn try_from(degrees: i64) -> Result<Self, Self::Error> {
        let degrees = degrees.clamp(i64::from(SERVO_MIN_ANGLE), i64::from(SERVO_MAX_ANGLE));
        Ok(AngleCommand(degrees as i32))
    }
}

impl TryFrom<f32> for AngleCommand {
    type Error = PeripheralError;

    /// Truncates toward zero; NaN and infinities are rejected.
    fn try_from(degrees: f32) -> Result<Self, Self::Error> {
        if !degrees.is_finite() {
            return Err(PeripheralError::InvalidArgument);
        }
        // `as` saturates, so huge values still clamp correctly.
        Ok(AngleCommand::clamped(degrees as i32))
    }
}

impl FromStr for AngleCommand {
    type Err = PeripheralError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let degrees: i64 = s
            .trim()
            .parse()
            .map_err(|_| PeripheralError::InvalidArgument)?;
        AngleCommand::try_from(degrees)
    }
}

impl TryFrom<&str> for AngleCommand {
    type Error = PeripheralError;

    fn try_from(s: &str) -> Result<Self, Self::Error> {
        s.parse()
    }
}

/// Positional servo bound to one PWM channel.
#[derive(Debug)]
pub struct ServoDriver<P: SetDutyCycle> {
    pwm: P,
    config: ServoConfig,
    angle: AngleCommand,
    duty: u16,
}

impl<P: SetDutyCycle> ServoDriver<P> {
    /// Bind a servo to `pwm` and move it to the centre position.
    pub fn new(pwm: P, config: ServoConfig) -> PeripheralResult<Self> {
        let mut servo = ServoDriver {
            pwm,
            config,
            angle: AngleCommand::CENTER,
            duty: 0,
        };
        servo.write(AngleCommand::CENTER)?;
        Ok(servo)
    }

    /// Command a new angle. Anything convertible to [`AngleCommand`] is
    /// accepted; values outside ±90° are clamped.
    pub fn set_angle<A>(&mut self, angle: A) -> PeripheralResult<()>
    where
        A: TryInto<AngleCommand, Error = PeripheralError>,
    {
        let angle = angle.try_into()?;
        self.write(angle)
    }

    fn write(&mut self, angle: AngleCommand) -> PeripheralResult<()> {
        let duty = self.duty_for(angle);
        self.pwm
            .set_duty_cycle_fraction(duty, DUTY_SCALE)
            .map_err(|_| PeripheralError::Pwm)?;

        if angle != self.angle {
            debug!("servo {} deg, duty {}", angle.degrees(), duty);
        }
        self.angle = angle;
        self.duty = duty;
        Ok(())
    }

    /// Pulse width in microseconds for `angle`.
    pub fn pulse_width_us(&self, angle: AngleCommand) -> f32 {
        map_range(
            angle.degrees() as f32,
            SERVO_MIN_ANGLE as f32,
            SERVO_MAX_ANGLE as f32,
            self.config.min_pulse_us as f32,
            self.config.max_pulse_us as f32,
        )
    }

    /// 16-bit duty for `angle`, truncated.
    pub fn duty_for(&self, angle: AngleCommand) -> u16 {
        let fraction = self.pulse_width_us(angle) / self.config.period_us as f32;
        (fraction * DUTY_SCALE as f32) as u16
    }

    #[inline]
    pub fn angle(&self) -> AngleCommand {
        self.angle
    }

    /// Last 16-bit duty written to the channel.
    #[inline]
    pub fn duty(&self) -> u16 {
        self.duty
    }

    pub fn free(self) -> P {
        self.pwm
    }
}
