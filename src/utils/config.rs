//! Platform constants and per-component configuration.
//!
//! Everything here is fixed at compile time; the board image picks the
//! values once at startup.

use core::time::Duration;

/// Full-scale raw duty value. Raw duty is always expressed in 16-bit units
/// and scaled to the channel's real resolution when written.
pub const DUTY_SCALE: u16 = 0xFFFF;

/// Motor PWM carrier frequency.
pub const MOTOR_PWM_HZ: u32 = 500;

/// Servo PWM frequency (20 ms frame).
pub const SERVO_PWM_HZ: u32 = 50;
pub const SERVO_PERIOD_US: u32 = 20_000;
pub const SERVO_MIN_PULSE_US: u32 = 500;
pub const SERVO_MAX_PULSE_US: u32 = 2_500;
pub const SERVO_MIN_ANGLE: i32 = -90;
pub const SERVO_MAX_ANGLE: i32 = 90;

/// Encoder edges per wheel revolution.
pub const PULSES_PER_REVOLUTION: u32 = 20;
/// Wheel radius in centimetres.
pub const WHEEL_RADIUS_CM: f32 = 3.3;
/// Odometer sampler period (1 kHz tick).
pub const ODOMETER_SAMPLE_PERIOD: Duration = Duration::from_millis(1);

pub const TRIGGER_PULSE_US: u32 = 10;
/// Echo wait; 30 ms covers roughly 5 m of round trip.
pub const ECHO_TIMEOUT_US: u32 = 30_000;
pub const SPEED_OF_SOUND_M_S: f32 = 340.0;

/// Pixels on the on-board strip.
pub const LED_COUNT: usize = 8;

/// Winding polarity of a motor relative to its wiring.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Polarity {
    Normal,
    Inverted,
}

impl Polarity {
    /// `1` for [`Polarity::Normal`], `-1` for [`Polarity::Inverted`].
    #[inline]
    pub fn sign(self) -> i32 {
        match self {
            Polarity::Normal => 1,
            Polarity::Inverted => -1,
        }
    }
}

impl From<i8> for Polarity {
    /// Negative values invert, anything else is normal.
    fn from(dir: i8) -> Self {
        if dir < 0 {
            Polarity::Inverted
        } else {
            Polarity::Normal
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MotorConfig {
    pub polarity: Polarity,
    pub pwm_hz: u32,
}

impl Default for MotorConfig {
    fn default() -> Self {
        Self {
            polarity: Polarity::Normal,
            pwm_hz: MOTOR_PWM_HZ,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ServoConfig {
    pub min_pulse_us: u32,
    pub max_pulse_us: u32,
    pub period_us: u32,
}

impl Default for ServoConfig {
    fn default() -> Self {
        Self {
            min_pulse_us: SERVO_MIN_PULSE_US,
            max_pulse_us: SERVO_MAX_PULSE_US,
            period_us: SERVO_PERIOD_US,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OdometerConfig {
    pub pulses_per_revolution: u32,
    pub wheel_radius_cm: f32,
    pub sample_period: Duration,
}

impl OdometerConfig {
    pub const fn new() -> Self {
        Self {
            pulses_per_revolution: PULSES_PER_REVOLUTION,
            wheel_radius_cm: WHEEL_RADIUS_CM,
            sample_period: ODOMETER_SAMPLE_PERIOD,
        }
    }

    /// Wheel circumference (`2·π·r`) in centimetres.
    #[inline]
    pub fn wheel_circumference_cm(&self) -> f32 {
        2.0 * core::f32::consts::PI * self.wheel_radius_cm
    }
}

impl Default for OdometerConfig {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RangerConfig {
    pub trigger_pulse_us: u32,
    pub echo_timeout_us: u32,
    pub speed_of_sound_m_s: f32,
}

impl Default for RangerConfig {
    fn default() -> Self {
        Self {
            trigger_pulse_us: TRIGGER_PULSE_US,
            echo_timeout_us: ECHO_TIMEOUT_US,
            speed_of_sound_m_s: SPEED_OF_SOUND_M_S,
        }
    }
}
