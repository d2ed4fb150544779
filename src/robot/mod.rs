//! Component drivers for the rover.
//!
//! - [`motor_driver`] – signed power onto two complementary PWM channels
//! - [`drive_train`] – differential steering over a left/right motor pair
//! - [`servo_driver`] – angle to 50 Hz pulse width
//! - [`odometer`] – interrupt-counted wheel encoders with a periodic sampler
//! - [`ultrasonic`] – trigger/echo time-of-flight ranging
//! - [`led_strip`] / [`timing_engine`] – WS2812 pixel buffer and bit timing
//! - [`event_loop`] – applies [`events::PeripheralCommand`]s received over a channel

pub mod drive_train;
pub mod error;
pub mod event_loop;
pub mod events;
pub mod led_strip;
pub mod motor_driver;
pub mod odometer;
pub mod servo_driver;
pub mod timing_engine;
pub mod ultrasonic;

#[cfg(test)]
pub(crate) mod mock;

pub use drive_train::{DifferentialDrive, DriveTrain};
pub use error::{PeripheralError, PeripheralResult};
pub use led_strip::{Color, LedStrip, PixelBuffer};
pub use motor_driver::MotorDriver;
pub use odometer::Odometer;
pub use servo_driver::{AngleCommand, ServoDriver};
pub use timing_engine::{TimingEngine, Ws2812Program};
pub use ultrasonic::{EchoTimer, Monotonic, PolledEchoTimer, UltrasonicRanger};
