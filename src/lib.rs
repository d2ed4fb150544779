//! # Rover peripherals
//!
//! Real-time peripheral layer for a two-wheel-drive rover: PWM motor and
//! servo outputs, interrupt-driven wheel odometry, ultrasonic ranging and a
//! WS2812 LED strip driven by a dedicated timing engine.
//!
//! | Module | Purpose |
//! | ------ | ------- |
//! | [`robot`] | Component drivers and the command event loop |
//! | [`utils`] | Configuration, channel aliases and small numeric helpers |
//!
//! Every driver is generic over `embedded-hal` 1.0 traits; the ESP32-S3
//! board image in `src/bin/main.rs` binds them to real pins.

#![cfg_attr(not(test), no_std)]

#[macro_use]
mod fmt;

pub mod robot;
pub mod utils;
