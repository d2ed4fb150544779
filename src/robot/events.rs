use crate::robot::led_strip::Color;

/// Most pixels a single [`PeripheralCommand::LedFrame`] can carry.
pub const MAX_FRAME_PIXELS: usize = 32;

/// Commands accepted by the peripheral event loop. The sender decides what
/// to do; the loop only applies it to the hardware.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum PeripheralCommand {
    // Motor commands
    Drive { left: f32, right: f32 },
    StopMotors,

    // Servo commands
    ServoAngle(i32),

    // LED commands
    LedFill(Color),
    LedPixel { index: usize, color: Color },
    LedFrame(heapless::Vec<[u8; 3], MAX_FRAME_PIXELS>),
    ClearLeds,
}
