/// Errors reported by the peripheral drivers.
///
/// Out-of-range power and angle values are clamped, not reported.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum PeripheralError {
    /// Input could not be converted to the expected type or shape
    InvalidArgument,
    /// No echo pulse was observed within the configured window
    Timeout,
    /// PWM channel rejected a duty update
    Pwm,
    /// GPIO pin operation failed
    Gpio,
    /// Timing engine did not accept the transfer
    Engine,
}

impl core::fmt::Display for PeripheralError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            PeripheralError::InvalidArgument => write!(f, "Invalid argument"),
            PeripheralError::Timeout => write!(f, "Timed out waiting for echo"),
            PeripheralError::Pwm => write!(f, "PWM operation failed"),
            PeripheralError::Gpio => write!(f, "GPIO pin operation failed"),
            PeripheralError::Engine => write!(f, "Timing engine rejected transfer"),
        }
    }
}

pub type PeripheralResult<T> = Result<T, PeripheralError>;
