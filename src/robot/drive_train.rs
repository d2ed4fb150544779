use embedded_hal::pwm::SetDutyCycle;

use crate::robot::error::PeripheralResult;
use crate::robot::motor_driver::MotorDriver;

/// Differential steering for a two-wheel-drive base. Speeds are percent,
/// `-100.0..=100.0`, positive forward.
pub trait DriveTrain {
    fn drive(&mut self, left: f32, right: f32) -> PeripheralResult<()>;
    fn stop(&mut self) -> PeripheralResult<()>;

    fn forward(&mut self, speed: f32) -> PeripheralResult<()> {
        self.drive(speed, speed)
    }

    fn backward(&mut self, speed: f32) -> PeripheralResult<()> {
        self.drive(-speed, -speed)
    }

    fn rotate_clockwise(&mut self, speed: f32) -> PeripheralResult<()> {
        self.drive(speed, -speed)
    }

    fn rotate_counter_clockwise(&mut self, speed: f32) -> PeripheralResult<()> {
        self.drive(-speed, speed)
    }
}

/// Left and right [`MotorDriver`]s driven as one base.
pub struct DifferentialDrive<LA, LB, RA, RB>
where
    LA: SetDutyCycle,
    LB: SetDutyCycle,
    RA: SetDutyCycle,
    RB: SetDutyCycle,
{
    pub left: MotorDriver<LA, LB>,
    pub right: MotorDriver<RA, RB>,
}

impl<LA, LB, RA, RB> DifferentialDrive<LA, LB, RA, RB>
where
    LA: SetDutyCycle,
    LB: SetDutyCycle,
    RA: SetDutyCycle,
    RB: SetDutyCycle,
{
    pub fn new(left: MotorDriver<LA, LB>, right: MotorDriver<RA, RB>) -> Self {
        Self { left, right }
    }
}

impl<LA, LB, RA, RB> DriveTrain for DifferentialDrive<LA, LB, RA, RB>
where
    LA: SetDutyCycle,
    LB: SetDutyCycle,
    RA: SetDutyCycle,
    RB: SetDutyCycle,
{
    fn drive(&mut self, left: f32, right: f32) -> PeripheralResult<()> {
        debug!("drive left={} right={}", left, right);
        self.left.set_power(left)?;
        self.right.set_power(right)?;
        Ok(())
    }

    fn stop(&mut self) -> PeripheralResult<()> {
        self.left.stop()?;
        self.right.stop()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::robot::mock::MockPwm;
    use crate::robot::motor_driver::MotorDirection;
    use crate::utils::config::{MotorConfig, Polarity};

    type Drive = DifferentialDrive<MockPwm, MockPwm, MockPwm, MockPwm>;

    fn drive() -> Drive {
        let left = MotorDriver::new(MockPwm::new(0xFFFF), MockPwm::new(0xFFFF), MotorConfig::default()).unwrap();
        // Right motor is mounted mirrored.
        let right = MotorDriver::new(
            MockPwm::new(0xFFFF),
            MockPwm::new(0xFFFF),
            MotorConfig {
                polarity: Polarity::Inverted,
                ..MotorConfig::default()
            },
        )
        .unwrap();
        DifferentialDrive::new(left, right)
    }

    #[test]
    fn test_forward_sets_both_powers() {
        let mut d = drive();
        d.forward(40.0).unwrap();
        assert_eq!(d.left.power(), 40.0);
        assert_eq!(d.right.power(), 40.0);
        assert_eq!(d.left.direction(), MotorDirection::Forward);
        // mirrored wiring: same command, opposite channel
        assert_eq!(d.right.direction(), MotorDirection::Backward);
    }

    #[test]
    fn test_rotation_signs() {
        let mut d = drive();
        d.rotate_clockwise(30.0).unwrap();
        assert_eq!((d.left.power(), d.right.power()), (30.0, -30.0));
        d.rotate_counter_clockwise(30.0).unwrap();
        assert_eq!((d.left.power(), d.right.power()), (-30.0, 30.0));
        d.backward(20.0).unwrap();
        assert_eq!((d.left.power(), d.right.power()), (-20.0, -20.0));
    }

    #[test]
    fn test_stop() {
        let mut d = drive();
        d.forward(80.0).unwrap();
        d.stop().unwrap();
        assert_eq!(d.left.direction(), MotorDirection::Stopped);
        assert_eq!(d.right.direction(), MotorDirection::Stopped);
        assert_eq!((d.left.value(), d.right.value()), (0, 0));
    }
}
