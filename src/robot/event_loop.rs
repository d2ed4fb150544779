use embedded_hal::pwm::SetDutyCycle;

use crate::robot::{
    drive_train::DriveTrain,
    error::PeripheralResult,
    events::PeripheralCommand,
    led_strip::LedStrip,
    servo_driver::ServoDriver,
    timing_engine::TimingEngine,
};
use crate::utils::channels::CommandReceiver;

/// Receives [`PeripheralCommand`]s and applies them to the outputs.
pub struct EventLoop<'a, D, S, E, const N: usize>
where
    D: DriveTrain,
    S: SetDutyCycle,
    E: TimingEngine,
{
    command_receiver: CommandReceiver<'a>,
    drive: D,
    servo: ServoDriver<S>,
    strip: LedStrip<E, N>,
}

impl<'a, D, S, E, const N: usize> EventLoop<'a, D, S, E, N>
where
    D: DriveTrain,
    S: SetDutyCycle,
    E: TimingEngine,
{
    pub fn new(
        command_receiver: CommandReceiver<'a>,
        drive: D,
        servo: ServoDriver<S>,
        strip: LedStrip<E, N>,
    ) -> Self {
        Self {
            command_receiver,
            drive,
            servo,
            strip,
        }
    }

    /// Apply one command. Failures are returned, never retried.
    pub fn handle(&mut self, command: PeripheralCommand) -> PeripheralResult<()> {
        match command {
            PeripheralCommand::Drive { left, right } => self.drive.drive(left, right),
            PeripheralCommand::StopMotors => self.drive.stop(),
            PeripheralCommand::ServoAngle(angle) => self.servo.set_angle(angle),
            PeripheralCommand::LedFill(color) => self.strip.write_all(color),
            PeripheralCommand::LedPixel { index, color } => {
                self.strip.set(index, color)?;
                self.strip.write()
            }
            PeripheralCommand::LedFrame(colors) => {
                self.strip.set_frame(&colors);
                self.strip.write()
            }
            PeripheralCommand::ClearLeds => self.strip.clear(),
        }
    }

    /// Wait for the next command and apply it.
    pub async fn process_next(&mut self) {
        let command = self.command_receiver.receive().await;
        info!("Peripheral command: {:?}", command);
        if let Err(e) = self.handle(command) {
            error!("Command failed: {}", e);
        }
    }

    pub async fn run(&mut self) -> ! {
        loop {
            self.process_next().await;
        }
    }

    pub fn drive(&mut self) -> &mut D {
        &mut self.drive
    }

    pub fn servo(&self) -> &ServoDriver<S> {
        &self.servo
    }

    pub fn strip(&self) -> &LedStrip<E, N> {
        &self.strip
    }
}
