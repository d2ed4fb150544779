use embassy_sync::blocking_mutex::raw::NoopRawMutex;
use embassy_sync::channel::{Channel, Receiver, Sender};

use crate::robot::events::PeripheralCommand;

pub const COMMAND_CAP: usize = 16;
pub type CommandChannel = Channel<NoopRawMutex, PeripheralCommand, COMMAND_CAP>;
pub type CommandSender<'a> = Sender<'a, NoopRawMutex, PeripheralCommand, COMMAND_CAP>;
pub type CommandReceiver<'a> = Receiver<'a, NoopRawMutex, PeripheralCommand, COMMAND_CAP>;
