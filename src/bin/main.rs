#![no_std]
#![no_main]
#![deny(
    clippy::mem_forget,
    reason = "mem::forget is generally not safe to do with esp_hal types, especially those \
    holding buffers for the duration of a data transfer."
)]

use core::cell::RefCell;

use critical_section::Mutex;
use defmt::{error, info, warn};
use embassy_executor::Spawner;
use embassy_time::{Duration, Timer};
use esp_backtrace as _;
use esp_hal::clock::CpuClock;
use esp_hal::delay::Delay;
use esp_hal::gpio::{Event, Input, InputConfig, Io, Level, Output, OutputConfig, Pull};
use esp_hal::ledc::channel::{self, ChannelIFace};
use esp_hal::ledc::timer::{self, TimerIFace};
use esp_hal::ledc::{LSGlobalClkSource, Ledc, LowSpeed};
use esp_hal::rmt::{PulseCode, Rmt, TxChannel, TxChannelConfig, TxChannelCreator};
use esp_hal::time::Rate;
use esp_hal::timer::systimer::SystemTimer;
use esp_hal::timer::timg::TimerGroup;
use esp_hal::timer::PeriodicTimer;
use esp_hal::{handler, ram, Blocking};
use rover_peripherals::robot::events::PeripheralCommand;
use rover_peripherals::robot::led_strip::Color;
use rover_peripherals::robot::timing_engine::{BitTiming, TimingEngine, Ws2812Program, BITS_PER_WORD};
use rover_peripherals::robot::{
    DifferentialDrive, EventLoop, LedStrip, Monotonic, MotorDriver, Odometer, PeripheralError,
    PolledEchoTimer, ServoDriver, UltrasonicRanger,
};
use rover_peripherals::utils::channels::{CommandChannel, CommandSender};
use rover_peripherals::utils::config::{
    MotorConfig, OdometerConfig, Polarity, RangerConfig, ServoConfig, LED_COUNT, MOTOR_PWM_HZ,
    SERVO_PWM_HZ,
};

// When you are okay with using a nightly compiler it's better to use https://docs.rs/static_cell/2.1.0/static_cell/macro.make_static.html
macro_rules! mk_static {
    ($t:ty,$val:expr) => {{
        static STATIC_CELL: static_cell::StaticCell<$t> = static_cell::StaticCell::new();
        #[deny(unused_attributes)]
        let x = STATIC_CELL.uninit().write(($val));
        x
    }};
}

// This creates a default app-descriptor required by the esp-idf bootloader.
// For more information see: <https://docs.espressif.com/projects/esp-idf/en/stable/esp32/api-reference/system/app_image_format.html#application-description>
esp_bootloader_esp_idf::esp_app_desc!();

// Pin map
// GPIO4/5   left motor IN1/IN2
// GPIO6/7   right motor IN1/IN2 (mounted mirrored)
// GPIO15    steering servo
// GPIO16/17 left/right wheel encoder
// GPIO18    ultrasonic trigger, GPIO8 echo
// GPIO48    WS2812 data

/// RMT source clock; one tick is 12.5 ns.
const RMT_CLOCK_HZ: u32 = 80_000_000;
/// One code per bit, one latch code, one end marker.
const RMT_BUFFER_LEN: usize = LED_COUNT * BITS_PER_WORD as usize + 2;

static ODOMETER: Odometer = Odometer::new(OdometerConfig::new());
static LEFT_ENCODER: Mutex<RefCell<Option<Input<'static>>>> = Mutex::new(RefCell::new(None));
static RIGHT_ENCODER: Mutex<RefCell<Option<Input<'static>>>> = Mutex::new(RefCell::new(None));
static SAMPLE_TIMER: Mutex<RefCell<Option<PeriodicTimer<'static, Blocking>>>> = Mutex::new(RefCell::new(None));

#[handler]
#[ram]
fn encoder_edge() {
    critical_section::with(|cs| {
        if let Some(pin) = LEFT_ENCODER.borrow_ref_mut(cs).as_mut() {
            if pin.is_interrupt_set() {
                ODOMETER.record_left();
                pin.clear_interrupt();
            }
        }
        if let Some(pin) = RIGHT_ENCODER.borrow_ref_mut(cs).as_mut() {
            if pin.is_interrupt_set() {
                ODOMETER.record_right();
                pin.clear_interrupt();
            }
        }
    });
}

/// Closes one odometer window per period. Runs in interrupt context so
/// blocking tasks on the executor cannot stretch a window.
#[handler]
#[ram]
fn sample_window() {
    critical_section::with(|cs| {
        if let Some(timer) = SAMPLE_TIMER.borrow_ref_mut(cs).as_mut() {
            timer.clear_interrupt();
        }
    });
    ODOMETER.sample();
}

struct SystemClock;

impl Monotonic for SystemClock {
    fn now_us(&self) -> u64 {
        esp_hal::time::Instant::now().duration_since_epoch().as_micros()
    }
}

/// WS2812 output on an RMT TX channel.
///
/// The RMT channel RAM is refilled by the CPU while the frame is sent, so
/// `put` returns when the last pulse code has been handed over. Every frame
/// ends with a low latch gap so back-to-back frames are not merged.
struct RmtEngine<TX: TxChannel> {
    channel: Option<TX>,
    timing: BitTiming,
    latch: u32,
    codes: [u32; RMT_BUFFER_LEN],
}

impl<TX: TxChannel> RmtEngine<TX> {
    fn new(channel: TX, program: Ws2812Program) -> Self {
        Self {
            channel: Some(channel),
            timing: program.compile(RMT_CLOCK_HZ),
            latch: {
                // split over both halves of one code; 15 bits each
                let half = Ws2812Program::reset_ticks(RMT_CLOCK_HZ).div_ceil(2) as u16;
                PulseCode::new(Level::Low, half, Level::Low, half)
            },
            codes: [0; RMT_BUFFER_LEN],
        }
    }
}

impl<TX: TxChannel> TimingEngine for RmtEngine<TX> {
    type Error = esp_hal::rmt::Error;

    fn put(&mut self, words: &[u32]) -> Result<(), Self::Error> {
        let mut slots = self.codes.iter_mut();
        for &word in words.iter().take(LED_COUNT) {
            for pulse in Ws2812Program::encode_word(word, self.timing) {
                if let Some(slot) = slots.next() {
                    *slot = PulseCode::new(Level::High, pulse.high as u16, Level::Low, pulse.low as u16);
                }
            }
        }
        if let Some(slot) = slots.next() {
            *slot = self.latch;
        }
        // end marker
        if let Some(slot) = slots.next() {
            *slot = 0;
        }

        let Some(channel) = self.channel.take() else {
            return Err(esp_hal::rmt::Error::InvalidArgument);
        };
        let transaction = match channel.transmit(&self.codes) {
            Ok(transaction) => transaction,
            Err(e) => {
                // transmit consumed the channel; the strip stays dark from here on
                error!("RMT transmit failed, LED channel lost: {}", e);
                return Err(e);
            }
        };
        match transaction.wait() {
            Ok(channel) => {
                self.channel = Some(channel);
                Ok(())
            }
            Err((e, channel)) => {
                self.channel = Some(channel);
                Err(e)
            }
        }
    }
}

#[esp_hal_embassy::main]
async fn main(spawner: Spawner) -> ! {
    rtt_target::rtt_init_defmt!();

    let config = esp_hal::Config::default().with_cpu_clock(CpuClock::max());
    let peripherals = esp_hal::init(config);

    let timer0 = SystemTimer::new(peripherals.SYSTIMER);
    esp_hal_embassy::init(timer0.alarm0);

    info!("Embassy initialized!");

    let command_channel: &'static CommandChannel = mk_static!(CommandChannel, CommandChannel::new());

    // PWM: one LEDC timer per carrier frequency
    let mut ledc = Ledc::new(peripherals.LEDC);
    ledc.set_global_slow_clock(LSGlobalClkSource::APBClk);

    let motor_timer = mk_static!(timer::Timer<'static, LowSpeed>, ledc.timer::<LowSpeed>(timer::Number::Timer0));
    motor_timer
        .configure(timer::config::Config {
            duty: timer::config::Duty::Duty14Bit,
            clock_source: timer::LSClockSource::APBClk,
            frequency: Rate::from_hz(MOTOR_PWM_HZ),
        })
        .unwrap();

    let servo_timer = mk_static!(timer::Timer<'static, LowSpeed>, ledc.timer::<LowSpeed>(timer::Number::Timer1));
    servo_timer
        .configure(timer::config::Config {
            duty: timer::config::Duty::Duty14Bit,
            clock_source: timer::LSClockSource::APBClk,
            frequency: Rate::from_hz(SERVO_PWM_HZ),
        })
        .unwrap();

    let pwm_config = |timer: &'static timer::Timer<'static, LowSpeed>| channel::config::Config {
        timer,
        duty_pct: 0,
        pin_config: channel::config::PinConfig::PushPull,
    };

    let mut left_a = ledc.channel(channel::Number::Channel0, peripherals.GPIO4);
    left_a.configure(pwm_config(motor_timer)).unwrap();
    let mut left_b = ledc.channel(channel::Number::Channel1, peripherals.GPIO5);
    left_b.configure(pwm_config(motor_timer)).unwrap();
    let mut right_a = ledc.channel(channel::Number::Channel2, peripherals.GPIO6);
    right_a.configure(pwm_config(motor_timer)).unwrap();
    let mut right_b = ledc.channel(channel::Number::Channel3, peripherals.GPIO7);
    right_b.configure(pwm_config(motor_timer)).unwrap();
    let mut servo_pwm = ledc.channel(channel::Number::Channel4, peripherals.GPIO15);
    servo_pwm.configure(pwm_config(servo_timer)).unwrap();

    let left = MotorDriver::new(left_a, left_b, MotorConfig::default()).unwrap();
    let right = MotorDriver::new(
        right_a,
        right_b,
        MotorConfig {
            polarity: Polarity::Inverted,
            ..MotorConfig::default()
        },
    )
    .unwrap();
    let drive = DifferentialDrive::new(left, right);
    let servo = ServoDriver::new(servo_pwm, ServoConfig::default()).unwrap();

    // Encoders: rising-edge interrupts feed the odometer
    let mut io = Io::new(peripherals.IO_MUX);
    io.set_interrupt_handler(encoder_edge);

    let encoder_config = InputConfig::default().with_pull(Pull::Up);
    let mut left_encoder = Input::new(peripherals.GPIO16, encoder_config);
    let mut right_encoder = Input::new(peripherals.GPIO17, encoder_config);
    critical_section::with(|cs| {
        left_encoder.listen(Event::RisingEdge);
        right_encoder.listen(Event::RisingEdge);
        LEFT_ENCODER.borrow_ref_mut(cs).replace(left_encoder);
        RIGHT_ENCODER.borrow_ref_mut(cs).replace(right_encoder);
    });

    // Odometer sampler on a hardware timer, preempting the executor
    let timg0 = TimerGroup::new(peripherals.TIMG0);
    let mut sample_timer = PeriodicTimer::new(timg0.timer0);
    sample_timer.set_interrupt_handler(sample_window);
    let period = OdometerConfig::new().sample_period;
    critical_section::with(|cs| {
        sample_timer.listen();
        sample_timer
            .start(esp_hal::time::Duration::from_micros(period.as_micros() as u64))
            .unwrap();
        SAMPLE_TIMER.borrow_ref_mut(cs).replace(sample_timer);
    });

    // Ultrasonic ranger
    let trigger = Output::new(peripherals.GPIO18, Level::Low, OutputConfig::default());
    let echo = Input::new(peripherals.GPIO8, InputConfig::default().with_pull(Pull::Down));
    let ranger = UltrasonicRanger::new(
        trigger,
        PolledEchoTimer::new(echo, SystemClock),
        Delay::new(),
        RangerConfig::default(),
    )
    .unwrap();

    // LED strip on RMT channel 0
    let rmt = Rmt::new(peripherals.RMT, Rate::from_hz(RMT_CLOCK_HZ)).unwrap();
    let rmt_channel = rmt
        .channel0
        .configure_tx(
            peripherals.GPIO48,
            TxChannelConfig::default()
                .with_clk_divider(1)
                .with_idle_output_level(Level::Low)
                .with_idle_output(true)
                .with_carrier_modulation(false),
        )
        .unwrap();
    let program = Ws2812Program::default();
    if !program.within_ws2812_tolerance() {
        warn!("LED program {} outside WS2812 timing window", program);
    }
    let strip: LedStrip<_, LED_COUNT> = LedStrip::new(RmtEngine::new(rmt_channel, program));

    spawner.spawn(telemetry_task(ranger)).ok();
    spawner.spawn(demo_commands(command_channel.sender())).ok();

    let mut event_loop = EventLoop::new(command_channel.receiver(), drive, servo, strip);
    event_loop.run().await
}

type Ranger = UltrasonicRanger<Output<'static>, PolledEchoTimer<Input<'static>, SystemClock>, Delay>;

#[embassy_executor::task]
async fn telemetry_task(mut ranger: Ranger) -> ! {
    loop {
        match ranger.get_distance() {
            Ok(distance) => info!("distance: {} cm", distance),
            Err(PeripheralError::Timeout) => warn!("distance: no echo"),
            Err(e) => error!("ranging failed: {}", e),
        }
        info!(
            "wheel travel: {} cm/window, {} cm/s",
            ODOMETER.get_speed(),
            ODOMETER.speed_cm_per_s()
        );
        Timer::after(Duration::from_millis(500)).await;
    }
}

/// Stand-in for the control logic: cycles through a fixed command script.
#[embassy_executor::task]
async fn demo_commands(command_sender: CommandSender<'static>) -> ! {
    let script = [
        PeripheralCommand::LedFill(Color::Hex(0x00_10_00)),
        PeripheralCommand::ServoAngle(0),
        PeripheralCommand::Drive { left: 40.0, right: 40.0 },
        PeripheralCommand::ServoAngle(-45),
        PeripheralCommand::Drive { left: 30.0, right: -30.0 },
        PeripheralCommand::ServoAngle(45),
        PeripheralCommand::Drive { left: -40.0, right: -40.0 },
        PeripheralCommand::StopMotors,
        PeripheralCommand::ClearLeds,
    ];

    loop {
        for command in script.iter() {
            command_sender.send(command.clone()).await;
            Timer::after(Duration::from_secs(2)).await;
        }
    }
}
