use clap::Parser;
use embassy_executor::{Executor, Spawner};
use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_time::{Delay, Timer};
use embedded_hal::digital::PinState;
use static_cell::StaticCell;
use std::sync::{Arc, Mutex};
use tracing::{error, info, trace, warn};
use volley_core::utils::board::{
    adc::{Adc, AdcSequencer, ChannelSlot, Sequence},
    gpio::{GpioBank, Pad, PadMode, PadPin, Port},
    identity::{AppConfiguration, McConfiguration},
    pins::{LED_GREEN, LED_RED},
};
use volley_core::utils::controllers::{
    i2c::{BusPeripheral, I2cBus, I2cConfig, VOLLEY_BUS_LINES},
    BusCommand, LedCommand, StatusLeds, SystemCommand, LED_CHANNEL,
};
use volley_core::utils::{BoardSupport, MotorPosition, SystemController};

#[derive(Parser)]
#[clap(version = "1.0")]
struct Opts {
    /// Level of the PC1 strap (id bit 0)
    #[clap(long)]
    strap0: bool,
    /// Level of the PC3 strap (id bit 1)
    #[clap(long)]
    strap1: bool,
    /// Simulate a device holding SDA low until it sees this many SCL pulses
    #[clap(long)]
    stuck_pulses: Option<u32>,
    /// JSON system command to dispatch after startup (repeatable)
    #[clap(long = "command")]
    commands: Vec<String>,
    /// Print the patched configurations as JSON
    #[clap(long)]
    json: bool,
}

/// Electrical state of the simulated board.
struct Wire {
    straps: [bool; 2],
    scl_out: bool,
    sda_out: bool,
    /// SCL pulses the stuck device still needs before it lets SDA go.
    device_holds_sda: Option<u32>,
}

impl Wire {
    fn sda_level(&self) -> bool {
        self.sda_out && self.device_holds_sda.is_none()
    }
}

/// GPIO backend that logs every access and models the bus lines.
#[derive(Clone)]
struct SimGpio {
    wire: Arc<Mutex<Wire>>,
}

impl SimGpio {
    fn wire(&self) -> std::sync::MutexGuard<'_, Wire> {
        self.wire.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl GpioBank for SimGpio {
    fn enable_clock(
        &mut self,
        port: Port,
    ) {
        trace!("clock on GPIO{:?}", port);
    }

    fn set_pad_mode(
        &mut self,
        pad: Pad,
        mode: PadMode,
    ) {
        trace!("{} -> {:?}", pad, mode);
    }

    fn read_pad(
        &mut self,
        pad: Pad,
    ) -> PinState {
        let wire = self.wire();
        let high = match pad {
            p if p == ID_PADS[0] => wire.straps[0],
            p if p == ID_PADS[1] => wire.straps[1],
            p if p == VOLLEY_BUS_LINES.sda => wire.sda_level(),
            p if p == VOLLEY_BUS_LINES.scl => wire.scl_out,
            _ => false,
        };
        PinState::from(high)
    }

    fn write_pad(
        &mut self,
        pad: Pad,
        state: PinState,
    ) {
        let high = state == PinState::High;
        let mut wire = self.wire();
        if pad == VOLLEY_BUS_LINES.scl {
            if wire.scl_out && !high {
                if let Some(left) = wire.device_holds_sda {
                    wire.device_holds_sda = left.checked_sub(1).filter(|n| *n > 0);
                    if wire.device_holds_sda.is_none() {
                        info!("simulated device released SDA");
                    }
                }
            }
            wire.scl_out = high;
        } else if pad == VOLLEY_BUS_LINES.sda {
            wire.sda_out = high;
        } else {
            trace!("{} = {:?}", pad, state);
        }
    }
}

const ID_PADS: [Pad; 2] = volley_core::utils::board::pins::ID_STRAPS;

struct SimAdc;

impl AdcSequencer for SimAdc {
    fn configure_channel(
        &mut self,
        adc: Adc,
        sequence: Sequence,
        slot: ChannelSlot,
    ) {
        trace!(
            "{:?} {:?} rank {}: channel {} ({} cycles)",
            adc,
            sequence,
            slot.rank.get(),
            slot.channel.0,
            slot.sample_time.cycles()
        );
    }
}

#[derive(Debug, PartialEq)]
enum DriverState {
    Stop,
    Ready,
}

/// I2C driver model: refuses to start unless it believes it is stopped.
struct SimI2c {
    state: DriverState,
}

impl BusPeripheral for SimI2c {
    fn start(
        &mut self,
        config: &I2cConfig,
    ) {
        if self.state != DriverState::Stop {
            warn!("I2C start ignored, driver in state {:?}", self.state);
            return;
        }
        info!("I2C driver started at {} Hz", config.clock_speed);
        self.state = DriverState::Ready;
    }

    fn stop(&mut self) {
        info!("I2C driver stopped");
        self.state = DriverState::Stop;
    }

    fn force_stopped(&mut self) {
        self.state = DriverState::Stop;
    }
}

type SimBus = I2cBus<CriticalSectionRawMutex, SimGpio, SimI2c, Delay>;
type SimLeds = StatusLeds<PadPin<SimGpio>, PadPin<SimGpio>>;

#[embassy_executor::task]
async fn bus_task(ctrl: SystemController<'static, CriticalSectionRawMutex, SimGpio, SimI2c, Delay>) -> ! {
    ctrl.bus_ch().await
}

#[embassy_executor::task]
async fn led_task(mut leds: SimLeds) -> ! {
    loop {
        let cmd: LedCommand = LED_CHANNEL.receiver().receive().await;
        if let Err(e) = leds.ex_command(cmd) {
            error!("LED command failed: {:?}", e);
        }
    }
}

#[embassy_executor::task]
async fn main_task(
    spawner: Spawner,
    opts: Opts,
) {
    let gpio = SimGpio {
        wire: Arc::new(Mutex::new(Wire {
            straps: [opts.strap0, opts.strap1],
            scl_out: true,
            sda_out: true,
            device_holds_sda: None,
        })),
    };

    let bus: &'static SimBus = volley_core::mk_static!(
        SimBus,
        I2cBus::new(
            VOLLEY_BUS_LINES,
            gpio.clone(),
            SimI2c {
                state: DriverState::Stop,
            },
            Delay,
        )
    );

    let mut board = BoardSupport::new(gpio.clone(), SimAdc);
    let mut app_conf = AppConfiguration::default();
    let mut mc_conf = McConfiguration::default();
    let id = board.init(&mut app_conf, &mut mc_conf, bus).await;

    match MotorPosition::try_from(id) {
        Ok(position) => info!("board {} drives the {:?} motor", id.get(), position),
        Err(e) => warn!("{}", e),
    }

    if opts.json {
        match (serde_json::to_string(&app_conf), serde_json::to_string(&mc_conf)) {
            (Ok(app), Ok(mc)) => println!("{{\"app\":{app},\"mc\":{mc}}}"),
            (Err(e), _) | (_, Err(e)) => error!("config serialization failed: {}", e),
        }
    }

    spawner.must_spawn(bus_task(SystemController::new(bus)));
    let leds = StatusLeds::new(
        PadPin::new(gpio.clone(), LED_GREEN),
        PadPin::new(gpio.clone(), LED_RED),
    );
    spawner.must_spawn(led_task(leds));

    if let Some(pulses) = opts.stuck_pulses {
        info!("simulating a device stuck for {} clock pulses", pulses);
        gpio.wire().device_holds_sda = Some(pulses).filter(|n| *n > 0);
    }

    let commands: Vec<SystemCommand> = if opts.commands.is_empty() {
        vec![SystemCommand::B(BusCommand::Recover)]
    } else {
        opts.commands
            .iter()
            .filter_map(|raw| match serde_json::from_str(raw) {
                Ok(cmd) => Some(cmd),
                Err(e) => {
                    error!("ignoring command {}: {}", raw, e);
                    None
                }
            })
            .collect()
    };

    for cmd in commands {
        info!("dispatching {:?}", cmd);
        cmd.dispatch().await;
        Timer::after_millis(20).await;
    }

    let free = gpio.wire().sda_level();
    let running = bus.is_running().await;
    info!(running, sda_free = free, "simulation finished");
    std::process::exit(if free { 0 } else { 1 });
}

static EXECUTOR: StaticCell<Executor> = StaticCell::new();

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();
    let opts = Opts::parse();
    let executor = EXECUTOR.init(Executor::new());
    executor.run(|spawner| {
        spawner.must_spawn(main_task(spawner, opts));
    });
}
