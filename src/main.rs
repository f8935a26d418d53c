use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use pihal_rs::hal::{EdgeMode, Level, PiHal, PiHalBuilder, PiHalConfig, RadioHal};
use pihal_rs::logging::{init_logger_with_default, log_debug, log_error, log_info, log_warn};
use pihal_rs::platform::raspberry_pi::RppalPlatform;
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};

static EDGE_COUNT: AtomicU64 = AtomicU64::new(0);

fn count_edge() {
    EDGE_COUNT.fetch_add(1, Ordering::Relaxed);
}

#[derive(Parser)]
#[command(name = "pihal-cli")]
#[command(about = "Diagnostics for the Raspberry Pi radio HAL")]
struct Cli {
    /// JSON configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// SPI channel (overrides the configuration file)
    #[arg(long)]
    spi_channel: Option<u8>,

    /// SPI clock speed in Hz (overrides the configuration file)
    #[arg(long)]
    spi_speed: Option<u32>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, ValueEnum)]
enum Edge {
    Rising,
    Falling,
    Either,
}

impl From<Edge> for EdgeMode {
    fn from(edge: Edge) -> Self {
        match edge {
            Edge::Rising => EdgeMode::Rising,
            Edge::Falling => EdgeMode::Falling,
            Edge::Either => EdgeMode::Either,
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Run one init/term cycle
    Probe,
    /// Measure a pulse on a pin
    Pulse {
        pin: u32,
        /// Level to time (0 or 1)
        level: u32,
        #[arg(default_value = "1000000")]
        timeout_us: u64,
    },
    /// Count emulated interrupts on a pin
    Watch {
        pin: u32,
        #[arg(value_enum)]
        edge: Edge,
        #[arg(default_value = "10")]
        seconds: u64,
    },
    /// Exchange hex bytes over SPI
    Xfer { hex: String },
}

fn build_hal(cli: &Cli) -> Result<PiHal<RppalPlatform>> {
    let mut config = match &cli.config {
        Some(path) => PiHalConfig::from_file(path)
            .with_context(|| format!("loading {}", path.display()))?,
        None => PiHalConfig::default(),
    };
    if let Some(channel) = cli.spi_channel {
        config.spi_channel = channel;
    }
    if let Some(speed) = cli.spi_speed {
        config.spi_speed = speed;
    }

    log_debug(&format!(
        "SPI channel {} at {} Hz",
        config.spi_channel, config.spi_speed
    ));
    PiHalBuilder::new()
        .config(config)
        .build(RppalPlatform::new())
        .context("invalid HAL configuration")
}

fn run(hal: &mut PiHal<RppalPlatform>, command: &Commands) -> Result<()> {
    match command {
        Commands::Probe => {
            log_info(&format!("HAL up, SPI open: {}", hal.is_spi_open()));
        }
        Commands::Pulse {
            pin,
            level,
            timeout_us,
        } => {
            let width = hal.pulse_in(*pin, Level::from_raw(*level), *timeout_us)?;
            if width == 0 {
                log_warn(&format!("GPIO {}: no pulse ended within {} us", pin, timeout_us));
            } else {
                log_info(&format!("GPIO {}: pulse {} us", pin, width));
            }
        }
        Commands::Watch { pin, edge, seconds } => {
            hal.attach_interrupt(*pin, count_edge, (*edge).into())?;
            hal.delay_ms(seconds * 1000);
            hal.detach_interrupt(*pin)?;
            log_info(&format!(
                "GPIO {}: {} interrupts in {} s",
                pin,
                EDGE_COUNT.load(Ordering::Relaxed),
                seconds
            ));
        }
        Commands::Xfer { hex } => {
            let out = hex::decode(hex).context("invalid hex payload")?;
            if out.is_empty() {
                bail!("empty SPI payload");
            }
            let mut input = vec![0u8; out.len()];
            hal.spi_begin_transaction();
            hal.spi_transfer(&out, out.len(), &mut input)?;
            hal.spi_end_transaction();
            log_info(&format!("SPI in: {}", hex::encode(&input)));
        }
    }
    Ok(())
}

fn main() -> Result<()> {
    init_logger_with_default("info");

    let cli = Cli::parse();
    let mut hal = build_hal(&cli)?;

    hal.init().context("HAL initialisation failed")?;
    let result = run(&mut hal, &cli.command);
    if let Err(ref e) = result {
        log_error(&format!("{:#}", e));
    }
    hal.term().context("HAL teardown failed")?;

    result
}
