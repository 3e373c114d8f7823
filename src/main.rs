//! fieldgw CLI entry point.
//!
//! Driver discovery, example configuration, word conversion, configuration
//! validation and a simulated polling run.

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use fieldgw::codec::{decode_words, normalize_words};
use fieldgw::core::metadata::{get_driver_registry, DriverMetadata};
use fieldgw::core::point::DataType;
use fieldgw::gateway::{
    create_driver_with_logging, DeviceDefinition, DriverLogging, GatewayConfig, PointDefinition,
};
use fieldgw::protocols::simulated::SimulatedConnector;

/// Field device driver layer for industrial data-acquisition gateways
#[derive(Parser, Debug)]
#[command(name = "fieldgw", version, about, long_about = None)]
struct Cli {
    /// Log filter used when RUST_LOG is not set
    #[arg(long, env = "FIELDGW_LOG", default_value = "info", global = true)]
    log: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// List available drivers
    ListDrivers,

    /// Generate an example configuration
    Example {
        /// Driver to generate the example for
        #[arg(default_value = "SiemensS7")]
        driver: String,
    },

    /// Normalize and decode raw register words
    Convert {
        /// Data type name, e.g. int16, uint32_2, float_3, double_1
        #[arg(short, long)]
        data_type: String,

        /// Register words as read, decimal or 0x-prefixed hex
        #[arg(required = true)]
        words: Vec<String>,
    },

    /// Validate a configuration file
    Validate {
        config: PathBuf,
    },

    /// Poll every active device of a configuration against simulated transports
    Simulate {
        config: PathBuf,

        /// Number of polling cycles
        #[arg(short, long, default_value_t = 1)]
        cycles: u32,

        /// Word returned for every register
        #[arg(long, default_value = "0", value_parser = parse_word)]
        fill: u16,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(&cli.log);

    match cli.command {
        Commands::ListDrivers => list_drivers(),
        Commands::Example { driver } => generate_example(&driver),
        Commands::Convert { data_type, words } => convert(&data_type, &words),
        Commands::Validate { config } => validate(&config),
        Commands::Simulate {
            config,
            cycles,
            fill,
        } => simulate(&config, cycles, fill).await,
    }
}

fn init_tracing(default_filter: &str) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .try_init();
}

fn parse_word(s: &str) -> Result<u16, String> {
    let s = s.trim();
    let parsed = match s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        Some(hex) => u16::from_str_radix(hex, 16),
        None => s.parse::<u16>(),
    };
    parsed.map_err(|e| format!("invalid register word '{}': {}", s, e))
}

fn list_drivers() -> anyhow::Result<()> {
    let registry = get_driver_registry();

    println!("Available drivers:");
    println!();

    for meta in registry.drivers() {
        println!("  {} {} ({})", meta.name(), meta.info.version, meta.display_name);
        println!("    {}", meta.description);
        println!("    Author: {}", meta.info.author);
        println!("    Models: {}", meta.info.supported_models.join(", "));
        println!("    Parameters:");
        for param in &meta.parameters {
            let required = if param.required { " (required)" } else { "" };
            println!("      - {} [{}]{}", param.name, param.display_name, required);
        }
        println!();
    }
    Ok(())
}

fn sample_points(driver: &str) -> Vec<(&'static str, &'static str, &'static str)> {
    if driver.eq_ignore_ascii_case("SiemensS7") {
        vec![
            ("temperature", "DB1.DBD4", "float"),
            ("counter", "DB1.DBD8", "int32_1"),
            ("running", "M0.0", "bool"),
        ]
    } else {
        vec![
            ("voltage", "1:100", "float_3"),
            ("energy", "1:102", "uint64"),
            ("status", "1:110", "uint16"),
        ]
    }
}

fn example_config(meta: &DriverMetadata) -> anyhow::Result<GatewayConfig> {
    let points = sample_points(meta.name())
        .into_iter()
        .map(|(name, address, data_type)| {
            Ok(PointDefinition {
                name: name.to_string(),
                address: address.to_string(),
                data_type: data_type.parse::<DataType>()?,
                length: None,
                access: Default::default(),
            })
        })
        .collect::<fieldgw::Result<Vec<_>>>()?;

    Ok(GatewayConfig {
        devices: vec![DeviceDefinition {
            id: uuid::Uuid::new_v4(),
            name: format!("{}-1", meta.name().to_ascii_lowercase()),
            driver: Some(meta.name().to_string()),
            kind: Default::default(),
            enabled: true,
            parameters: meta.example_config.clone(),
            points,
        }],
    })
}

fn generate_example(driver: &str) -> anyhow::Result<()> {
    let Some(meta) = get_driver_registry().get_driver(driver) else {
        bail!(
            "Unknown driver: {}. Run 'fieldgw list-drivers' to see the available drivers.",
            driver
        );
    };

    let config = example_config(meta)?;
    println!("# fieldgw configuration - {} example", meta.display_name);
    println!();
    print!("{}", config.to_toml_string()?);
    Ok(())
}

fn convert(data_type: &str, words: &[String]) -> anyhow::Result<()> {
    let data_type: DataType = data_type.parse()?;
    let words = words
        .iter()
        .map(|w| parse_word(w).map_err(anyhow::Error::msg))
        .collect::<anyhow::Result<Vec<u16>>>()?;

    let normalized = normalize_words(&words, data_type)?;
    let value = decode_words(&normalized, data_type.kind)?;

    let hex: Vec<String> = normalized.iter().map(|w| format!("0x{:04X}", w)).collect();
    println!("data type : {} ({})", data_type, data_type.order);
    println!("normalized: [{}]", hex.join(", "));
    println!("value     : {}", serde_json::to_string(&value)?);
    Ok(())
}

fn load_config(path: &Path) -> anyhow::Result<GatewayConfig> {
    let config = GatewayConfig::load(path)?;
    config
        .validate()
        .with_context(|| format!("{} is not a valid configuration", path.display()))?;
    Ok(config)
}

fn validate(path: &Path) -> anyhow::Result<()> {
    let config = load_config(path)?;

    let points: usize = config.devices.iter().map(|d| d.points.len()).sum();
    println!(
        "{}: {} devices ({} active), {} points - OK",
        path.display(),
        config.devices.len(),
        config.active_devices().count(),
        points
    );
    Ok(())
}

async fn simulate(path: &Path, cycles: u32, fill: u16) -> anyhow::Result<()> {
    let config = load_config(path)?;
    let connector = SimulatedConnector::new().with_fill(fill);

    #[allow(unused_mut)]
    let mut logging = DriverLogging::default();
    #[cfg(feature = "tracing-support")]
    {
        logging.handler = Some(std::sync::Arc::new(
            fieldgw::core::logging::TracingLogHandler,
        ));
    }

    let mut drivers = Vec::new();
    for def in config.active_devices() {
        let driver = create_driver_with_logging(def, &connector, &logging)
            .with_context(|| format!("cannot create driver for device '{}'", def.name))?;
        drivers.push((def, driver));
    }

    let period = drivers
        .iter()
        .map(|(_, d)| d.config().min_period())
        .max()
        .unwrap_or(Duration::ZERO);

    for cycle in 1..=cycles {
        for (def, driver) in drivers.iter_mut() {
            if !driver.is_connected() && !driver.connect().await {
                println!("[{}] {}: connect failed", cycle, def.name);
                continue;
            }
            for point in &def.points {
                let result = driver.read(&point.register_address()).await;
                if result.is_good() {
                    println!(
                        "[{}] {}.{} = {}",
                        cycle,
                        def.name,
                        point.name,
                        serde_json::to_string(&result.value)?
                    );
                } else {
                    println!("[{}] {}.{} bad: {}", cycle, def.name, point.name, result.message());
                }
            }
        }
        if cycle < cycles {
            tokio::time::sleep(period).await;
        }
    }

    for (_, driver) in drivers.iter_mut() {
        driver.close().await;
        driver.dispose();
    }
    Ok(())
}
