//! Command-line control of Elgato Key Lights.
//!
//! Run with: keylight --help

use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

use anyhow::{Context, bail};
use clap::{Parser, Subcommand};
use elgato_keylight::{
    AppConfig, DeviceInfo, Effect, Error, Fleet, FleetResults, Kelvin, LightState, Mood,
    WaybarStatus, default_config_path, discover_all, load_config, resolve_devices,
    resolve_preset, run_effect, select,
};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "keylight")]
#[command(about = "Control Elgato Key Lights from the command line", long_about = None)]
struct Cli {
    /// Config file (default: ~/.config/elgato-keylight/config.toml)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Target specific light(s) by name; may be repeated
    #[arg(short = 'l', long = "light", global = true)]
    lights: Vec<String>,

    /// Discovery timeout in seconds, used when no lights are configured
    #[arg(long, default_value = "5", global = true)]
    discovery_timeout: u64,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show the status of the lights
    Status,

    /// Turn the lights on
    On,

    /// Turn the lights off
    Off,

    /// Toggle the lights on/off
    Toggle,

    /// Set brightness (0-100)
    Brightness {
        #[arg(allow_negative_numbers = true)]
        value: i64,
    },

    /// Increase brightness
    BrightnessUp {
        #[arg(long, default_value = "10")]
        step: i64,
    },

    /// Decrease brightness
    BrightnessDown {
        #[arg(long, default_value = "10")]
        step: i64,
    },

    /// Set color temperature (143 = cool/7000K, 344 = warm/2900K)
    Temperature {
        /// Temperature in device units
        #[arg(required_unless_present = "kelvin")]
        value: Option<i64>,
        /// Temperature in Kelvin instead of device units
        #[arg(long, conflicts_with = "value")]
        kelvin: Option<u32>,
    },

    /// Blink the lights so they can be told apart
    Identify,

    /// Apply a named preset
    Preset { name: String },

    /// List available presets
    Presets,

    /// Flash the lights to get attention
    Flash {
        #[arg(long, default_value = "3")]
        times: u32,
    },

    /// Smoothly pulse brightness up and down
    Pulse {
        #[arg(long, default_value = "3")]
        cycles: u32,
    },

    /// Sweep color temperature back and forth
    Celebrate,

    /// Urgent attention-getting flash
    Alert {
        #[arg(long, default_value = "5")]
        flashes: u32,
    },

    /// Slowly dim, hold, then restore
    Dim {
        #[arg(long, default_value = "10")]
        target: u16,
    },

    /// Set mood lighting (cozy, focus, relax, energize, movie)
    Mood { name: String },

    /// Discover lights on the network
    Discover {
        /// Discovery timeout in seconds
        #[arg(short, long, default_value = "5")]
        timeout: u64,
    },

    /// Print status as waybar JSON
    Waybar,
}

#[tokio::main]
async fn main() -> ExitCode {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    if matches!(cli.command, Commands::Waybar) {
        let status = waybar_status(&cli)
            .await
            .unwrap_or_else(|e| WaybarStatus::error(&format!("{e:#}")));
        match serde_json::to_string(&status) {
            Ok(json) => println!("{json}"),
            Err(e) => eprintln!("keylight: {e}"),
        }
        return ExitCode::SUCCESS;
    }

    match run(cli).await {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(e) => {
            eprintln!("keylight: {e:#}");
            ExitCode::FAILURE
        }
    }
}

/// Returns whether every light succeeded.
async fn run(cli: Cli) -> anyhow::Result<bool> {
    let config = config(&cli)?;

    match cli.command {
        Commands::Presets => {
            for name in config.preset_names() {
                if let Some(preset) = config.preset(&name) {
                    println!(
                        "{name}: brightness={}, temperature={}",
                        show(preset.defaults.brightness),
                        show(preset.defaults.temperature)
                    );
                }
            }
            return Ok(true);
        }
        Commands::Discover { timeout } => {
            println!("Discovering Key Lights (timeout: {timeout}s)...");
            let devices = discover_all(Duration::from_secs(timeout)).await?;
            if devices.is_empty() {
                println!("No lights found on the network.");
            }
            for d in devices {
                println!(
                    "  {:10} {:21} {:17} {}",
                    d.name,
                    d.address.to_string(),
                    d.id,
                    d.model.as_deref().unwrap_or("")
                );
            }
            return Ok(true);
        }
        _ => {}
    }

    let devices = devices(&cli, &config).await?;
    let fleet = Fleet::from_config(&config, devices.clone());

    let ok = match cli.command {
        Commands::Status => {
            let results = fleet
                .for_each(|light| async move {
                    Ok::<_, Error>((light.get_state().await?, light.get_info().await?))
                })
                .await;
            report(&fleet, &results, |(state, info)| {
                format!("({}) {}", info.label(), describe(state))
            })
        }
        Commands::On => {
            let results = fleet.for_each(|light| light.turn_on(None, None)).await;
            report(&fleet, &results, |_| "on".to_string())
        }
        Commands::Off => {
            let results = fleet.for_each(|light| light.turn_off()).await;
            report(&fleet, &results, |_| "off".to_string())
        }
        Commands::Toggle => {
            let results = fleet.for_each(|light| light.toggle()).await;
            report(&fleet, &results, |s| on_off(s).to_string())
        }
        Commands::Brightness { value } => {
            let results = fleet.for_each(|light| light.set_brightness(value)).await;
            report(&fleet, &results, |s| format!("brightness={}%", s.brightness))
        }
        Commands::BrightnessUp { step } => {
            let results = fleet.for_each(|light| light.adjust_brightness(step)).await;
            report(&fleet, &results, |s| format!("brightness={}%", s.brightness))
        }
        Commands::BrightnessDown { step } => {
            let delta = step.saturating_neg();
            let results = fleet.for_each(|light| light.adjust_brightness(delta)).await;
            report(&fleet, &results, |s| format!("brightness={}%", s.brightness))
        }
        Commands::Temperature { value, kelvin } => {
            let value = match (value, kelvin) {
                (Some(v), _) => v,
                (None, Some(k)) => i64::from(Kelvin::new(k).to_device()),
                (None, None) => bail!("a temperature is required"),
            };
            let results = fleet.for_each(|light| light.set_temperature(value)).await;
            report(&fleet, &results, |s| {
                format!("temp={} (~{}K)", s.temperature, s.temperature_kelvin().kelvin())
            })
        }
        Commands::Identify => {
            let results = fleet.for_each(|light| light.identify()).await;
            report(&fleet, &results, |_| "identified".to_string())
        }
        Commands::Preset { ref name } => {
            let states = resolve_preset(name, &config, &devices)?;
            let results = fleet.apply(&states).await;
            report(&fleet, &results, |_| format!("preset '{name}' applied"))
        }
        Commands::Flash { times } => effect(&fleet, Effect::flash(times)).await,
        Commands::Pulse { cycles } => effect(&fleet, Effect::pulse(cycles)).await,
        Commands::Celebrate => effect(&fleet, Effect::Celebrate).await,
        Commands::Alert { flashes } => effect(&fleet, Effect::alert(flashes)).await,
        Commands::Dim { target } => effect(&fleet, Effect::dim(target)).await,
        Commands::Mood { ref name } => effect(&fleet, Effect::Mood(Mood::parse(name)?)).await,
        Commands::Presets | Commands::Discover { .. } | Commands::Waybar => true,
    };

    Ok(ok)
}

fn config(cli: &Cli) -> anyhow::Result<AppConfig> {
    match cli.config.clone().or_else(default_config_path) {
        Some(path) => Ok(load_config(&path)?),
        None => Ok(AppConfig::default()),
    }
}

async fn devices(cli: &Cli, config: &AppConfig) -> anyhow::Result<Vec<DeviceInfo>> {
    let found = resolve_devices(config, Duration::from_secs(cli.discovery_timeout))
        .await
        .context("finding lights")?;
    let devices = select(found, &cli.lights);
    if devices.is_empty() {
        bail!("no lights found; list them under [[lights]] in the config or check the network");
    }
    Ok(devices)
}

async fn waybar_status(cli: &Cli) -> anyhow::Result<WaybarStatus> {
    let config = config(cli)?;
    let devices = devices(cli, &config).await?;
    let fleet = Fleet::from_config(&config, devices);
    let results = fleet.get_states().await;
    Ok(WaybarStatus::from_results(fleet.lights().iter().filter_map(
        |light| {
            results
                .get(light.device().key())
                .map(|result| (light.name(), result))
        },
    )))
}

async fn effect(fleet: &Fleet, effect: Effect) -> bool {
    let results = run_effect(fleet, &effect).await;
    report(fleet, &results, |s| format!("done, {}", describe(s)))
}

/// Print one line per light in fleet order; returns whether all succeeded.
fn report<T>(fleet: &Fleet, results: &FleetResults<T>, line: impl Fn(&T) -> String) -> bool {
    for light in fleet.lights() {
        match results.get(light.device().key()) {
            Some(Ok(value)) => println!("{}: {}", light.name(), line(value)),
            Some(Err(e)) => eprintln!("{}: error: {e}", light.name()),
            None => {}
        }
    }
    results.all_ok()
}

fn describe(state: &LightState) -> String {
    format!(
        "{}, brightness={}%, temp={} (~{}K)",
        on_off(state),
        state.brightness,
        state.temperature,
        state.temperature_kelvin().kelvin()
    )
}

fn on_off(state: &LightState) -> &'static str {
    if state.on { "on" } else { "off" }
}

fn show(value: Option<i64>) -> String {
    value.map_or_else(|| "-".to_string(), |v| v.to_string())
}
