use std::path::PathBuf;
use std::time::Duration;

use clap::{Args, Subcommand};
use gpumode_core::{GpuMode, DEFAULT_DEVICE_NAME};
use gpumode_device::{DeviceClient, DEFAULT_MAX_CONNECTIONS};
use gpumode_wire::WireConfig;

use crate::exit::{device_error, CliError, CliResult, USAGE};
use crate::output::OutputFormat;

pub mod control;
pub mod get;
pub mod serve;
pub mod set;
pub mod version;

/// Device path used when neither an argument nor `GPUMODE_DEVICE` is given.
pub const DEFAULT_DEVICE_PATH: &str = "/tmp/gpumode.sock";

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Host a device until interrupted.
    Serve(ServeArgs),
    /// Set the device's GPU mode.
    Set(SetArgs),
    /// Print the device's GPU mode.
    Get(GetArgs),
    /// Send a raw control request and print its completion.
    Control(ControlArgs),
    /// Show version information.
    Version(VersionArgs),
}

pub fn run(command: Command, format: OutputFormat) -> CliResult<i32> {
    match command {
        Command::Serve(args) => serve::run(args, format),
        Command::Set(args) => set::run(args, format),
        Command::Get(args) => get::run(args, format),
        Command::Control(args) => control::run(args, format),
        Command::Version(args) => version::run(args),
    }
}

#[derive(Args, Debug)]
pub struct ServeArgs {
    /// Socket path to bind.
    #[arg(env = "GPUMODE_DEVICE", default_value = DEFAULT_DEVICE_PATH)]
    pub path: PathBuf,
    /// Device name reported in logs.
    #[arg(long, default_value = DEFAULT_DEVICE_NAME)]
    pub name: String,
    /// Clients beyond this many are disconnected on accept.
    #[arg(long, default_value_t = DEFAULT_MAX_CONNECTIONS)]
    pub max_connections: usize,
    /// Drop clients idle for longer than this (e.g. 30s, 500ms).
    #[arg(long)]
    pub idle_timeout: Option<String>,
}

/// Where a client command finds its device.
#[derive(Args, Debug)]
pub struct ClientArgs {
    /// Device socket path.
    #[arg(long, short = 'd', env = "GPUMODE_DEVICE", default_value = DEFAULT_DEVICE_PATH)]
    pub device: PathBuf,
    /// Maximum time to wait for the device to answer (e.g. 5s, 500ms).
    #[arg(long, default_value = "5s")]
    pub timeout: String,
}

impl ClientArgs {
    /// Open the device with the configured timeout.
    pub fn open(&self) -> CliResult<DeviceClient> {
        let timeout = parse_duration(&self.timeout)?;
        let config = WireConfig {
            read_timeout: Some(timeout),
            write_timeout: Some(timeout),
            ..WireConfig::default()
        };
        DeviceClient::open_with_config(&self.device, config)
            .map_err(|err| device_error("open failed", err))
    }
}

#[derive(Args, Debug)]
pub struct SetArgs {
    /// Mode to set: integrated, discrete, 0 or 1.
    pub mode: GpuMode,
    #[command(flatten)]
    pub client: ClientArgs,
}

#[derive(Args, Debug)]
pub struct GetArgs {
    #[command(flatten)]
    pub client: ClientArgs,
}

#[derive(Args, Debug)]
pub struct ControlArgs {
    /// Control code, decimal or 0x-prefixed hex.
    #[arg(long, value_parser = parse_u32)]
    pub code: u32,
    /// Input as one little-endian u32.
    #[arg(long, conflicts_with = "input_hex")]
    pub input_u32: Option<u32>,
    /// Input as hex bytes (e.g. 01000000).
    #[arg(long, conflicts_with = "input_u32")]
    pub input_hex: Option<String>,
    /// Output buffer capacity in bytes.
    #[arg(long, default_value_t = gpumode_core::MODE_VALUE_SIZE as u32)]
    pub output_capacity: u32,
    #[command(flatten)]
    pub client: ClientArgs,
}

#[derive(Args, Debug)]
pub struct VersionArgs {
    /// Show extended build provenance.
    #[arg(long)]
    pub extended: bool,
}

/// Parse `5s`, `250ms` or a bare number of seconds.
pub fn parse_duration(input: &str) -> CliResult<Duration> {
    let input = input.trim();
    if input.is_empty() {
        return Err(CliError::new(USAGE, "duration must not be empty"));
    }

    let (number, millis) = if let Some(num) = input.strip_suffix("ms") {
        (num, true)
    } else if let Some(num) = input.strip_suffix('s') {
        (num, false)
    } else {
        (input, false)
    };

    let value: u64 = number
        .parse()
        .map_err(|_| CliError::new(USAGE, format!("invalid duration value: {input}")))?;

    if value == 0 {
        return Err(CliError::new(USAGE, "duration must be greater than zero"));
    }

    Ok(if millis {
        Duration::from_millis(value)
    } else {
        Duration::from_secs(value)
    })
}

fn parse_u32(input: &str) -> Result<u32, String> {
    let input = input.trim();
    let parsed = match input
        .strip_prefix("0x")
        .or_else(|| input.strip_prefix("0X"))
    {
        Some(hex) => u32::from_str_radix(hex, 16),
        None => input.parse(),
    };
    parsed.map_err(|err| format!("invalid control code {input:?}: {err}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_duration_seconds_and_millis() {
        assert_eq!(parse_duration("2s").unwrap(), Duration::from_secs(2));
        assert_eq!(parse_duration("150ms").unwrap(), Duration::from_millis(150));
        assert_eq!(parse_duration("3").unwrap(), Duration::from_secs(3));
    }

    #[test]
    fn parse_duration_rejects_invalid_values() {
        assert!(parse_duration("0s").is_err());
        assert!(parse_duration("bad").is_err());
        assert_eq!(parse_duration("").unwrap_err().code, USAGE);
    }

    #[test]
    fn parse_u32_accepts_decimal_and_hex() {
        assert_eq!(parse_u32("0x222004"), Ok(0x0022_2004));
        assert_eq!(parse_u32("0X222000"), Ok(0x0022_2000));
        assert_eq!(parse_u32("2236420"), Ok(0x0022_2004));
        assert!(parse_u32("0xzz").is_err());
        assert!(parse_u32("-1").is_err());
    }
}
