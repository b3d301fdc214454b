use std::sync::Arc;

use gpumode_core::Device;
use gpumode_device::{DeviceHost, HostConfig, ShutdownHandle};
use gpumode_wire::WireConfig;
use tracing::info;

use crate::cmd::{parse_duration, ServeArgs};
use crate::exit::{device_error, CliError, CliResult, INTERNAL, SUCCESS, USAGE};
use crate::output::{print_serving, OutputFormat};

pub fn run(args: ServeArgs, format: OutputFormat) -> CliResult<i32> {
    if args.max_connections == 0 {
        return Err(CliError::new(USAGE, "--max-connections must be at least 1"));
    }
    let idle_timeout = args.idle_timeout.as_deref().map(parse_duration).transpose()?;
    let config = HostConfig {
        wire: WireConfig {
            read_timeout: idle_timeout,
            ..WireConfig::default()
        },
        max_connections: args.max_connections,
    };

    let device = Arc::new(Device::create(args.name.as_str()));
    let host = DeviceHost::bind(&args.path, device)
        .map_err(|err| device_error("bind failed", err))?
        .with_config(config);

    install_ctrlc_handler(host.shutdown_handle())?;
    print_serving(&args.name, host.path(), args.max_connections, format);

    host.serve()
        .map_err(|err| device_error("serve failed", err))?;
    info!(path = ?args.path, "device host exited");
    Ok(SUCCESS)
}

fn install_ctrlc_handler(shutdown: ShutdownHandle) -> CliResult<()> {
    ctrlc::set_handler(move || shutdown.trigger()).map_err(|err| {
        CliError::new(INTERNAL, format!("signal handler setup failed: {err}"))
    })
}
