use tracing::debug;

use crate::cmd::SetArgs;
use crate::exit::{device_error, CliResult, SUCCESS};
use crate::output::{print_mode, OutputFormat};

pub fn run(args: SetArgs, format: OutputFormat) -> CliResult<i32> {
    let mut client = args.client.open()?;
    client
        .set_mode(args.mode)
        .map_err(|err| device_error("set failed", err))?;
    debug!(mode = %args.mode, device = ?client.path(), "mode set");

    print_mode(client.path(), args.mode, "set", format);
    Ok(SUCCESS)
}
