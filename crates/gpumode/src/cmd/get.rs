use crate::cmd::GetArgs;
use crate::exit::{device_error, CliResult, SUCCESS};
use crate::output::{print_mode, OutputFormat};

pub fn run(args: GetArgs, format: OutputFormat) -> CliResult<i32> {
    let mut client = args.client.open()?;
    let mode = client
        .get_mode()
        .map_err(|err| device_error("get failed", err))?;

    print_mode(client.path(), mode, "get", format);
    Ok(SUCCESS)
}
