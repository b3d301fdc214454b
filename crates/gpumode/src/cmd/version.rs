use gpumode_core::{IOCTL_GET_GPU_MODE, IOCTL_SET_GPU_MODE};

use crate::cmd::VersionArgs;
use crate::exit::{CliResult, SUCCESS};

pub fn run(args: VersionArgs) -> CliResult<i32> {
    if !args.extended {
        println!("gpumode {}", env!("CARGO_PKG_VERSION"));
        return Ok(SUCCESS);
    }

    println!("name: gpumode");
    println!("version: {}", env!("CARGO_PKG_VERSION"));
    println!(
        "build_target: {}",
        option_env!("GPUMODE_BUILD_TARGET").unwrap_or("unknown")
    );
    println!("target_os: {}", std::env::consts::OS);
    println!("target_arch: {}", std::env::consts::ARCH);
    println!("git_hash: {}", option_env!("GIT_HASH").unwrap_or("unknown"));
    println!("ioctl_set_gpu_mode: {IOCTL_SET_GPU_MODE:#010x}");
    println!("ioctl_get_gpu_mode: {IOCTL_GET_GPU_MODE:#010x}");

    Ok(SUCCESS)
}
