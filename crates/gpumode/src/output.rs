use std::fmt::Write as _;
use std::io::{IsTerminal, Write};
use std::path::Path;

use clap::ValueEnum;
use comfy_table::{presets::UTF8_FULL, ContentArrangement, Table};
use gpumode_core::{GpuMode, Operation};
use gpumode_wire::CompletionPacket;
use serde::Serialize;

#[derive(Clone, Debug, Copy, ValueEnum)]
pub enum OutputFormat {
    Json,
    Table,
    Pretty,
    Raw,
}

impl OutputFormat {
    pub fn default_for_stdout() -> Self {
        if std::io::stdout().is_terminal() {
            Self::Table
        } else {
            Self::Json
        }
    }
}

#[derive(Serialize)]
struct ModeOutput<'a> {
    device: String,
    mode: GpuMode,
    value: u32,
    action: &'a str,
}

#[derive(Serialize)]
struct CompletionOutput {
    code: String,
    operation: &'static str,
    status: &'static str,
    status_code: u32,
    nt_status: String,
    information: usize,
    output: String,
}

#[derive(Serialize)]
struct ServingOutput<'a> {
    device: &'a str,
    path: String,
    max_connections: usize,
}

/// Print the mode a device reported (`get`) or accepted (`set`).
pub fn print_mode(device: &Path, mode: GpuMode, action: &str, format: OutputFormat) {
    match format {
        OutputFormat::Json => {
            let out = ModeOutput {
                device: device.display().to_string(),
                mode,
                value: mode.code(),
                action,
            };
            print_json(&out);
        }
        OutputFormat::Table => {
            let mut table = Table::new();
            table
                .load_preset(UTF8_FULL)
                .set_content_arrangement(ContentArrangement::Dynamic)
                .set_header(vec!["DEVICE", "MODE", "VALUE"])
                .add_row(vec![
                    device.display().to_string(),
                    mode.name().to_string(),
                    mode.code().to_string(),
                ]);
            println!("{table}");
        }
        OutputFormat::Pretty => {
            println!(
                "{action}: mode={} ({}) device={}",
                mode,
                mode.code(),
                device.display()
            );
        }
        OutputFormat::Raw => print_raw(&mode.to_le_bytes()),
    }
}

/// Print the completion of a raw control request.
pub fn print_completion(code: u32, completion: &CompletionPacket, format: OutputFormat) {
    let status = completion.status;
    match format {
        OutputFormat::Json => {
            let out = CompletionOutput {
                code: format!("{code:#010x}"),
                operation: Operation::from_code(code).name(),
                status: status.name(),
                status_code: status.code(),
                nt_status: format!("{:#010x}", status.nt_status()),
                information: completion.information(),
                output: hex(&completion.output),
            };
            print_json(&out);
        }
        OutputFormat::Table => {
            let mut table = Table::new();
            table
                .load_preset(UTF8_FULL)
                .set_content_arrangement(ContentArrangement::Dynamic)
                .set_header(vec!["CODE", "OPERATION", "STATUS", "NTSTATUS", "BYTES", "OUTPUT"])
                .add_row(vec![
                    format!("{code:#010x}"),
                    Operation::from_code(code).name().to_string(),
                    status.name().to_string(),
                    format!("{:#010x}", status.nt_status()),
                    completion.information().to_string(),
                    hex(&completion.output),
                ]);
            println!("{table}");
        }
        OutputFormat::Pretty => {
            println!(
                "code={code:#010x} ({}) status={} ntstatus={:#010x} bytes={} output={}",
                Operation::from_code(code).name(),
                status,
                status.nt_status(),
                completion.information(),
                hex(&completion.output)
            );
        }
        OutputFormat::Raw => print_raw(&completion.output),
    }
}

/// Announce a device host that is ready for clients.
pub fn print_serving(name: &str, path: &Path, max_connections: usize, format: OutputFormat) {
    match format {
        OutputFormat::Json => print_json(&ServingOutput {
            device: name,
            path: path.display().to_string(),
            max_connections,
        }),
        OutputFormat::Raw => {}
        OutputFormat::Table | OutputFormat::Pretty => {
            println!("serving {name} at {} (max {max_connections} clients)", path.display());
        }
    }
}

pub fn print_raw(data: &[u8]) {
    let mut out = std::io::stdout();
    let _ = out.write_all(data);
    let _ = out.flush();
}

fn print_json<T: Serialize>(value: &T) {
    println!(
        "{}",
        serde_json::to_string(value).unwrap_or_else(|_| "{}".to_string())
    );
    let _ = std::io::stdout().flush();
}

pub fn hex(data: &[u8]) -> String {
    data.iter().fold(String::with_capacity(data.len() * 2), |mut out, byte| {
        let _ = write!(out, "{byte:02x}");
        out
    })
}
