use crate::cmd::ControlArgs;
use crate::exit::{device_error, status_exit_code, CliError, CliResult, USAGE};
use crate::output::{print_completion, OutputFormat};

/// Send one raw request. The exit code follows the completion status.
pub fn run(args: ControlArgs, format: OutputFormat) -> CliResult<i32> {
    let input = resolve_input(&args)?;
    let mut client = args.client.open()?;
    let completion = client
        .device_control(args.code, input.as_deref(), args.output_capacity)
        .map_err(|err| device_error("control failed", err))?;

    print_completion(args.code, &completion, format);
    Ok(status_exit_code(completion.status))
}

fn resolve_input(args: &ControlArgs) -> CliResult<Option<Vec<u8>>> {
    if let Some(value) = args.input_u32 {
        return Ok(Some(value.to_le_bytes().to_vec()));
    }
    if let Some(hex) = &args.input_hex {
        return decode_hex(hex).map(Some);
    }
    Ok(None)
}

fn decode_hex(input: &str) -> CliResult<Vec<u8>> {
    let digits: Vec<u8> = input
        .bytes()
        .filter(|b| !b.is_ascii_whitespace())
        .collect();
    if digits.len() % 2 != 0 {
        return Err(CliError::new(
            USAGE,
            "--input-hex needs an even number of digits",
        ));
    }
    digits
        .chunks_exact(2)
        .map(|pair| {
            let text = std::str::from_utf8(pair).unwrap_or("");
            u8::from_str_radix(text, 16).map_err(|_| {
                CliError::new(USAGE, format!("--input-hex has a bad digit pair {text:?}"))
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decode_hex_reads_pairs() {
        assert_eq!(decode_hex("01000000").unwrap(), vec![1, 0, 0, 0]);
        assert_eq!(decode_hex("ff 0A").unwrap(), vec![0xff, 0x0a]);
        assert!(decode_hex("").unwrap().is_empty());
    }

    #[test]
    fn decode_hex_rejects_bad_input() {
        assert_eq!(decode_hex("010").unwrap_err().code, USAGE);
        assert_eq!(decode_hex("zz").unwrap_err().code, USAGE);
    }
}
