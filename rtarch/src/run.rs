use std::fs;
use std::io::{self, Write};

use log::info;

use crate::flags::{DriverFlags, OutputFormat};
use crate::parse::{self, Request};
use rtarch_asm::x86::{AssemblerX86, CheckedAssemblerX86};
use rtarch_asm::{AssemblerBuffer, Item};

pub type Result<T> = std::result::Result<T, Box<dyn std::error::Error>>;

pub fn command_encode(flags: DriverFlags) -> Result<()> {
    let input = flags.input.display().to_string();

    let text = fs::read_to_string(&flags.input)
        .map_err(|err| format!("cannot read '{}': {}", input, err))?;
    let requests = parse::parse_program(&text)?;
    info!("{}: parsed {} requests", input, requests.len());

    let buffer = encode(&requests, flags.validate)?;
    info!("{}: encoded {} bytes", input, buffer.len());

    let output = format_output(&buffer, flags.format)?;
    write_output(&flags, &output)
}

pub fn encode(requests: &[Request], validate: bool) -> Result<AssemblerBuffer> {
    if validate {
        let mut asm = CheckedAssemblerX86::new();

        for request in requests {
            asm.emit(&request.inst)
                .map_err(|err| format!("line {}: {}", request.line, err))?;
        }

        Ok(asm.finalize())
    } else {
        let mut asm = AssemblerX86::new();

        for request in requests {
            asm.emit(&request.inst);
        }

        Ok(asm.finalize())
    }
}

pub fn format_output(buffer: &AssemblerBuffer, format: OutputFormat) -> Result<Vec<u8>> {
    match format {
        OutputFormat::Hex => Ok(render_hex(buffer).into_bytes()),
        OutputFormat::Asm => Ok(buffer.render().into_bytes()),
        OutputFormat::Raw => {
            if buffer.has_directives() {
                return Err("raw output cannot hold label directives, use --format asm".into());
            }

            Ok(buffer.code())
        }
    }
}

fn render_hex(buffer: &AssemblerBuffer) -> String {
    let mut text = String::new();

    for item in buffer.items() {
        match item {
            Item::Code(bytes) => {
                let hex: Vec<String> = bytes.iter().map(|byte| format!("{:02x}", byte)).collect();
                text.push_str(&hex.join(" "));
            }

            Item::Directive(directive) => text.push_str(&directive.to_string()),
        }

        text.push('\n');
    }

    text
}

fn write_output(flags: &DriverFlags, output: &[u8]) -> Result<()> {
    match flags.output {
        Some(ref path) => {
            fs::write(path, output)
                .map_err(|err| format!("cannot write '{}': {}", path.display(), err))?;
        }

        None => {
            let stdout = io::stdout();
            let mut lock = stdout.lock();
            lock.write_all(output)?;
            lock.flush()?;
        }
    }

    Ok(())
}
