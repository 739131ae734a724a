use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use log::LevelFilter;

#[derive(Parser)]
#[command(name = "rtarch", version, about = "Encodes rtarch instruction requests for x86")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Encode a file of instruction requests
    Encode(EncodeArgs),
}

#[derive(Args)]
pub struct EncodeArgs {
    /// Input file with one instruction request per line
    pub file: String,

    /// Output format (hex, asm, raw)
    #[arg(long, value_parser = parse_format, default_value = "hex")]
    pub format: OutputFormat,

    /// Encode without checking operand ranges
    #[arg(long)]
    pub no_validate: bool,

    /// Log level on stderr (off, error, warn, info, debug, trace)
    #[arg(long, value_name = "LEVEL", value_parser = parse_log_level, default_value = "warn")]
    pub log_level: LevelFilter,

    /// Output file (default: stdout)
    #[arg(short, long, value_name = "FILE")]
    pub output: Option<String>,
}

impl EncodeArgs {
    pub fn to_driver_flags(&self) -> DriverFlags {
        DriverFlags {
            input: PathBuf::from(&self.file),
            output: self.output.as_ref().map(PathBuf::from),
            format: self.format,
            validate: !self.no_validate,
            log_level: self.log_level,
        }
    }
}

#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub enum OutputFormat {
    /// One line per instruction, bytes in hex.
    Hex,
    /// `.byte` lines plus label directives, ready for a backend assembler.
    Asm,
    /// Plain machine code, only for requests without labels.
    Raw,
}

#[derive(Clone, Debug)]
pub struct DriverFlags {
    pub input: PathBuf,
    pub output: Option<PathBuf>,
    pub format: OutputFormat,
    pub validate: bool,
    pub log_level: LevelFilter,
}

fn parse_format(s: &str) -> Result<OutputFormat, String> {
    match s {
        "hex" => Ok(OutputFormat::Hex),
        "asm" => Ok(OutputFormat::Asm),
        "raw" => Ok(OutputFormat::Raw),
        _ => Err(format!("unknown format '{}', expected: hex, asm, raw", s)),
    }
}

fn parse_log_level(s: &str) -> Result<LevelFilter, String> {
    match s {
        "off" => Ok(LevelFilter::Off),
        "error" => Ok(LevelFilter::Error),
        "warn" => Ok(LevelFilter::Warn),
        "info" => Ok(LevelFilter::Info),
        "debug" => Ok(LevelFilter::Debug),
        "trace" => Ok(LevelFilter::Trace),
        _ => Err(format!(
            "unknown log level '{}', expected: off, error, warn, info, debug, trace",
            s
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_format() {
        assert_eq!(parse_format("asm"), Ok(OutputFormat::Asm));
        assert_eq!(
            parse_format("elf"),
            Err("unknown format 'elf', expected: hex, asm, raw".to_string())
        );
    }

    #[test]
    fn test_driver_flags() {
        let cli = Cli::parse_from([
            "rtarch",
            "encode",
            "input.rt",
            "--format",
            "raw",
            "--no-validate",
            "-o",
            "out.bin",
        ]);

        let Command::Encode(args) = cli.command;
        let flags = args.to_driver_flags();

        assert_eq!(flags.input, PathBuf::from("input.rt"));
        assert_eq!(flags.output, Some(PathBuf::from("out.bin")));
        assert_eq!(flags.format, OutputFormat::Raw);
        assert!(!flags.validate);
        assert_eq!(flags.log_level, LevelFilter::Warn);
    }

    #[test]
    fn test_defaults() {
        let cli = Cli::parse_from(["rtarch", "encode", "input.rt", "--log-level", "trace"]);
        let Command::Encode(args) = cli.command;
        let flags = args.to_driver_flags();

        assert_eq!(flags.format, OutputFormat::Hex);
        assert!(flags.validate);
        assert_eq!(flags.output, None);
        assert_eq!(flags.log_level, LevelFilter::Trace);
    }
}
