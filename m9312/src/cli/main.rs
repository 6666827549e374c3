mod error;

use clap::{Arg, ArgAction, ArgGroup, ArgMatches, Command, value_parser};
use log::{info, error, LevelFilter};
use m9312::{Options, Padding};
use m9312_utils::file::{Input, Output};
use std::io::{self, Write};

use crate::error::ConvertError;

const UNSCRAMBLE: &str = "unscramble";
const SCRAMBLE: &str = "scramble";
const DUMP: &str = "dump";
const MODE: &str = "mode";
const INPUT_PATH: &str = "INPUT";
const OUTPUT_PATH: &str = "OUTPUT";
const ORIGIN: &str = "origin";
const TRANSFER: &str = "transfer";
const LEADER: &str = "leader";
const INTERRECORD: &str = "interrecord";
const TRAILER: &str = "trailer";
const VERBOSITY: &str = "verbosity";

const USAGE_EXIT: i32 = 1;
const FAILURE_EXIT: u8 = 2;

/// All supported conversions.
#[derive(Debug, PartialEq, Eq, Copy, Clone)]
enum Mode {
    Unscramble,
    Scramble,
    Dump,
}

impl Mode {
    fn from_args(args: &ArgMatches) -> Self {
        if args.get_flag(UNSCRAMBLE) {
            Mode::Unscramble
        } else if args.get_flag(SCRAMBLE) {
            Mode::Scramble
        } else {
            Mode::Dump
        }
    }
}

/// Parse a PDP-11 address written in octal.
fn parse_octal_address(s: &str) -> Result<u16, String> {
    let address = u16::from_str_radix(s, 8)
        .map_err(|e| format!("'{}' is not a 16-bit octal address: {}", s, e))?;
    if address % 2 != 0 {
        return Err(format!("'{}' is not a word address", s));
    }
    Ok(address)
}

fn cli() -> Command {
    // Hack to make the build dirty when the toml changes.
    include_str!("../../Cargo.toml");

    clap::command!()
        .after_help("Either path may be '-' to use stdin or stdout.")
        .arg(Arg::new(UNSCRAMBLE)
            .help("Unscramble a PROM hex file into DEC absolute binary.")
            .short('u')
            .long("unscramble")
            .action(ArgAction::SetTrue))
        .arg(Arg::new(SCRAMBLE)
            .help("Scramble a DEC absolute binary file into a PROM hex file.")
            .short('s')
            .long("scramble")
            .action(ArgAction::SetTrue))
        .arg(Arg::new(DUMP)
            .help("Unscramble a PROM hex file into an octal dump.")
            .short('d')
            .long("dump")
            .action(ArgAction::SetTrue))
        .group(ArgGroup::new(MODE)
            .args([UNSCRAMBLE, SCRAMBLE, DUMP])
            .required(true))
        .arg(Arg::new(INPUT_PATH)
            .help("The file to convert.")
            .action(ArgAction::Set)
            .required(true))
        .arg(Arg::new(OUTPUT_PATH)
            .help("Where to place the result.")
            .action(ArgAction::Set)
            .required(true))
        .arg(Arg::new(ORIGIN)
            .help("Octal load address of the first ROM word.")
            .long("origin")
            .action(ArgAction::Set)
            .default_value("173000")
            .value_parser(parse_octal_address))
        .arg(Arg::new(TRANSFER)
            .help("Octal start address for the binary end record. \
                   Defaults to the origin.")
            .long("transfer")
            .action(ArgAction::Set)
            .value_parser(parse_octal_address))
        .arg(Arg::new(LEADER)
            .help("NUL bytes written before the first binary record.")
            .long("leader")
            .action(ArgAction::Set)
            .default_value("0")
            .value_parser(value_parser!(usize)))
        .arg(Arg::new(INTERRECORD)
            .help("NUL bytes written after each binary data record.")
            .long("interrecord")
            .action(ArgAction::Set)
            .default_value("0")
            .value_parser(value_parser!(usize)))
        .arg(Arg::new(TRAILER)
            .help("NUL bytes written after the binary end record.")
            .long("trailer")
            .action(ArgAction::Set)
            .default_value("0")
            .value_parser(value_parser!(usize)))
        .arg(Arg::new(VERBOSITY)
            .help("Specify up to three times to increase the verbosity of output.")
            .short('v')
            .long("verbose")
            .action(ArgAction::Count)
            .value_parser(value_parser!(u8).range(..=3)))
}

fn logging_format(formatter: &mut env_logger::fmt::Formatter,
                  record: &log::Record) -> io::Result<()> {
    let style = formatter.default_level_style(record.level());
    writeln!(formatter, "{:>7}  {}", style.value(record.level()), record.args())
}

/// Logging setup for normal build (not testing).
#[cfg(not(test))]
fn init_logging(level: LevelFilter) {
    env_logger::Builder::new()
        .filter_level(level)
        .format(logging_format)
        .init();
}

/// Logging setup for testing build (properly captures stdout and ignores
/// multiple invocations).
#[cfg(test)]
fn init_logging(level: LevelFilter) {
    let _ = env_logger::Builder::new()
        .filter_level(level)
        .format(logging_format)
        .is_test(true)
        .try_init();
}

/// Collect the conversion settings from the command line.
fn conversion_options(args: &ArgMatches) -> Options {
    Options {
        origin: *args.get_one(ORIGIN).unwrap(),
        transfer: args.get_one(TRANSFER).copied(),
        padding: Padding {
            leader: *args.get_one(LEADER).unwrap(),
            interrecord: *args.get_one(INTERRECORD).unwrap(),
            trailer: *args.get_one(TRAILER).unwrap(),
        },
    }
}

/// Main run function; returns an exit code.
fn run(args: ArgMatches) -> u8 {
    return match _run(args) {
        Ok(()) => 0,
        Err(e) => {
            error!("{}", e.0);
            FAILURE_EXIT
        }
    };

    fn _run(args: ArgMatches) -> Result<(), ConvertError> {
        // Set up logging.
        let log_level = match args.get_count(VERBOSITY) {
            0 => LevelFilter::Warn,
            1 => LevelFilter::Info,
            2 => LevelFilter::Debug,
            3 => LevelFilter::Trace,
            _ => unreachable!(),
        };
        init_logging(log_level);

        let mode = Mode::from_args(&args);
        let options = conversion_options(&args);
        info!("Mode {:?} with {:?}.", mode, options);

        // Open input path.
        let input_path = args.get_one::<String>(INPUT_PATH).unwrap();
        let mut input = Input::open(input_path)
            .map_err(|e| {
                ConvertError(format!(
                    "Couldn't open input file '{}': {}", input_path, e))
            })?;
        info!("Reading from '{}'.", input_path);

        // Open output path.
        let output_path = args.get_one::<String>(OUTPUT_PATH).unwrap();
        let mut output = Output::create(output_path)
            .map_err(|e| {
                ConvertError(format!(
                    "Failed to create output file '{}': {}", output_path, e))
            })?;
        info!("Writing to '{}'.", output_path);

        // Run the conversion.
        let result = match mode {
            Mode::Unscramble => m9312::unscramble_hex(&mut input, &mut output, &options),
            Mode::Scramble => m9312::scramble_abs(&mut input, &mut output, &options),
            Mode::Dump => m9312::dump_hex(&mut input, &mut output, &options),
        };
        result?;
        info!("Conversion complete.");

        // Only now is the output worth keeping.
        output.commit()
            .map_err(|e| {
                ConvertError(format!("Failed to write output: {}", e))
            })?;
        info!("Result written.");

        Ok(())
    }
}

fn main() {
    let args = match cli().try_get_matches() {
        Ok(args) => args,
        Err(e) => {
            // Help and version requests are not failures.
            let _ = e.print();
            std::process::exit(if e.use_stderr() { USAGE_EXIT } else { 0 });
        }
    };
    std::process::exit(run(args).into());
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::fs;
    use tempfile;

    macro_rules! invoke {
        ($($args:expr),+) => {{
            let args = cli().try_get_matches_from(
                    vec!["m9312".to_string(), $($args.to_string()),*])
                .unwrap();
            run(args)
        }}
    }

    #[test]
    fn test_unscramble() {
        let tempdir = tempfile::tempdir().unwrap();
        let out = tempdir.path().join("rom.abs");
        let ret = invoke!("-u", "testdata/rom.hex", out.to_str().unwrap());
        assert_eq!(ret, 0);
        assert_eq!(fs::read(out).unwrap(), fs::read("testdata/rom.abs").unwrap());
    }

    #[test]
    fn test_scramble() {
        let tempdir = tempfile::tempdir().unwrap();
        let out = tempdir.path().join("rom.hex");
        let ret = invoke!("--scramble", "-v", "testdata/rom.abs", out.to_str().unwrap());
        assert_eq!(ret, 0);
        assert_eq!(fs::read_to_string(out).unwrap(),
                   fs::read_to_string("testdata/rom.hex").unwrap());
    }

    #[test]
    fn test_dump() {
        let tempdir = tempfile::tempdir().unwrap();
        let out = tempdir.path().join("rom.dump");
        let ret = invoke!("-d", "testdata/rom.hex", out.to_str().unwrap());
        assert_eq!(ret, 0);
        assert_eq!(fs::read_to_string(out).unwrap(),
                   fs::read_to_string("testdata/rom.dump").unwrap());
    }

    #[test]
    fn test_dump_origin() {
        let tempdir = tempfile::tempdir().unwrap();
        let out = tempdir.path().join("rom.dump");
        let ret = invoke!("-d", "--origin", "165000", "testdata/rom.hex",
            out.to_str().unwrap());
        assert_eq!(ret, 0);
        let dump = fs::read_to_string(out).unwrap();
        assert!(dump.starts_with("165000: 012700"));
    }

    #[test]
    fn test_padding_and_transfer() {
        let tempdir = tempfile::tempdir().unwrap();
        let out = tempdir.path().join("rom.abs");
        let ret = invoke!("-u", "--leader", "4", "--trailer", "3",
            "--transfer", "173024", "testdata/rom.hex", out.to_str().unwrap());
        assert_eq!(ret, 0);
        let abs = fs::read(out).unwrap();
        assert_eq!(&abs[..6], &[0, 0, 0, 0, 0x01, 0x00]);
        assert_eq!(&abs[abs.len() - 10..],
                   &[0x01, 0x00, 0x06, 0x00, 0x14, 0xF6, 0xEF, 0, 0, 0]);
    }

    /// Ensure an unsuccessful conversion does not persist the file.
    #[test]
    fn test_fail_output_delete() {
        let tempdir = tempfile::tempdir().unwrap();
        let bad = tempdir.path().join("bad.hex");
        fs::write(&bad, ":0100000042BC\n:00000001FF\n").unwrap();
        let out = tempdir.path().join("out");
        let ret = invoke!("-u", bad.to_str().unwrap(), out.to_str().unwrap());
        assert_eq!(ret, FAILURE_EXIT);
        assert!(fs::metadata(out).is_err());
    }

    #[test]
    fn test_missing_input() {
        let tempdir = tempfile::tempdir().unwrap();
        let out = tempdir.path().join("out");
        let ret = invoke!("-s", tempdir.path().join("nope").to_str().unwrap(),
            out.to_str().unwrap());
        assert_eq!(ret, FAILURE_EXIT);
        assert!(fs::metadata(out).is_err());
    }

    /// Ensure a bad command line does not create the file.
    #[test]
    fn test_output_transience() {
        let tempdir = tempfile::tempdir().unwrap();
        let out = tempdir.path().join("out");
        let ret = std::panic::catch_unwind(|| {
            invoke!("-u", "-d", "testdata/rom.hex", out.to_str().unwrap())
        });
        assert!(ret.is_err());
        assert!(fs::metadata(out).is_err())
    }

    #[test]
    fn test_bad_addresses() {
        for address in ["173001", "200000", "8", "xyz"] {
            let ret = cli().try_get_matches_from(
                vec!["m9312", "-d", "--origin", address, "a", "b"]);
            assert!(ret.is_err(), "{}", address);
        }
    }
}
