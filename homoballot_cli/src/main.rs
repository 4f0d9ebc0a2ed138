#[macro_use]
extern crate serde;

#[macro_use]
extern crate log;

use clap::{App, Arg, SubCommand};
use num_enum::TryFromPrimitive;

mod command_keygen;
mod command_simulate;
mod config;

use command_keygen::*;
use command_simulate::*;
use config::Config;

#[derive(TryFromPrimitive, PartialEq, Copy, Clone)]
#[repr(u8)]
enum Verbosity {
    Warn = 0,
    Info = 1,
    Debug = 2,
}

impl Verbosity {
    fn filter(self) -> &'static str {
        match self {
            Verbosity::Warn => "warn",
            Verbosity::Info => "info",
            Verbosity::Debug => "debug",
        }
    }
}

fn main() {
    let matches = App::new("homoballot")
        .version("0.1")
        .about("Runs and verifies homomorphically tallied elections")
        .arg(
            Arg::with_name("v")
                .short("v")
                .multiple(true)
                .help("Sets the level of verbosity"),
        )
        .arg(
            Arg::with_name("bits")
                .long("bits")
                .takes_value(true)
                .help("Paillier modulus size - can also be set with HOMOBALLOT_KEY_BITS"),
        )
        .subcommand(SubCommand::with_name("keygen").about("Generate an administrator keypair"))
        .subcommand(
            SubCommand::with_name("paillier-keygen")
                .about("Generate an election key and print its public half as JSON"),
        )
        .subcommand(
            SubCommand::with_name("simulate")
                .about("Run a complete election in-process and print the results")
                .arg(
                    Arg::with_name("name")
                        .long("name")
                        .takes_value(true)
                        .help("Election name"),
                )
                .arg(
                    Arg::with_name("candidates")
                        .long("candidates")
                        .takes_value(true)
                        .help("Comma separated candidate names (default: Yes,No)"),
                )
                .arg(
                    Arg::with_name("voters")
                        .long("voters")
                        .takes_value(true)
                        .help("Number of voters (default: 10)"),
                )
                .arg(
                    Arg::with_name("threads")
                        .long("threads")
                        .takes_value(true)
                        .help("Number of submitting threads (default: 4)"),
                )
                .arg(
                    Arg::with_name("print-audit")
                        .long("print-audit")
                        .help("Include the audit log in the output"),
                ),
        )
        .get_matches();

    let occurrences = matches.occurrences_of("v").min(2) as u8;
    let verbosity = Verbosity::try_from_primitive(occurrences).unwrap_or(Verbosity::Debug);
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(verbosity.filter()))
        .init();

    let mut config = Config::from_env().unwrap_or_else(|e| {
        eprintln!("homoballot: {}", e);
        std::process::exit(1);
    });
    if matches.is_present("bits") {
        let bits = parse_count(&matches, "bits", config.key_bits);
        config = config.with_key_bits(bits).unwrap_or_else(|e| {
            eprintln!("homoballot: {}", e);
            std::process::exit(1);
        });
    }

    // Subcommands
    if let Some(matches) = matches.subcommand_matches("keygen") {
        command_keygen(matches);
        std::process::exit(0);
    }

    if let Some(matches) = matches.subcommand_matches("paillier-keygen") {
        command_paillier_keygen(matches, &config);
        std::process::exit(0);
    }

    if let Some(matches) = matches.subcommand_matches("simulate") {
        command_simulate(matches, &config);
        std::process::exit(0);
    }

    eprintln!("homoballot: no command given, see --help");
    std::process::exit(1);
}

pub(crate) fn parse_count(matches: &clap::ArgMatches, name: &str, default: usize) -> usize {
    match matches.value_of(name) {
        Some(val) => val.parse().unwrap_or_else(|_| {
            eprintln!("homoballot: --{} must be a number", name);
            std::process::exit(1);
        }),
        None => default,
    }
}
