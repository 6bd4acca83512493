use std::path::PathBuf;

use anyhow::Result;
use clap::{arg, command, value_parser, ArgAction, ArgMatches, Command};
use saz2jmx::config::ConvertConfig;
use saz2jmx::convert::convert_archive;

fn run_convert(matches: &ArgMatches) -> Result<()> {
    let archive = matches.get_one::<PathBuf>("ARCHIVE").unwrap();
    let hosts: Vec<String> = matches
        .get_many::<String>("host")
        .unwrap_or_default()
        .cloned()
        .collect();
    let status_codes: Vec<u16> = matches
        .get_many::<u16>("status")
        .unwrap_or_default()
        .copied()
        .collect();

    let config = match matches.get_one::<PathBuf>("config") {
        Some(path) => ConvertConfig::from_file(path)?,
        None => ConvertConfig::default(),
    }
    .merge(&hosts, &status_codes);

    let output = convert_archive(
        archive,
        matches.get_one::<PathBuf>("output").map(PathBuf::as_path),
        &config,
    )?;
    println!("JMX generated: {}", output.display());
    return Ok(());
}

fn main() -> Result<()> {
    env_logger::Builder::from_default_env()
        .filter_level(log::LevelFilter::Info)
        .parse_default_env()
        .format_target(false)
        .init();

    let cmd = Command::new("saz2jmx")
        .author(clap::crate_authors!())
        .version(clap::crate_version!())
        .about(clap::crate_description!())
        .subcommand_required(true)
        .arg_required_else_help(true)
        .subcommand(
            command!("convert")
                .about("convert a fiddler session archive into a jmeter test plan")
                .arg(
                    arg!(<ARCHIVE> "archive")
                        .help("session archive (.saz) to convert")
                        .required(true)
                        .value_parser(value_parser!(PathBuf))
                        .action(ArgAction::Set),
                )
                .arg(
                    arg!(-H --host <HOST>)
                        .help("Host to keep - you can specify this argument multiple times")
                        .value_parser(value_parser!(String))
                        .action(ArgAction::Append),
                )
                .arg(
                    arg!(-s --status <CODE>)
                        .help("Response status code to keep - you can specify this argument multiple times")
                        .value_parser(value_parser!(u16))
                        .action(ArgAction::Append),
                )
                .arg(
                    arg!(-c --config <FILE>)
                        .help("JSON file with allowed_hosts and allowed_status_codes")
                        .value_parser(value_parser!(PathBuf))
                        .action(ArgAction::Set),
                )
                .arg(
                    arg!(-o --output <FILE>)
                        .help("Where to write the test plan, defaults to the archive path with a .jmx extension")
                        .value_parser(value_parser!(PathBuf))
                        .action(ArgAction::Set),
                ),
        );

    let matches = cmd.get_matches();
    let result = match matches.subcommand() {
        Some(("convert", matches)) => run_convert(matches),
        _ => unreachable!("this should've been prevented"),
    };
    return result;
}
