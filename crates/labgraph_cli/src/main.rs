//! CLI smoke entry point.
//!
//! # Responsibility
//! - Load configuration, start logging and open both stores.
//! - Keep output deterministic for quick local sanity checks.

use clap::{value_parser, Arg, ArgMatches, Command};
use labgraph_core::CoreConfig;
use log::error;
use std::path::PathBuf;
use std::process::ExitCode;

#[tokio::main]
async fn main() -> ExitCode {
    let config_path = config_path(&cli().get_matches());

    println!("labgraph_core ping={}", labgraph_core::ping());
    println!("labgraph_core version={}", labgraph_core::core_version());

    let config = match CoreConfig::load(config_path.as_deref()) {
        Ok(config) => config,
        Err(err) => {
            eprintln!("config error: {err}");
            return ExitCode::FAILURE;
        }
    };
    if let Err(err) = labgraph_core::init_from_config(&config) {
        eprintln!("logging error: {err}");
        return ExitCode::FAILURE;
    }

    if !config.in_memory {
        if let Err(err) = std::fs::create_dir_all(&config.data_dir) {
            error!(
                "event=cli_start module=cli status=error data_dir={} error={}",
                config.data_dir.display(),
                err
            );
            eprintln!("data dir error: {err}");
            return ExitCode::FAILURE;
        }
    }

    match config.open_stores() {
        Ok(_) => {
            println!("labgraph_core data_dir={}", config.data_dir.display());
            println!("labgraph_core stores=ok in_memory={}", config.in_memory);
            ExitCode::SUCCESS
        }
        Err(err) => {
            error!("event=cli_start module=cli status=error error={}", err);
            eprintln!("store error: {err}");
            ExitCode::FAILURE
        }
    }
}

fn cli() -> Command {
    Command::new("labgraph_cli")
        .about("Loads configuration and opens the LabGraph stores")
        .version(labgraph_core::core_version())
        .arg(
            Arg::new("config")
                .long("config")
                .value_name("PATH")
                .help("TOML configuration file; missing files fall back to defaults")
                .value_parser(value_parser!(PathBuf)),
        )
}

fn config_path(matches: &ArgMatches) -> Option<PathBuf> {
    matches.get_one::<PathBuf>("config").cloned()
}

#[cfg(test)]
mod tests {
    use super::{cli, config_path};
    use std::path::PathBuf;

    #[test]
    fn config_flag_takes_a_path() {
        let matches = cli()
            .try_get_matches_from(["labgraph_cli", "--config", "lab.toml"])
            .unwrap();
        assert_eq!(config_path(&matches), Some(PathBuf::from("lab.toml")));

        let matches = cli().try_get_matches_from(["labgraph_cli"]).unwrap();
        assert_eq!(config_path(&matches), None);
    }

    #[test]
    fn unknown_and_incomplete_arguments_fail() {
        assert!(cli()
            .try_get_matches_from(["labgraph_cli", "--config"])
            .is_err());
        assert!(cli()
            .try_get_matches_from(["labgraph_cli", "--verbose"])
            .is_err());
    }
}
