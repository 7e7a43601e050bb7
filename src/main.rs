use pty_helper::cli;
use pty_helper::config::Config;
use pty_helper::{logging, DriverError};

use tracing::{error, info};

fn main() {
    let config = load_config();
    let code = run(&config);
    // Raw mode and the PTY are already released by `run`
    std::process::exit(code);
}

fn load_config() -> Config {
    Config::load().unwrap_or_else(|e| {
        eprintln!("pty-helper: ignoring configuration: {:#}", e);
        let mut config = Config::default();
        config.apply_env(|key| std::env::var(key).ok());
        config
    })
}

fn run(config: &Config) -> i32 {
    if let Err(e) = logging::init(config) {
        eprintln!("pty-helper: logging disabled: {:#}", e);
    }
    info!(version = cli::VERSION, "pty-helper starting");

    match pty_helper::run(std::env::args_os().skip(1), config) {
        Ok(code) => code,
        Err(DriverError::Usage) => {
            cli::print_usage();
            DriverError::EXIT_CODE
        }
        Err(e) => {
            error!("{}", e);
            eprintln!("pty-helper: {}", e);
            if let Some(hint) = e.hint() {
                eprintln!("{}", hint);
            }
            DriverError::EXIT_CODE
        }
    }
}
