pub mod commands;

use clap::{Parser, Subcommand};
use std::process::ExitCode;

#[derive(Debug, Parser)]
#[command(
    name = "barberia",
    about = "Barberia operator CLI",
    long_about = "Inspect configuration, apply migrations, view the appointment week and talk to the booking assistant.",
    after_help = "Examples:\n  barberia config\n  barberia week --offset 1\n  barberia chat \"Prenota una barba per Marco domani alle 10\""
)]
pub struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    #[command(about = "Apply pending database migrations and return structured status output")]
    Migrate,
    #[command(
        about = "Inspect effective configuration values with source attribution and redaction"
    )]
    Config,
    #[command(about = "Show the appointment week, optionally shifted by whole weeks")]
    Week {
        #[arg(long, default_value_t = 0, allow_negative_numbers = true, help = "Weeks from the current one")]
        offset: i64,
    },
    #[command(about = "Send one message to the booking assistant and print its reply")]
    Chat {
        #[arg(required = true, help = "Message for the assistant")]
        message: Vec<String>,
    },
}

pub fn run() -> ExitCode {
    let cli = Cli::parse();

    let result = match cli.command {
        Command::Migrate => commands::migrate::run(),
        Command::Config => commands::config::run(),
        Command::Week { offset } => commands::week::run(offset),
        Command::Chat { message } => commands::chat::run(&message.join(" ")),
    };

    println!("{}", result.output);
    ExitCode::from(result.exit_code)
}
