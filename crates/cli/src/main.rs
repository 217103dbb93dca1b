use std::process::ExitCode;

fn main() -> ExitCode {
    barberia_cli::run()
}
