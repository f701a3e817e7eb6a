use std::process::ExitCode;

fn main() -> ExitCode {
    costdeck_cli::run()
}
