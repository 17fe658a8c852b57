use std::process::ExitCode;

fn main() -> ExitCode {
    shopsense_cli::run()
}
