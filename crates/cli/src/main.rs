use std::process::ExitCode;

fn main() -> ExitCode {
    guildkeeper_cli::run()
}
