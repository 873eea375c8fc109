use std::io::IsTerminal;
use std::process::ExitCode;

use clap::Parser;

use dpf::{Args, OutputFormat, fake_hardware_client, real_hardware_client, run_with_log_level};

fn main() -> ExitCode {
    let args = Args::parse();
    let mut stdout = std::io::stdout();

    let log_level = args.log_level();
    let output_format = args.output_format().unwrap_or(if stdout.is_terminal() {
        OutputFormat::Pretty
    } else {
        OutputFormat::Json
    });
    let transport = args.transport_config();
    let (command, maybe_fake_args) = args.into_command_and_fake_args();
    let hardware_client = match maybe_fake_args {
        Some(fake_args) => fake_hardware_client(fake_args, transport),
        None => real_hardware_client(transport),
    };

    match run_with_log_level(
        command,
        &mut stdout,
        hardware_client,
        log_level,
        output_format,
    ) {
        Ok(()) => ExitCode::SUCCESS,
        Err(error) => {
            eprintln!("error: {error:#}");
            ExitCode::from(1)
        }
    }
}
