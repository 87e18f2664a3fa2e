use std::process;

use phantom_gen::cli::{self, Command};
use phantom_gen::report;
use phantom_gen::runner;
use phantom_gen::RunError;

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args: Vec<String> = std::env::args().collect();
    let program = args.first().map(String::as_str).unwrap_or("phantom-gen");

    let cli_args = match cli::parse_args(args.get(1..).unwrap_or(&[])) {
        Ok(Command::Help) => {
            eprint!("{}", cli::usage(program));
            process::exit(0);
        }
        Ok(Command::Generate(cli_args)) => cli_args,
        Err(err) => {
            eprintln!("{err}");
            eprint!("{}", cli::usage(program));
            process::exit(err.exit_code());
        }
    };

    if let Err(err) = generate(cli_args) {
        eprintln!("ERROR: {err}");
        process::exit(err.exit_code());
    }
}

fn generate(cli_args: cli::CliArgs) -> Result<(), RunError> {
    let summary_path = cli_args.summary.clone();
    let request = cli_args.into_request()?;
    let summary = runner::run(&request)?;

    print!("{}", summary.format_text());

    if let Some(path) = summary_path {
        report::save_summary(&path, &summary).map_err(|source| RunError::Summary {
            path: path.clone(),
            source,
        })?;
        log::info!("Saved summary to {}", path.display());
    }
    Ok(())
}
