//! Binary entrypoint for the `boshupdate` CLI.

use std::process::ExitCode;

fn main() -> ExitCode {
    // GITHUB_TOKEN and the BOSHUPDATE_* variables may come from a .env file.
    let _ = dotenvy::dotenv();
    match boshupdate::run(std::env::args()) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("{err}");
            ExitCode::FAILURE
        }
    }
}
