use sr_arq::{cli::initialize_from_arguments, ExitStatus};
use std::process::ExitCode;

#[tokio::main]
async fn main() -> ExitCode {
    println!("sr-arq v{}", env!("CARGO_PKG_VERSION"));
    match initialize_from_arguments().await {
        Ok(report) => {
            println!("{report}");
            if report.status == ExitStatus::Exited && report.is_complete() {
                ExitCode::SUCCESS
            } else {
                ExitCode::FAILURE
            }
        }
        Err(e) => {
            eprintln!("{e}");
            ExitCode::FAILURE
        }
    }
}
