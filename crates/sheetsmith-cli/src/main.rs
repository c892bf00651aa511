use std::process::ExitCode;

#[tokio::main]
async fn main() -> ExitCode {
    let matches = sheetsmith_cli::cli().get_matches();
    sheetsmith_cli::init_tracing(matches.get_flag("log-json"));

    match sheetsmith_cli::run(&matches).await {
        Ok(code) => code,
        Err(err) => {
            eprintln!("error: {err:#}");
            ExitCode::FAILURE
        }
    }
}
