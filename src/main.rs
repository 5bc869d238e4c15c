// src/main.rs

use stackctl::{cli, logging, run};

#[tokio::main]
async fn main() {
    if let Err(err) = run_main().await {
        eprintln!("stackctl error: {err}");
        std::process::exit(1);
    }
}

async fn run_main() -> stackctl::errors::Result<()> {
    let args = cli::parse();
    logging::init_logging(args.log_level)?;
    run(args).await
}
