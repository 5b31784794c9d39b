// src/main.rs

use buildgate::{cli, config, logging, run};

#[tokio::main]
async fn main() {
    if let Err(err) = run_main().await {
        eprintln!("buildgate error: {err:?}");
        std::process::exit(1);
    }
}

async fn run_main() -> anyhow::Result<()> {
    let args = cli::parse();
    let cfg = config::load_and_validate(&args.config)?;
    logging::init_logging(args.log_level, cfg.debug)?;
    run(args, cfg).await
}
