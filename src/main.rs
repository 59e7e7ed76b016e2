use clap::Parser;

use mecanum_drive_runtime::config::{init_logging, Options};

#[tokio::main]
async fn main() {
    let opts = Options::parse();
    init_logging("info");

    if let Err(e) = mecanum_drive_runtime::runtime::run(opts).await {
        tracing::error!("Runtime error: {}", e);
        std::process::exit(1);
    }
}
