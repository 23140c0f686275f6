#![cfg(not(tarpaulin_include))]

//! Web server entry point for the energy dashboard.

use ecowatt::app;

#[tokio::main]
async fn main() {
    env_logger::init();

    if let Err(e) = app::run("127.0.0.1:3000").await {
        eprintln!("Server error: {}", e);
        std::process::exit(1);
    }
}
