use clap::Parser;
use dayplanner::Cli;

#[tokio::main]
async fn main() {
    if let Err(message) = dayplanner::run(Cli::parse()).await {
        eprintln!("error: {message}");
        std::process::exit(1);
    }
}
