use clap::Parser;

#[tokio::main]
async fn main() {
    let cli = switchyard::cli::Cli::parse();
    if let Err(e) = switchyard::cmd::dispatch(cli).await {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}
