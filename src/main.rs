use clap::Parser;
use notelog::cli::{handle_history, handle_init, handle_save, handle_show, Cli, Commands};
use tracing_subscriber::EnvFilter;

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .compact()
        .init();
}

#[tokio::main]
async fn main() {
    init_tracing();
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Init => handle_init(),
        Commands::Show { target, json } => handle_show(target, json).await,
        Commands::Save {
            target,
            content,
            stdin,
            author,
            json,
        } => handle_save(target, content, stdin, author, json).await,
        Commands::History { target, json } => handle_history(target, json).await,
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}
