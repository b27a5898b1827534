use rssagg::app::App;
use rssagg::commands::{self, Command};
use rssagg::config::Config;
use rssagg::error::{AppError, Result};

#[tokio::main]
async fn main() {
    // Initialize logging (only show warnings and errors by default)
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::WARN.into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let args: Vec<String> = std::env::args().skip(1).collect();

    if let Err(err) = run(&args).await {
        println!("Error: {err}");
        std::process::exit(1);
    }
}

async fn run(args: &[String]) -> Result<()> {
    let Some(name) = args.first() else {
        return Err(AppError::Argument(
            "usage: rssagg <command> [args...]".to_string(),
        ));
    };

    let command = Command::parse(name, &args[1..])?;
    let config = Config::load()?;
    let mut app = App::new(config).await?;

    commands::run(&mut app, command).await
}
