use anyhow::Result;
use clap::Parser;

fn main() -> Result<()> {
    let cli = mtx::cli::Cli::parse();
    mtx::init_tracing(cli.log_filter.clone())?;

    let config = mtx::config::from_cli(&cli)?;
    let stdout = std::io::stdout();
    let mut handle = stdout.lock();
    mtx::commands::execute(&config, cli.command, &mut handle)?;

    Ok(())
}
