//! SPBI dashboard - view and release rows in the fuel-dispensing database.

mod cli;

use cli::Cli;
use spbi_dashboard::config::ConnectionDescriptor;
use spbi_dashboard::dashboard::Dashboard;
use spbi_dashboard::error::{DashboardError, Result};
use spbi_dashboard::logging;
use spbi_dashboard::output;
use spbi_dashboard::query::QueryGateway;
use tracing::{error, info};

#[tokio::main]
async fn main() {
    let cli = Cli::parse_args();

    match &cli.log_file {
        Some(path) => logging::init_file_logging(path.as_deref()),
        None => logging::init_stderr_logging(),
    }

    let logs_to_file = cli.logs_to_file();
    if let Err(e) = run(cli).await {
        error!("{}: {}", e.category(), e);
        if logs_to_file {
            eprintln!("{}: {}", e.category(), e);
        }
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<()> {
    let format = cli
        .parse_output_format()
        .map_err(DashboardError::validation)?;
    let action = cli.to_action()?;

    let config_path = cli.config_path();
    info!("Loading config from: {}", config_path.display());
    let descriptor = ConnectionDescriptor::load_from_file(&config_path)?;
    descriptor.validate()?;
    info!("Connection: {}", descriptor.display_string());

    let Some(action) = action else {
        println!("Configuration OK: {}", descriptor.display_string());
        return Ok(());
    };

    let dashboard = Dashboard::new(QueryGateway::new(), descriptor);
    let outcome = dashboard.run(&action).await?;
    println!("{}", output::render(&outcome, format)?);

    Ok(())
}
