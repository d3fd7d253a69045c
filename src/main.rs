use clap::Parser;

use nexen_metrics::cli::Cli;
use nexen_metrics::config::StaticConfig;
use nexen_metrics::runtime::modes::run_server;
use nexen_metrics::system::init_logging;

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    let mut config = StaticConfig::load(cli.config.as_deref())?;
    cli.apply(&mut config);
    config.validate()?;

    if cli.print_config {
        println!("{}", config.to_toml()?);
        return Ok(());
    }

    // guard 需要存活到进程结束
    let _guard = init_logging(&config.logging)?;

    run_server(config).await
}
