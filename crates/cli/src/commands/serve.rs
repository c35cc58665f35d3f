//! `reagent serve`: Start the HTTP API server.

use reagent_config::AppConfig;

pub async fn run(
    mut config: AppConfig,
    port_override: Option<u16>,
) -> Result<(), Box<dyn std::error::Error>> {
    if let Some(port) = port_override {
        config.gateway.port = port;
    }

    println!("reagent gateway");
    println!("   Listening: {}:{}", config.gateway.host, config.gateway.port);
    println!(
        "   Provider:  {} ({})",
        config.default_provider,
        reagent_providers::model_name(&config)
    );
    println!("   Max steps: {}", config.agent.max_steps);

    reagent_gateway::start(config).await?;

    Ok(())
}
