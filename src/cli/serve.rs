use crate::{config, error, server};

/// Runs the HTTP server until the process is stopped.
pub async fn serve(addr: Option<String>) {
    let addr = addr.unwrap_or_else(config::server_addr);
    let scraper_config = config::ScraperConfig::from_env();

    if let Err(e) = server::start_api_server(&addr, scraper_config).await {
        error!("Server stopped: {}", e);
    }
}
