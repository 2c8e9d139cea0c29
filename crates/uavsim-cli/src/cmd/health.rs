use crate::output::print_json;
use xapp_client::{ClientConfig, XappClient};

pub fn run(
    config_path: Option<&std::path::Path>,
    endpoint: Option<String>,
    json: bool,
) -> anyhow::Result<()> {
    let mut cfg = super::load_config(config_path)?;
    if let Some(url) = endpoint {
        cfg.endpoint.url = url;
    }
    let url = cfg.endpoint.url.clone();

    let client = XappClient::new(ClientConfig::from(&cfg.endpoint))?;
    let rt = tokio::runtime::Runtime::new()?;
    let healthy = rt.block_on(client.health());

    if json {
        print_json(&serde_json::json!({
            "endpoint": url,
            "healthy": healthy,
        }))?;
    } else if healthy {
        println!("xApp at {url} is healthy");
    }

    if !healthy {
        anyhow::bail!("xApp at {url} is not reachable or unhealthy");
    }
    Ok(())
}
