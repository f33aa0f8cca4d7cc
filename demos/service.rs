use std::time::Duration;

use dragon_fxconfig::config::{with_file, with_reload_interval, with_sub_section};
use dragon_fxconfig::{AppContext, Dynamic};
use serde::Deserialize;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Clone, Deserialize)]
struct ServiceConfig {
    #[serde(rename = "URL")]
    url: String,
    #[serde(rename = "True", default)]
    enabled: bool,
}

fn run_service(config: &Dynamic<ServiceConfig>) {
    for _ in 0..5 {
        let current = config.load();
        println!("Service Config: URL={}, True={}", current.url, current.enabled);
        std::thread::sleep(Duration::from_secs(1));
    }
}

fn main() -> Result<(), dragon_fxconfig::Error> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    // Edit demos/service.toml while this runs to see the value change.
    let ctx = AppContext::builder()
        .provide(dragon_fxconfig::new(vec![
            with_file("demos/service.toml", true),
            with_sub_section::<ServiceConfig>("ServiceConfig"),
            with_reload_interval(Duration::from_millis(500)),
        ]))
        .build()?;

    ctx.invoke(|ctx| ctx.get::<Dynamic<ServiceConfig>>().map(run_service))
}
