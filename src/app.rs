use std::sync::Arc;

use anyhow::{Context, Result};
use crossbeam_channel::unbounded;

use crate::api;
use crate::compose::Composer;
use crate::config;
use crate::poller::Poller;
use crate::service::{FeedService, HttpFeedService, HttpPublishService, PublishService};
use crate::ui;

pub fn run() -> Result<()> {
    let cfg = config::load(config::LoadOptions::default()).context("load config")?;
    let display_path = friendly_path(config::default_path().as_ref());

    let user_agent = if cfg.server.user_agent.trim().is_empty() {
        format!("lanblog/{}", crate::VERSION)
    } else {
        cfg.server.user_agent.clone()
    };

    let client = api::Client::new(api::ClientConfig {
        base_url: cfg.server.base_url.clone(),
        user_agent,
        http_client: None,
    })
    .context("init api client")?;
    let client = Arc::new(client);

    let feed_service: Arc<dyn FeedService> = Arc::new(HttpFeedService::new(client.clone()));
    let publish_service: Arc<dyn PublishService> = Arc::new(HttpPublishService::new(client));

    let (events_tx, events_rx) = unbounded();
    let poller = Poller::spawn(
        feed_service.clone(),
        cfg.feed.page_limit,
        cfg.feed.poll_interval,
        events_tx,
    );

    let options = ui::Options {
        status_message: format!(
            "polling {} every {} (config: {})",
            cfg.server.base_url,
            humantime::format_duration(cfg.feed.poll_interval),
            display_path
        ),
        feed_service,
        composer: Composer::new(publish_service),
        poller,
        events: events_rx,
    };

    let mut model = ui::Model::new(options);
    model.run()
}

fn friendly_path(path: Option<&std::path::PathBuf>) -> String {
    if let Some(path) = path {
        if let Some(home) = dirs::home_dir() {
            if let Ok(stripped) = path.strip_prefix(&home) {
                let mut display = String::from("~");
                if !stripped.as_os_str().is_empty() {
                    display.push_str(&format!("/{}", stripped.display()));
                }
                return display;
            }
        }
        path.display().to_string()
    } else {
        "~/.config/lanblog/config.yaml".to_string()
    }
}
