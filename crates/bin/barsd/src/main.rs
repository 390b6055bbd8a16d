//! Daemon entry point for the bars query service.
//!
//! Loads configuration from the environment, builds the PostgREST bar store
//! client, and serves the SSE tool endpoint and the plain REST endpoints on
//! their own listeners.

mod config;

use std::sync::Arc;

use bars_core::SystemClock;
use bars_http::RestServerConfig;
use bars_store::{PostgrestBarStore, PostgrestConfig};
use bars_tools::{Dispatcher, ToolServerConfig};

use crate::config::BarsConfig;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    tracing_subscriber::fmt::init();

    let config = BarsConfig::from_args()?;
    let store = PostgrestBarStore::new(
        PostgrestConfig::new(&config.supabase_url, &config.supabase_key)
            .with_timeout(config.store_timeout),
    )?;
    let dispatcher = Arc::new(Dispatcher::new(store.clone(), SystemClock));
    let store = Arc::new(store);
    let clock = Arc::new(SystemClock);

    let tool_server = async {
        if config.tool_serve {
            bars_tools::serve(dispatcher.clone(), ToolServerConfig::new(config.tool_addr)).await
        } else {
            Ok(())
        }
    };
    let rest_server = async {
        if config.rest_serve {
            bars_http::serve(
                store.clone(),
                clock.clone(),
                RestServerConfig::new(config.rest_addr),
            )
            .await
        } else {
            Ok(())
        }
    };

    tokio::try_join!(tool_server, rest_server)?;
    Ok(())
}
