use std::env;

use anyhow::Result;
use attains::{default_client, Request};
use log::info;
use serde::Deserialize;

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Balance {
    balance: i64,
    #[serde(default)]
    currency: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::init();

    let client = default_client(
        env::var("ATTAINS_ACCESS_KEY_ID")?,
        env::var("ATTAINS_SECRET_ACCESS_KEY")?,
        env::var("ATTAINS_ENDPOINT").unwrap_or_else(|_| "sms.attains.example".to_string()),
    )?;

    match client
        .call::<Balance>(Request::new().with_path("/balance"))
        .await
    {
        Ok(balance) => info!("balance: {} {}", balance.balance, balance.currency),
        Err(err) if err.code().is_some() => {
            eprintln!("service rejected the call: {}", err.service_display())
        }
        Err(err) => return Err(err.into()),
    }

    Ok(())
}
