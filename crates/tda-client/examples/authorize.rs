/*
[INPUT]:  Consumer key from TDA_CONSUMER_KEY
[OUTPUT]: Token set printed as JSON
[POS]:    Examples - authorization-code flow
[UPDATE]: When the auth API changes
*/

use tda_client::*;

/// Example: browser consent, redirect capture, and code exchange
///
/// The consumer key's registered redirect URI must be `https://localhost:8443`.
#[tokio::main]
async fn main() -> Result<()> {
    println!("=== TD Ameritrade Authorization Example ===\n");

    let consumer_key = std::env::var("TDA_CONSUMER_KEY")
        .map_err(|_| TdaError::Config("TDA_CONSUMER_KEY is not set".to_string()))?;

    let flow = AuthorizationFlow::new(TdaClient::new()?, AuthConfig::new(consumer_key))?;
    let grant = flow.authenticate().await?;
    println!("✓ Authorization grant received");

    let tokens = flow.generate_tokens(&grant).await?;
    println!("{}", serde_json::to_string_pretty(&tokens)?);
    Ok(())
}
