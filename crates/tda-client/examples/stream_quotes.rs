/*
[INPUT]:  Access token from TDA_ACCESS_TOKEN
[OUTPUT]: Streaming events printed to stdout
[POS]:    Examples - streaming session handling
[UPDATE]: When the streaming API changes
*/

use reqwest::Method;
use tda_client::*;

/// Example: log in to the streamer and subscribe to quotes
///
/// Fetches user principals with an existing access token, opens a session
/// for the first account, and prints events until the socket closes.
#[tokio::main]
async fn main() -> Result<()> {
    println!("=== TD Ameritrade Streaming Example ===\n");

    let access_token = std::env::var("TDA_ACCESS_TOKEN")
        .map_err(|_| TdaError::Config("TDA_ACCESS_TOKEN is not set".to_string()))?;

    let client = TdaClient::new()?;
    let builder = client
        .bearer_request(Method::GET, "/v1/userprincipals", &access_token)?
        .query(&[("fields", "streamerConnectionInfo,streamerSubscriptionKeys")]);
    let principals: UserPrincipals = client.send_json(builder).await?;
    println!("✓ User principals loaded ({} accounts)", principals.accounts.len());

    let mut streamer = Streamer::new(
        &principals,
        StreamerOptions {
            verbosity: Verbosity::Error,
            ..Default::default()
        },
    )?;
    let mut events = streamer
        .take_receiver()
        .ok_or(TdaError::SessionClosed)?;

    let subscribe = streamer
        .service_request("QUOTE", "SUBS")
        .parameter("keys", "AAPL,MSFT")
        .parameter("fields", "0,1,2,3");
    streamer.request(&RequestEnvelope::single(subscribe)).await?;

    while let Some(event) = events.recv().await {
        match event {
            StreamEvent::Connected => println!("✓ Connected, login sent"),
            StreamEvent::Message(body) => println!("{body}"),
            StreamEvent::Error(err) => eprintln!("stream error: {err}"),
            StreamEvent::Disconnected => {
                println!("\n✓ Disconnected");
                break;
            }
        }
    }
    Ok(())
}
