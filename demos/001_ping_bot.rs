//! Ping-reply bot.
//!
//! Demonstrates:
//! - Building a client from `GUILDED_TOKEN`
//! - Subscribing before login to see the ready event
//! - Replying to `!ping` and reacting to `!react`
//! - Resolving an author's avatar through the identity cache
//!
//! Usage:
//!   GUILDED_TOKEN=... cargo run --example 001_ping_bot
//!   GUILDED_TOKEN=... cargo run --example 001_ping_bot -- --debug

mod common;

// ============================================================================
// Imports
// ============================================================================

use anyhow::Context;
use common::Args;
use guilded_client::{Client, ClientBuilder, Dispatch, Event, EventKind, Message};

// ============================================================================
// Main
// ============================================================================

#[tokio::main]
async fn main() {
    let args = Args::parse();
    common::init_logging(args.debug);

    if let Err(e) = run(args).await {
        eprintln!("\n[ERROR] {e:#}");
        std::process::exit(1);
    }
}

async fn run(args: Args) -> anyhow::Result<()> {
    println!("=== 001: Ping Bot ===\n");

    let client = ClientBuilder::from_env()
        .build()
        .context("building client (is GUILDED_TOKEN set?)")?;

    client.subscribe(EventKind::Ready, |dispatch| {
        if let Event::Ready { user, .. } = &dispatch.event {
            println!("    ✓ Ready as {}", user.id());
        }
    });

    let (_, mut messages) = client.events(Some(EventKind::MessageCreated));

    println!("[1] Logging in...");
    client.login().await.context("gateway login")?;

    let worker = tokio::spawn(async move {
        while let Some(dispatch) = messages.recv().await {
            if let Err(e) = handle(&dispatch).await {
                eprintln!("    [WARN] {e:#}");
            }
        }
    });

    common::wait_for_exit(args.no_wait).await;

    println!("\n[2] Closing...");
    client.close().await;
    worker.abort();
    println!("    ✓ Closed");

    Ok(())
}

async fn handle(dispatch: &Dispatch) -> anyhow::Result<()> {
    let Event::MessageCreated(message) = &dispatch.event else {
        return Ok(());
    };
    let client = dispatch.session.client()?;

    match message.content.trim() {
        "!ping" => reply_with_avatar(&client, message).await?,
        "!react" => message.react_default(&client).await?,
        _ => {}
    }
    Ok(())
}

async fn reply_with_avatar(client: &Client, message: &Message) -> anyhow::Result<()> {
    let avatar = match &message.author {
        Some(author) => author.fetch_avatar_url(client).await?,
        None => "unknown".to_string(),
    };

    message
        .reply(client, format!("pong ({avatar})"))
        .await
        .context("sending reply")?;
    Ok(())
}
