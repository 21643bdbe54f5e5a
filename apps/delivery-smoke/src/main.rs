use std::{env, sync::Arc};

use delivery_core::{DeliveryEvent, DeliveryTuning, MessageSink};
use delivery_http::{HttpChatClient, HttpChatConfig, LongPollClient, Poller, Sender};
use tracing::{info, warn};
use url::Url;

mod logging;

const DEFAULT_BASE_URL: &str = "http://localhost:8080";

#[tokio::main]
async fn main() {
    logging::init();

    let base_url = env::var("POLLCHAT_BASE_URL").unwrap_or_else(|_| DEFAULT_BASE_URL.to_owned());
    let base_url = match Url::parse(&base_url) {
        Ok(url) => url,
        Err(err) => {
            eprintln!("Invalid POLLCHAT_BASE_URL '{base_url}': {err}");
            std::process::exit(1);
        }
    };

    let tuning = DeliveryTuning::default();
    let transport = match HttpChatClient::new(HttpChatConfig::with_tuning(base_url.clone(), &tuning))
    {
        Ok(client) => Arc::new(client),
        Err(err) => {
            eprintln!("Failed to build HTTP client: {err}");
            std::process::exit(1);
        }
    };

    let sink = MessageSink::new(128);
    let mut events = sink.subscribe();

    let poller = Poller::new(Arc::clone(&transport), sink.clone(), &tuning);
    let longpoll = LongPollClient::new(Arc::clone(&transport), sink.clone(), &tuning);
    let sender = Sender::new(Arc::clone(&transport));

    info!(%base_url, "starting both retrieval strategies; ctrl-c to stop");
    poller.start().await;
    longpoll.start().await;

    // Optional one-shot send so a fresh server has something to deliver.
    if let (Ok(user), Ok(text)) = (env::var("POLLCHAT_USER"), env::var("POLLCHAT_TEXT")) {
        match sender.send(user, text).await {
            Ok(ack) => info!(ack = %ack.0, "smoke send acknowledged"),
            Err(err) => warn!(code = %err.code, "smoke send failed: {err}"),
        }
    }

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => break,
            event = events.recv() => match event {
                Ok(DeliveryEvent::SnapshotReplaced { messages }) => {
                    println!("snapshot: {} message(s)", messages.len());
                }
                Ok(DeliveryEvent::MessageReceived { message }) => {
                    println!("{}: {}", message.user, message.text);
                }
                Ok(DeliveryEvent::ConnectionStateChanged { state }) => {
                    println!("stream connection: {state:?}");
                }
                Ok(DeliveryEvent::RetrievalFault { code, message }) => {
                    println!("fault [{code}]: {message}");
                }
                Err(err) => {
                    warn!("event stream closed: {err}");
                    break;
                }
            },
        }
    }

    info!("shutting down");
    if let Err(err) = poller.stop().await {
        warn!(code = %err.code, "poller stop: {err}");
    }
    if let Err(err) = longpoll.stop().await {
        warn!(code = %err.code, "long-poll stop: {err}");
    }
}
