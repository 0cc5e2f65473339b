//! A minimal seller service: one catalog item gated behind a sponsored
//! purchase, served against a real fullnode.
//!
//! ```sh
//! MISTGATE_PACKAGE_ID=0x... MISTGATE_SPONSOR_KEY=<64 hex chars> \
//!     cargo run --example axum_seller
//! ```

use std::sync::Arc;

use url::Url;

use mistgate_core::types::{MistAmount, ObjectId};
use mistgate_kit::{
    catalog::{ContentRecord, InMemoryCatalog},
    config::{GateConfig, Network, SponsorKeypair},
    ledger::JsonRpcLedgerClient,
};
use mistgate_paywall::{paywall::Paywall, routes::router};

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt::init();

    let network = match std::env::var("MISTGATE_NETWORK").as_deref() {
        Ok("mainnet") => Network::Mainnet,
        Ok("testnet") => Network::Testnet,
        Ok("devnet") => Network::Devnet,
        _ => Network::Localnet,
    };

    let package: Option<ObjectId> = std::env::var("MISTGATE_PACKAGE_ID")
        .ok()
        .map(|raw| raw.parse().expect("MISTGATE_PACKAGE_ID must be 0x + 64 hex chars"));
    if package.is_none() {
        tracing::warn!("MISTGATE_PACKAGE_ID not set; serving in bootstrap mode");
    }

    let sponsor = std::env::var("MISTGATE_SPONSOR_KEY").ok().map(|raw| {
        let bytes = hex::decode(raw).expect("MISTGATE_SPONSOR_KEY must be hex");
        let secret: [u8; 32] = bytes
            .try_into()
            .expect("MISTGATE_SPONSOR_KEY must be 32 bytes");
        SponsorKeypair::from_bytes(&secret)
    });
    if sponsor.is_none() {
        tracing::warn!("MISTGATE_SPONSOR_KEY not set; requesters pay their own fees");
    }

    let config = GateConfig::builder()
        .network(network)
        .maybe_package(package)
        .maybe_sponsor(sponsor)
        .build();

    let mut catalog = InMemoryCatalog::new();
    catalog
        .register(
            ContentRecord::builder()
                .id("content_1")
                .title("First clip")
                .description("A pay-per-view clip")
                .price(MistAmount(100_000_000))
                .creator(
                    "0xcccccccccccccccccccccccccccccccccccccccccccccccccccccccccccccccc"
                        .parse()
                        .expect("creator address"),
                )
                .locator(Url::parse("ipfs://bafy/clip-1").expect("locator"))
                .payload("the gated bytes of content_1")
                .build(),
        )
        .expect("catalog registration");

    let ledger =
        Arc::new(JsonRpcLedgerClient::new(config.rpc_endpoint()).expect("ledger client"));
    let app = router(Paywall::new(&config, Arc::new(catalog), ledger));

    let port = std::env::var("PORT")
        .unwrap_or_else(|_| "3000".to_string())
        .parse::<u16>()
        .expect("PORT must be a valid u16 integer");
    let addr: std::net::SocketAddr = ([0, 0, 0, 0], port).into();

    tracing::info!("starting seller on {addr}");
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .expect("failed to bind to address");
    axum::serve(listener, app).await.expect("server failed");
}
