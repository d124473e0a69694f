//! # Example: request_reply
//!
//! Demonstrates the [`RequestBus`]: typed requests, commands, nullable answers,
//! timeouts and cancellation.
//!
//! ## Flow
//! ```text
//! request(Greet("Hello"))                    ─► "World"
//! request_with(FindUser(7), accept_null)     ─► None
//! request_with(Greet, timeout 1ms)           ─► Timeout (handler keeps running, observed)
//! request_with(Greet, cancel)                ─► Canceled
//! send(Refresh)                              ─► ()
//! ```
//!
//! ## Run
//! ```bash
//! RUST_LOG=switchboard=debug cargo run --example request_reply
//! ```

use std::time::Duration;

use switchboard::{
    BoxError, Command, HandlerFn, HandlerFuture, Request, RequestBus, RequestHandler, RequestOptions,
};
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

struct Greet(&'static str);

impl Request for Greet {
    type Response = String;
}

struct FindUser(u32);

impl Request for FindUser {
    type Response = String;
}

struct Refresh;

impl Command for Refresh {}

/// Answers after a short delay, or stops early when the caller cancels.
struct Greeter;

impl RequestHandler<Greet> for Greeter {
    fn handle(&self, req: Greet, ctx: CancellationToken) -> HandlerFuture<String> {
        Box::pin(async move {
            tokio::select! {
                _ = tokio::time::sleep(Duration::from_millis(10)) => {}
                _ = ctx.cancelled() => return Err::<String, BoxError>("caller went away".into()),
            }
            let answer = if req.0 == "Hello" { "World" } else { "?" };
            Ok::<_, BoxError>(answer.to_string())
        })
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let bus = RequestBus::new();
    bus.subscribe::<Greet, _>(Greeter);
    bus.subscribe_nullable::<FindUser, _>(HandlerFn::new(|req: FindUser, _ctx: CancellationToken| async move {
        Ok::<_, BoxError>((req.0 == 1).then(|| "admin".to_string()))
    }));
    bus.subscribe_command::<Refresh, _>(HandlerFn::new(|_: Refresh, _ctx: CancellationToken| async {
        println!("[refresh] done");
        Ok::<(), BoxError>(())
    }));

    println!("greet: {}", bus.request(Greet("Hello")).await?);

    let user = bus
        .request_with(FindUser(7), RequestOptions::new().accept_null(true))
        .await?;
    println!("user 7: {user:?}");

    let opts = RequestOptions::new().timeout(Duration::from_millis(1));
    if let Err(err) = bus.request_with(Greet("Hello"), opts).await {
        println!("short timeout: {} ({})", err.as_label(), err);
    }

    let token = CancellationToken::new();
    token.cancel();
    let opts = RequestOptions::new().cancel(token);
    if let Err(err) = bus.request_with(Greet("Hello"), opts).await {
        println!("canceled: {}", err.as_message());
    }

    bus.send(Refresh).await?;

    // let the abandoned handlers finish and be logged
    tokio::time::sleep(Duration::from_millis(50)).await;
    Ok(())
}
