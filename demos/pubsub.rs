//! # Example: pubsub
//!
//! Demonstrates routes, scoped delivery and weak ownership on the [`EventBus`].
//!
//! Shows how to:
//! - Declare a registration table with [`Subscriber`].
//! - Publish on a route to every subscriber, then scoped to one owner.
//! - Drop an owner and watch its subscriptions disappear.
//!
//! ## Flow
//! ```text
//! subscribe_owner(player_a), subscribe_owner(player_b)
//!     ├─► publish("life", None, 90)         ─► both HUDs: on_any_life
//!     ├─► publish("life", Some(a), 75)      ─► only a:    on_own_life
//!     └─► drop(b); publish("life", None, 50) ─► a only, b pruned
//! ```
//!
//! ## Run
//! ```bash
//! RUST_LOG=switchboard=debug cargo run --example pubsub
//! ```

use std::sync::Arc;

use switchboard::{EventBus, Handler, OwnerId, Payload, Subscriber};
use tracing_subscriber::EnvFilter;

struct Hud {
    name: &'static str,
}

impl Hud {
    fn on_any_life(&self, value: &i32) {
        println!("[{}] someone's life is now {value}", self.name);
    }

    fn on_own_life(&self, value: &i32) {
        println!("[{}] my life is now {value}", self.name);
    }

    fn on_level_up(&self, level: &u32, title: Option<&String>) {
        let title = title.map(String::as_str).unwrap_or("<none>");
        println!("[{}] level {level}, title {title}", self.name);
    }
}

impl Subscriber for Hud {
    fn handlers() -> Vec<Handler<Self>> {
        vec![
            Handler::new(Self::on_any_life).route("life"),
            Handler::new(Self::on_own_life).route("life").scoped(),
            Handler::new(Self::on_level_up).route("level"),
        ]
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let bus = EventBus::new();
    let a = Arc::new(Hud { name: "a" });
    let b = Arc::new(Hud { name: "b" });
    bus.subscribe_owner(&a)?;
    bus.subscribe_owner(&b)?;
    println!("subscriptions: {}", bus.subscription_count());

    bus.publish(Some("life"), None, &[Payload::new(90i32)])?;
    bus.publish(Some("life"), Some(OwnerId::of(&a)), &[Payload::new(75i32)])?;
    bus.publish(Some("level"), None, &[Payload::new(3u32), Payload::null()])?;
    bus.publish(
        Some("level"),
        None,
        &[Payload::new(4u32), Payload::new(String::from("veteran"))],
    )?;

    drop(b);
    bus.publish(Some("life"), None, &[Payload::new(50i32)])?;
    println!("subscriptions after drop: {}", bus.subscription_count());

    bus.unsubscribe::<Hud>(Some(&a), &[])?;
    println!("subscriptions after unsubscribe: {}", bus.subscription_count());
    Ok(())
}
