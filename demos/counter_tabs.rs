//! Two "tabs" sharing a counter through local storage, plus a session
//! flag with a TTL.
//!
//! Run with `RUST_LOG=tincan_storage=debug` to watch the engine work.

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tincan_storage::clock::ManualClock;
use tincan_storage::storage::StorageArea;
use tincan_storage::{Options, Origin};

#[derive(Clone, Debug, Serialize, Deserialize)]
struct State {
    count: i32,
}

fn init_logging() {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer())
        .init();
}

fn main() -> tincan_storage::Result<()> {
    init_logging();
    println!("=== Counter shared between tabs ===\n");

    let clock = Arc::new(ManualClock::new(0));
    let origin = Origin::with_clock(clock.clone());
    let tab1 = origin.open_context();
    let tab2 = origin.open_context();

    println!("1. Two bindings in tab 1, one in tab 2");
    let (first, set_first) = tab1
        .local_storage_hook()
        .use_storage("state", State { count: 0 }, Options::default())?;
    let (second, _) = tab1
        .local_storage_hook()
        .use_storage("state", State { count: 0 }, Options::default())?;
    let (other, _) = tab2
        .local_storage_hook()
        .use_storage("state", State { count: 0 }, Options::default())?;

    let _render = other.subscribe(|state| {
        println!("   [tab 2 re-render] count is {}", state.count);
    });

    let print = || {
        println!(
            "   tab1/first: {} | tab1/second: {} | tab2: {}",
            first.get().count,
            second.get().count,
            other.get().count
        );
    };
    print();

    println!("\n2. Clicking in tab 1");
    set_first.set(State {
        count: first.get().count + 1,
    })?;
    print();

    println!("\n3. Tab 2 runs its event loop");
    tab2.run_pending();
    print();

    println!("\n4. Someone edits the store by hand");
    origin
        .store()
        .set("state", r#"{"value":"{\"count\":5}"}"#)?;
    clock.advance(Duration::from_secs(1));
    tab1.run_pending();
    tab2.run_pending();
    print();

    println!("\n5. A session flag that expires after 3s");
    let (flag, set_flag) = tab1.session_storage_hook().use_storage(
        "banner-dismissed",
        false,
        Options::default().ttl(Duration::from_secs(3)),
    )?;
    set_flag.set(true)?;
    println!("   dismissed: {} (expires at {:?})", flag.get(), flag.expires_at());
    for _ in 0..4 {
        clock.advance(Duration::from_secs(1));
        tab1.run_pending();
        println!("   t={}ms dismissed: {}", tab1.now_ms(), flag.get());
    }

    println!("\n✓ Done");
    Ok(())
}
