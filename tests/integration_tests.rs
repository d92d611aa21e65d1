//! Integration tests for Tincan Storage

use serde::{Deserialize, Serialize};
use std::sync::{
    atomic::{AtomicUsize, Ordering},
    Arc,
};
use std::time::Duration;
use tincan_storage::clock::ManualClock;
use tincan_storage::storage::StorageArea;
use tincan_storage::{Context, Options, Origin, PollingInterval};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
struct State {
    count: i32,
}

fn render(label: &str, state: &State) -> String {
    format!("{label} count is {}", state.count)
}

fn origin() -> (Arc<ManualClock>, Origin) {
    let clock = Arc::new(ManualClock::new(1_700_000_000_000));
    let origin = Origin::with_clock(clock.clone());
    (clock, origin)
}

#[test]
fn multiple_bindings_on_same_page() {
    let (_, origin) = origin();
    let tab = origin.open_context();
    let hook = tab.local_storage_hook();

    let (first, set_first) = hook
        .use_storage("state", State { count: 0 }, Options::default())
        .unwrap();
    let (second, set_second) = hook
        .use_storage("state", State { count: 0 }, Options::default())
        .unwrap();
    assert_eq!(render("First", &first.get()), "First count is 0");

    let renders = Arc::new(AtomicUsize::new(0));
    let _rerender = second.subscribe({
        let renders = renders.clone();
        move |_: &State| {
            renders.fetch_add(1, Ordering::SeqCst);
        }
    });

    // Click on the second button.
    set_second.set(State { count: second.get().count + 1 }).unwrap();
    assert_eq!(render("First", &first.get()), "First count is 1");
    assert_eq!(render("Second", &second.get()), "Second count is 1");
    assert_eq!(renders.load(Ordering::SeqCst), 1);

    // And the first.
    set_first.set(State { count: first.get().count + 1 }).unwrap();
    assert_eq!(second.get().count, 2);
    assert_eq!(renders.load(Ordering::SeqCst), 2);
}

#[test]
fn manual_changes_to_the_store() {
    let (clock, origin) = origin();
    let tab = origin.open_context();
    let hook = tab.local_storage_hook();

    let (first, _) = hook
        .use_storage("state", State { count: 0 }, Options::default())
        .unwrap();
    let (second, _) = hook
        .use_storage("state", State { count: 0 }, Options::default())
        .unwrap();
    assert_eq!(first.get().count, 0);

    tab.local_storage()
        .set("state", r#"{"value":"{\"count\":5}"}"#)
        .unwrap();
    assert_eq!(first.get().count, 0);

    clock.advance(Duration::from_secs(1));
    tab.run_pending();
    assert_eq!(render("First", &first.get()), "First count is 5");
    assert_eq!(render("Second", &second.get()), "Second count is 5");
}

#[test]
fn changes_from_another_tab() {
    let (_, origin) = origin();
    let tab1 = origin.open_context();
    let tab2 = origin.open_context();

    let (app1, set_app1) = tab1
        .local_storage_hook()
        .use_storage("state", State { count: 0 }, Options::default())
        .unwrap();
    let (app2, _) = tab2
        .local_storage_hook()
        .use_storage("state", State { count: 0 }, Options::default())
        .unwrap();
    assert_eq!(app1.get().count, 0);
    assert_eq!(app2.get().count, 0);

    set_app1.set(State { count: 1 }).unwrap();
    assert_eq!(app1.get().count, 1);
    // Not yet: tab2 has not run its event loop.
    assert_eq!(app2.get().count, 0);

    tab2.run_pending();
    assert_eq!(app2.get().count, 1);
}

#[test]
fn another_tab_without_polling_relies_on_events() {
    let (_, origin) = origin();
    let tab1 = origin.open_context();
    let tab2 = origin.open_context();
    let quiet = || Options::default().polling_interval(PollingInterval::Disabled);

    let (_, set_a) = tab1
        .local_storage_hook()
        .use_storage("n", 0u32, quiet())
        .unwrap();
    let (b, _) = tab2
        .local_storage_hook()
        .use_storage("n", 0u32, quiet())
        .unwrap();
    // Drain the event from tab1 seeding the key.
    tab2.run_pending();

    set_a.set(3).unwrap();
    assert_eq!(tab2.pending_events(), 1);
    tab2.run_pending();
    assert_eq!(b.get(), 3);
}

#[test]
fn writes_bypassing_contexts_arrive_by_polling() {
    let (clock, origin) = origin();
    let tab = origin.open_context();
    let (n, _) = tab
        .local_storage_hook()
        .use_storage(
            "n",
            0u32,
            Options::default().polling_interval(PollingInterval::Every(Duration::from_millis(200))),
        )
        .unwrap();

    origin.store().set("n", r#"{"value":"11"}"#).unwrap();
    assert_eq!(tab.pending_events(), 0);

    clock.advance(Duration::from_millis(200));
    tab.run_pending();
    assert_eq!(n.get(), 11);
}

#[test]
fn session_storage_stays_in_its_tab() {
    let (_, origin) = origin();
    let tab1 = origin.open_context();
    let tab2 = origin.open_context();

    let (a, set_a) = tab1
        .session_storage_hook()
        .use_storage("draft", String::new(), Options::default())
        .unwrap();
    let (b, _) = tab2
        .session_storage_hook()
        .use_storage("draft", String::new(), Options::default())
        .unwrap();

    set_a.set("hello".to_string()).unwrap();
    tab2.run_pending();
    assert_eq!(a.get(), "hello");
    assert_eq!(b.get(), "");
}

#[test]
fn ttl_expiry_reaches_other_tabs() {
    let (clock, origin) = origin();
    let tab1 = origin.open_context();
    let tab2 = origin.open_context();
    let options = || Options::default().ttl(Duration::from_secs(3));

    let (a, set_a) = tab1
        .local_storage_hook()
        .use_storage("token", None::<String>, options())
        .unwrap();
    let (b, _) = tab2
        .local_storage_hook()
        .use_storage("token", None::<String>, options())
        .unwrap();

    set_a.set(Some("secret".to_string())).unwrap();
    tab2.run_pending();
    assert_eq!(b.get().as_deref(), Some("secret"));

    clock.advance(Duration::from_millis(3_500));
    tab1.run_pending();
    assert_eq!(a.get(), None);

    tab2.run_pending();
    assert_eq!(b.get(), None);
}

#[test]
fn current_context_free_functions() {
    let (_, origin) = origin();
    let tab = origin.open_context();

    tab.enter(|| {
        let (a, set_a) =
            tincan_storage::use_local_storage("k", 1u8, Options::default()).unwrap();
        let (b, _) = tincan_storage::use_local_storage("k", 1u8, Options::default()).unwrap();
        set_a.set(2).unwrap();
        assert_eq!(a.get(), 2);
        assert_eq!(b.get(), 2);
        assert_eq!(Context::current().id(), tab.id());
    });

    assert_eq!(
        tab.local_storage().get("k").unwrap().as_deref(),
        Some(r#"{"value":"2"}"#)
    );
}

#[test]
fn bindings_load_from_config() {
    let (_, origin) = origin();
    let tab = origin.open_context();
    let config: tincan_storage::BindingConfig =
        serde_json::from_str(r#"{"ttl_ms": 1000, "polling_interval_ms": false}"#).unwrap();

    let (n, set_n) = tab
        .local_storage_hook()
        .use_storage("n", 0u32, config.to_options())
        .unwrap();
    assert_eq!(tab.timer_count(), 0);

    set_n.set(1).unwrap();
    assert_eq!(n.expires_at(), Some(1_700_000_001_000));
}
