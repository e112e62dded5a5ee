//! ProgressManager init, event handling and timers.

use std::{sync::Arc, time::Duration};

use reading_progress::{
    FixedClock, InMemory, LifecycleState, Medium, PageEvent, PageKey, PositionRecord,
    ProgressConfig, ProgressManager,
};
use tokio::time::Instant;

use crate::helpers::{MockHost, PAGE, manager, manager_with, ms, page_key, store_for};

const DAY: Duration = Duration::from_secs(24 * 60 * 60);

fn setup() -> (InMemory, Arc<FixedClock>) {
    (InMemory::new(), Arc::new(FixedClock::default()))
}

#[test]
fn init_is_idempotent() {
    let (medium, clock) = setup();
    let host = MockHost::at(&format!("{PAGE}#intro"));
    let mut manager = manager(host, &medium, &clock);
    assert_eq!(manager.state(), LifecycleState::Uninitialized);

    let t0 = Instant::now();
    manager.init(t0);
    manager.init(t0 + ms(10));

    assert_eq!(manager.state(), LifecycleState::Active);
    assert_eq!(manager.host().replaced, vec![PAGE.to_string()]);
    assert_eq!(manager.anchor().map(|a| a.id()), Some("intro"));
    assert_eq!(manager.next_deadline(), Some(t0 + DAY));
}

#[test]
fn init_strips_anchor_but_keeps_query() {
    let (medium, clock) = setup();
    let host = MockHost::at(&format!("{PAGE}?ref=feed#part%202"));
    let mut manager = manager(host, &medium, &clock);
    manager.init(Instant::now());

    assert_eq!(manager.host().location, format!("{PAGE}?ref=feed"));
    assert_eq!(manager.anchor().map(|a| a.id()), Some("part 2"));
    assert_eq!(manager.page_key(), &page_key());
}

#[test]
fn init_without_anchor_leaves_location_alone() {
    let (medium, clock) = setup();
    let mut manager = manager(MockHost::at(PAGE), &medium, &clock);
    manager.init(Instant::now());

    assert!(manager.host().replaced.is_empty());
    assert!(manager.anchor().is_none());
}

#[test]
fn events_before_init_are_ignored() {
    let (medium, clock) = setup();
    let mut host = MockHost::at(PAGE);
    host.offset = 300;
    let mut manager = manager(host, &medium, &clock);

    let t0 = Instant::now();
    manager.handle_event(PageEvent::Scroll, t0);
    manager.handle_event(PageEvent::BeforeUnload, t0);
    manager.poll(t0 + ms(5_000));

    assert_eq!(manager.next_deadline(), None);
    assert!(store_for(&medium).is_empty());
}

#[test]
fn scroll_is_sampled_then_committed() {
    let (medium, clock) = setup();
    let mut manager = manager(MockHost::at(PAGE), &medium, &clock);
    let t0 = Instant::now();
    manager.init(t0);

    manager.host_mut().offset = 500;
    manager.handle_event(PageEvent::Scroll, t0);

    manager.poll(t0 + ms(299));
    assert_eq!(manager.next_deadline(), Some(t0 + ms(300)));

    manager.poll(t0 + ms(300));
    assert!(store_for(&medium).is_empty());
    assert_eq!(manager.next_deadline(), Some(t0 + ms(1300)));

    // Offset read at sample time, not at commit time
    manager.host_mut().offset = 9_999;
    clock.advance(1_300);
    manager.poll(t0 + ms(1300));

    let saved = store_for(&medium).get(&page_key()).unwrap();
    assert_eq!(saved, PositionRecord::new(500, clock.get()));
    assert_eq!(manager.next_deadline(), Some(t0 + DAY));
}

#[test]
fn burst_of_scrolls_commits_once_with_last_offset() {
    let (medium, clock) = setup();
    let mut manager = manager(MockHost::at(PAGE), &medium, &clock);
    let t0 = Instant::now();
    manager.init(t0);

    for step in 0..20u64 {
        let now = t0 + ms(step * 50);
        manager.host_mut().offset = step * 40;
        manager.handle_event(PageEvent::Scroll, now);
        manager.poll(now);
    }
    // Last scroll at 950ms: sample at 1250ms, commit at 2250ms
    manager.poll(t0 + ms(1250));
    manager.poll(t0 + ms(2249));
    assert!(store_for(&medium).is_empty());

    manager.poll(t0 + ms(2250));
    assert_eq!(store_for(&medium).get(&page_key()).unwrap().offset, 760);
}

#[test]
fn exit_commits_immediately_and_suppresses_late_commit() {
    let (medium, clock) = setup();
    let mut manager = manager(MockHost::at(PAGE), &medium, &clock);
    let t0 = Instant::now();
    manager.init(t0);

    manager.host_mut().offset = 480;
    manager.handle_event(PageEvent::Scroll, t0);
    manager.poll(t0 + ms(300));

    manager.handle_event(PageEvent::VisibilityHidden, t0 + ms(500));
    let store = store_for(&medium);
    assert_eq!(store.get(&page_key()).unwrap().offset, 480);

    // Nothing is left to fire before the sweep
    store.clear().unwrap();
    assert_eq!(manager.next_deadline(), Some(t0 + DAY));
    manager.poll(t0 + ms(1300));
    assert!(store.is_empty());
}

#[test]
fn exit_samples_scroll_still_waiting_on_throttle() {
    let (medium, clock) = setup();
    let mut manager = manager(MockHost::at(PAGE), &medium, &clock);
    let t0 = Instant::now();
    manager.init(t0);

    manager.host_mut().offset = 2_048;
    manager.handle_event(PageEvent::Scroll, t0);
    manager.handle_event(PageEvent::BeforeUnload, t0 + ms(100));

    assert_eq!(store_for(&medium).get(&page_key()).unwrap().offset, 2_048);
}

#[test]
fn exit_without_scrolling_keeps_offset_and_refreshes_timestamp() {
    let (medium, clock) = setup();
    let earlier = clock.get() - 60_000;
    store_for(&medium).save(&page_key(), 900, earlier).unwrap();

    let mut manager = manager(MockHost::at(PAGE), &medium, &clock);
    manager.init(Instant::now());
    manager.handle_event(PageEvent::BeforeUnload, Instant::now());

    assert_eq!(
        store_for(&medium).get(&page_key()),
        Some(PositionRecord::new(900, clock.get()))
    );
}

#[test]
fn revisiting_without_scrolling_keeps_page_from_expiring() {
    let (medium, clock) = setup();
    let config = ProgressConfig::default().with_purge_threshold(DAY * 2);
    store_for(&medium).save(&page_key(), 1_234, clock.get()).unwrap();

    for _ in 0..3 {
        clock.advance(DAY.as_millis() as u64);
        let mut manager = manager_with(config.clone(), MockHost::at(PAGE), &medium, &clock);
        manager.init(Instant::now());
        manager.handle_event(PageEvent::ContentReady, Instant::now());
        manager.handle_event(PageEvent::Frame, Instant::now());
        manager.handle_event(PageEvent::VisibilityHidden, Instant::now());
        assert_eq!(manager.host().scrolls, vec![1_234]);
    }

    assert_eq!(
        store_for(&medium).get(&page_key()),
        Some(PositionRecord::new(1_234, clock.get()))
    );
}

#[test]
fn exit_without_history_or_scrolling_writes_nothing() {
    let (medium, clock) = setup();
    let mut manager = manager(MockHost::at(PAGE), &medium, &clock);
    manager.init(Instant::now());
    manager.handle_event(PageEvent::BeforeUnload, Instant::now());

    assert_eq!(medium.get("readingProgressData").unwrap(), None);
}

#[test]
fn persistence_failure_is_not_fatal() {
    let medium = InMemory::with_quota(16);
    let clock = Arc::new(FixedClock::default());
    let mut manager = manager(MockHost::at(PAGE), &medium, &clock);
    let t0 = Instant::now();
    manager.init(t0);

    manager.host_mut().offset = 100;
    manager.handle_event(PageEvent::Scroll, t0);
    manager.poll(t0 + ms(300));
    manager.poll(t0 + ms(1300));
    manager.handle_event(PageEvent::VisibilityHidden, t0 + ms(1400));

    assert_eq!(medium.used_bytes(), 0);
    assert_eq!(manager.state(), LifecycleState::Active);
}

#[test]
fn corrupt_data_is_replaced_by_next_commit() {
    let (medium, clock) = setup();
    medium.set("readingProgressData", "<<garbage>>").unwrap();

    let mut manager = manager(MockHost::at(PAGE), &medium, &clock);
    let t0 = Instant::now();
    manager.init(t0);
    manager.handle_event(PageEvent::ContentReady, t0);
    assert_eq!(manager.host().frame_requests, 0);

    manager.host_mut().offset = 333;
    manager.handle_event(PageEvent::Scroll, t0);
    manager.handle_event(PageEvent::BeforeUnload, t0 + ms(10));

    let store = store_for(&medium);
    assert_eq!(store.try_load().unwrap().len(), 1);
    assert_eq!(store.get(&page_key()).unwrap().offset, 333);
}

#[test]
fn init_sweeps_expired_records() {
    let (medium, clock) = setup();
    let store = store_for(&medium);
    let stale = PageKey::new("https://blog.example/old");
    let fresh = PageKey::new("https://blog.example/new");
    store.save(&stale, 10, clock.get() - 31 * DAY.as_millis() as u64).unwrap();
    store.save(&fresh, 20, clock.get() - DAY.as_millis() as u64).unwrap();

    let mut manager = manager(MockHost::at(PAGE), &medium, &clock);
    manager.init(Instant::now());

    let map = store.load();
    assert!(!map.contains_key(&stale));
    assert!(map.contains_key(&fresh));
}

#[test]
fn sweep_runs_every_interval() {
    let (medium, clock) = setup();
    let store = store_for(&medium);
    let other = PageKey::new("https://blog.example/other");
    store.save(&other, 10, clock.get()).unwrap();

    let config = ProgressConfig::default().with_purge_threshold(DAY * 2);
    let mut manager = manager_with(config, MockHost::at(PAGE), &medium, &clock);
    let t0 = Instant::now();
    manager.init(t0);
    assert!(store.get(&other).is_some());

    // First period: record is one day old, kept
    clock.advance(DAY.as_millis() as u64);
    manager.poll(t0 + DAY);
    assert!(store.get(&other).is_some());
    assert_eq!(manager.next_deadline(), Some(t0 + DAY * 2));

    // Not due yet
    clock.advance(2 * DAY.as_millis() as u64);
    manager.poll(t0 + DAY * 2 - ms(1));
    assert!(store.get(&other).is_some());

    manager.poll(t0 + DAY * 2);
    assert!(store.get(&other).is_none());
    assert_eq!(manager.next_deadline(), Some(t0 + DAY * 3));
}

#[test]
fn clear_progress_only_touches_current_page() {
    let (medium, clock) = setup();
    let store = store_for(&medium);
    let other = PageKey::new("https://blog.example/other");
    store.save(&other, 10, clock.get()).unwrap();
    store.save(&page_key(), 20, clock.get()).unwrap();

    let mut manager = manager(MockHost::at(PAGE), &medium, &clock);
    manager.init(Instant::now());

    assert!(manager.clear_progress());
    assert!(!manager.clear_progress());
    assert!(store.get(&page_key()).is_none());
    assert_eq!(store.get(&other), Some(PositionRecord::new(10, clock.get())));
}

#[test]
fn clear_progress_drops_uncommitted_sample() {
    let (medium, clock) = setup();
    let mut manager = manager(MockHost::at(PAGE), &medium, &clock);
    let t0 = Instant::now();
    manager.init(t0);

    manager.host_mut().offset = 700;
    manager.handle_event(PageEvent::Scroll, t0);
    manager.poll(t0 + ms(300));
    manager.clear_progress();

    manager.poll(t0 + ms(1300));
    manager.handle_event(PageEvent::BeforeUnload, t0 + ms(1400));
    assert!(store_for(&medium).is_empty());
}

#[test]
fn clear_all_progress_empties_the_mapping() {
    let (medium, clock) = setup();
    let store = store_for(&medium);
    for n in 0..5 {
        store
            .save(&PageKey::new(format!("https://blog.example/{n}")), n, clock.get())
            .unwrap();
    }

    let mut manager = manager(MockHost::at(PAGE), &medium, &clock);
    manager.init(Instant::now());
    manager.clear_all_progress();

    assert_eq!(medium.get("readingProgressData").unwrap(), None);
    assert!(store.is_empty());
}

#[test]
fn custom_storage_key_is_used() {
    let (medium, clock) = setup();
    let config = ProgressConfig::from_json(r#"{"storageKey": "ReadingProgress"}"#).unwrap();
    let mut manager = manager_with(config, MockHost::at(PAGE), &medium, &clock);
    let t0 = Instant::now();
    manager.init(t0);

    manager.host_mut().offset = 42;
    manager.handle_event(PageEvent::Scroll, t0);
    manager.handle_event(PageEvent::VisibilityHidden, t0);

    assert!(medium.get("ReadingProgress").unwrap().is_some());
    assert!(medium.get("readingProgressData").unwrap().is_none());
}

#[test]
fn invalid_config_is_rejected() {
    let err = ProgressManager::new(
        ProgressConfig::default().with_max_entries(0),
        InMemory::new(),
        MockHost::at(PAGE),
    )
    .unwrap_err();
    assert!(err.is_config_error());
}
