// Turn entitlement over a shared roster: rotation, wrap-around and
// self-healing after a departure.

mod support;

use merge_arena::domain::session::PendingSpawn;

fn spawn() -> PendingSpawn {
    PendingSpawn { size: 1, x: 0.0 }
}

#[tokio::test]
async fn when_turns_advance_then_entitlement_cycles_through_the_roster() {
    let store = support::store();
    let clock = support::clock();
    let writers = support::start_match(&store, &clock, &["p1", "p2", "p3"]).await;

    let doc = support::doc(&store).await;
    assert_eq!(doc.entitled().map(String::as_str), Some("p1"));

    writers[0].advance_turn(&doc, spawn());
    support::drain_writes().await;
    let doc = support::doc(&store).await;
    assert_eq!(doc.entitled().map(String::as_str), Some("p2"));

    writers[1].advance_turn(&doc, spawn());
    support::drain_writes().await;
    let doc = support::doc(&store).await;
    assert_eq!(doc.entitled().map(String::as_str), Some("p3"));

    // Wraps back to the first position.
    writers[2].advance_turn(&doc, spawn());
    support::drain_writes().await;
    let doc = support::doc(&store).await;
    assert_eq!(doc.entitled().map(String::as_str), Some("p1"));
}

#[tokio::test]
async fn when_turns_advance_then_each_turn_carries_a_fresh_start_and_spawn() {
    let store = support::store();
    let clock = support::clock();
    let writers = support::start_match(&store, &clock, &["p1", "p2"]).await;

    let first = support::doc(&store).await;
    writers[0].advance_turn(&first, PendingSpawn { size: 2, x: 33.0 });
    support::drain_writes().await;

    let second = support::doc(&store).await;
    assert!(second.turn_started_at > first.turn_started_at);
    assert_eq!(second.pending_spawn, Some(PendingSpawn { size: 2, x: 33.0 }));
}

#[tokio::test]
async fn when_a_participant_disconnects_then_entitlement_stays_valid() {
    let store = support::store();
    let clock = support::clock();
    let writers = support::start_match(&store, &clock, &["p1", "p2", "p3"]).await;

    // Move entitlement to p2, then lose p2 abruptly.
    let doc = support::doc(&store).await;
    writers[0].advance_turn(&doc, spawn());
    support::drain_writes().await;
    store
        .disconnect(support::SESSION_ID, "p2")
        .await
        .expect("disconnect");

    let doc = support::doc(&store).await;
    assert!(!doc.participants.contains_key("p2"));
    assert_eq!(doc.turn_order, vec!["p1".to_string(), "p3".to_string()]);
    let entitled = doc.entitled().expect("someone must be entitled");
    assert!(doc.turn_order.contains(entitled));
}
