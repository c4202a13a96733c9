// Drop protocol across the store: request write, authority materialization
// under duplicate pushes, and speculative reconciliation on the requester.

mod support;

use merge_arena::domain::session::Vec2;
use merge_arena::domain::tuning::Tuning;
use merge_arena::use_cases::{DropTracker, Engine};

#[tokio::test]
async fn when_a_request_is_pushed_twice_then_it_materializes_exactly_once() {
    let store = support::store();
    let clock = support::clock();
    let writers = support::start_match(&store, &clock, &["p1", "p2"]).await;

    let mut authority = Engine::new(
        Tuning::default(),
        writers[0].clone(),
        support::world_factory(),
        7,
        false,
    );
    authority.handle_snapshot(support::doc(&store).await);
    assert!(authority.is_authority());

    let request = writers[1].request_launch(24.0, 2, Vec2::new(0.0, -320.0));
    let mut guest_drops = DropTracker::new(&Tuning::default());
    guest_drops.speculate(&request, Tuning::default().spawn_y, 1);
    support::drain_writes().await;

    // The same snapshot arrives twice, as on a store retry.
    let doc = support::doc(&store).await;
    assert!(doc.drop_request.is_some());
    authority.handle_snapshot(doc.clone());
    authority.handle_snapshot(doc);
    support::drain_writes().await;

    let doc = support::doc(&store).await;
    assert_eq!(doc.drop_request, None);
    assert_eq!(doc.projectiles.len(), 1);
    let entry = doc.projectiles.values().next().expect("projectile");
    assert_eq!(entry.size, 2);
    assert_eq!(entry.y, Tuning::default().spawn_y);

    // The requester's speculative projectile dies on the next authoritative
    // snapshot.
    assert!(guest_drops.reconcile(&doc, 2));
    assert!(guest_drops.speculative().is_none());
}

#[tokio::test]
async fn when_a_second_request_arrives_then_it_materializes_independently() {
    let store = support::store();
    let clock = support::clock();
    let writers = support::start_match(&store, &clock, &["p1", "p2"]).await;

    let mut authority = Engine::new(
        Tuning::default(),
        writers[0].clone(),
        support::world_factory(),
        7,
        false,
    );
    authority.handle_snapshot(support::doc(&store).await);

    writers[1].request_launch(-40.0, 1, Vec2::new(0.0, -320.0));
    support::drain_writes().await;
    authority.handle_snapshot(support::doc(&store).await);
    support::drain_writes().await;

    writers[1].request_launch(40.0, 3, Vec2::new(0.0, -320.0));
    support::drain_writes().await;
    authority.handle_snapshot(support::doc(&store).await);
    support::drain_writes().await;

    let doc = support::doc(&store).await;
    assert_eq!(doc.drop_request, None);
    assert_eq!(doc.projectiles.len(), 2);
    let mut sizes: Vec<u8> = doc.projectiles.values().map(|entry| entry.size).collect();
    sizes.sort_unstable();
    assert_eq!(sizes, vec![1, 3]);
}
