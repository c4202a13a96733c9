// Authority failover: the store heals the roster on disconnect and exactly
// one survivor claims the vacant authority flag.

mod support;

use merge_arena::domain::tuning::Tuning;
use merge_arena::use_cases::Engine;

fn engine(writer: merge_arena::use_cases::SessionWriter, seed: u64) -> Engine {
    Engine::new(Tuning::default(), writer, support::world_factory(), seed, false)
}

#[tokio::test]
async fn when_the_authority_disconnects_then_exactly_one_survivor_claims() {
    let store = support::store();
    let clock = support::clock();
    let writers = support::start_match(&store, &clock, &["p1", "p2", "p3"]).await;

    let mut second = engine(writers[1].clone(), 2);
    let mut third = engine(writers[2].clone(), 3);
    let doc = support::doc(&store).await;
    second.handle_snapshot(doc.clone());
    third.handle_snapshot(doc);
    assert!(!second.is_authority());
    assert!(!third.is_authority());

    store
        .disconnect(support::SESSION_ID, "p1")
        .await
        .expect("disconnect");

    let doc = support::doc(&store).await;
    assert!(!doc.participants.contains_key("p1"));
    assert!(!doc.has_authority());
    second.handle_snapshot(doc.clone());
    third.handle_snapshot(doc);
    support::drain_writes().await;

    let doc = support::doc(&store).await;
    let holders: Vec<&str> = doc
        .participants
        .iter()
        .filter(|(_, entry)| entry.is_authority)
        .map(|(id, _)| id.as_str())
        .collect();
    assert_eq!(holders, vec!["p2"]);
    assert_eq!(doc.turn_order, vec!["p2".to_string(), "p3".to_string()]);

    // The next push makes the claimant build its world; the other survivor
    // stays a plain collaborator.
    second.handle_snapshot(doc.clone());
    third.handle_snapshot(doc);
    assert!(second.is_authority());
    assert!(!third.is_authority());
}

#[tokio::test]
async fn when_an_authority_exists_then_nobody_claims_on_ordinary_pushes() {
    let store = support::store();
    let clock = support::clock();
    let writers = support::start_match(&store, &clock, &["p1", "p2"]).await;

    let mut second = engine(writers[1].clone(), 2);
    for _ in 0..3 {
        store.repush(support::SESSION_ID).await.expect("repush");
        second.handle_snapshot(support::doc(&store).await);
    }
    support::drain_writes().await;

    let doc = support::doc(&store).await;
    let holders: Vec<&str> = doc
        .participants
        .iter()
        .filter(|(_, entry)| entry.is_authority)
        .map(|(id, _)| id.as_str())
        .collect();
    assert_eq!(holders, vec!["p1"]);
}
