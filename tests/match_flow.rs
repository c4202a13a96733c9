// One participant driven through a full match: launch, settle, dwell over
// the threshold line, and the shared end-of-match flip.

mod support;

use merge_arena::domain::ports::SessionStore;
use merge_arena::domain::session::SessionStatus;
use merge_arena::domain::tuning::Tuning;
use merge_arena::use_cases::Engine;

const DT: f32 = 1.0 / 60.0;

#[tokio::test]
async fn when_the_pile_rests_over_the_line_then_the_match_ends_for_everyone() {
    let store = support::store();
    let clock = support::clock();
    let writers = support::start_match(&store, &clock, &["p1"]).await;

    // Low threshold line so the first resting projectile qualifies.
    let tuning = Tuning {
        launch_enable_delay_frames: 2,
        settle_frames: 5,
        dwell_threshold_frames: 5,
        launch_grace_frames: 2,
        over_line_y: 10.0,
        ..Default::default()
    };
    let mut engine = Engine::new(
        tuning,
        writers[0].clone(),
        support::world_factory(),
        5,
        true,
    );
    let mut snapshots = store
        .subscribe(support::SESSION_ID)
        .await
        .expect("subscribe");
    store.repush(support::SESSION_ID).await.expect("repush");

    for _ in 0..2_000 {
        while let Ok(doc) = snapshots.try_recv() {
            engine.handle_snapshot(doc);
        }
        engine.tick(DT);
        support::drain_writes().await;
        if engine.is_ended() {
            break;
        }
    }

    assert!(engine.is_ended());
    let doc = support::doc(&store).await;
    assert_eq!(doc.status, SessionStatus::Ended);
    assert!(!doc.projectiles.is_empty());
}
