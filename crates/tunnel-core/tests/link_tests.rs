// Link protocol: selection, validation order, optimistic apply and sync.

use futures::channel::oneshot;
use glam::Vec3;
use proptest::prelude::*;
use std::cell::{Cell, RefCell};
use std::rc::Rc;
use tunnel_core::*;

/// Replies immediately; every call is recorded and counted as one more link in
/// the theme, with a milestone on multiples of five.
#[derive(Default)]
struct CountingSync {
    calls: Cell<u32>,
    requests: Rc<RefCell<Vec<UpsertLink>>>,
}

impl LinkSync for CountingSync {
    fn upsert_link(&self, request: UpsertLink) -> SyncFuture {
        let n = self.calls.get() + 1;
        self.calls.set(n);
        self.requests.borrow_mut().push(request);
        Box::pin(futures::future::ready(Ok(UpsertLinkReply {
            total_links: n,
            theme_links: n,
            milestone_added: n % 5 == 0,
            milestone_level: n / 5,
        })))
    }
}

struct NeverSync;

impl LinkSync for NeverSync {
    fn upsert_link(&self, _request: UpsertLink) -> SyncFuture {
        Box::pin(futures::future::pending())
    }
}

type Reply = Result<UpsertLinkReply, RemoteSyncError>;

/// Hands every request's reply channel to the test, which resolves it later.
#[derive(Default)]
struct DeferredSync {
    replies: Rc<RefCell<Vec<oneshot::Sender<Reply>>>>,
}

impl LinkSync for DeferredSync {
    fn upsert_link(&self, _request: UpsertLink) -> SyncFuture {
        let (tx, rx) = oneshot::channel();
        self.replies.borrow_mut().push(tx);
        Box::pin(async move {
            rx.await
                .unwrap_or_else(|_| Err(RemoteSyncError::Transport("cancelled".into())))
        })
    }
}

fn rules() -> LinkRules {
    LinkRules::for_depth(40.0)
}

fn layer_at(distance: f32) -> NodeLayer {
    NodeLayer::from_points([
        (Vec3::new(0.0, 0.0, 10.0), Theme::Emotion),
        (Vec3::new(0.0, 0.0, 10.0 + distance), Theme::Emotion),
        (Vec3::new(1.0, 0.0, 10.0), Theme::Focus),
    ])
}

#[test]
fn rules_follow_tunnel_depth() {
    let r = rules();
    assert!((r.max_link_distance - 4.8).abs() < 1e-5);
    assert_eq!(r.cooldown_ms, 500.0);
}

#[test]
fn in_range_pair_links_with_exactly_one_event() {
    let mut nodes = layer_at(3.0);
    let mut engine = LinkEngine::new(rules(), "u1".into(), 42, Box::new(OfflineSync));
    let mut out = Vec::new();

    let first = engine.select_or_link(NodeId(0), 0.0, &mut nodes, &mut out);
    assert_eq!(first, SelectOutcome::Selected(NodeId(0)));
    assert_eq!(engine.selection(), Selection::Selected(NodeId(0)));
    assert!(out.is_empty());

    let second = engine.select_or_link(NodeId(1), 10.0, &mut nodes, &mut out);
    assert_eq!(
        second,
        SelectOutcome::Linked {
            from: NodeId(0),
            to: NodeId(1)
        }
    );
    assert_eq!(
        out,
        vec![LinkEvent::Created {
            from: NodeId(0),
            to: NodeId(1),
            theme: Theme::Emotion
        }]
    );
    assert_eq!(nodes.state(NodeId(0)), Some(NodeState::Linked));
    assert_eq!(nodes.state(NodeId(1)), Some(NodeState::Linked));
    assert_eq!(engine.selection(), Selection::None);
}

#[test]
fn out_of_range_pair_is_rejected_without_event() {
    let mut nodes = layer_at(6.0);
    let mut engine = LinkEngine::new(rules(), "u1".into(), 42, Box::new(OfflineSync));
    let mut out = Vec::new();

    engine.select_or_link(NodeId(0), 0.0, &mut nodes, &mut out);
    let outcome = engine.select_or_link(NodeId(1), 0.0, &mut nodes, &mut out);
    assert!(matches!(
        outcome,
        SelectOutcome::Rejected(LinkRejected::TooFar { .. })
    ));
    assert!(out.is_empty());
    assert_eq!(nodes.state(NodeId(0)), Some(NodeState::Locked));
    assert_eq!(nodes.state(NodeId(1)), Some(NodeState::Locked));
    assert_eq!(engine.selection(), Selection::None);
    assert_eq!(engine.stats().issued, 0);
}

#[test]
fn clicking_the_selected_node_deselects() {
    let mut nodes = layer_at(3.0);
    let mut engine = LinkEngine::new(rules(), "u1".into(), 42, Box::new(OfflineSync));
    let mut out = Vec::new();
    engine.select_or_link(NodeId(2), 0.0, &mut nodes, &mut out);
    let outcome = engine.select_or_link(NodeId(2), 0.0, &mut nodes, &mut out);
    assert_eq!(outcome, SelectOutcome::Deselected);
    assert_eq!(engine.selection(), Selection::None);
    assert!(out.is_empty());
}

#[test]
fn cooldown_blocks_a_second_link_for_500ms() {
    let mut nodes = layer_at(3.0);
    let mut engine = LinkEngine::new(rules(), "u1".into(), 42, Box::new(OfflineSync));
    let mut out = Vec::new();

    assert!(engine
        .try_link(NodeId(0), NodeId(1), 1000.0, &mut nodes, &mut out)
        .is_ok());
    let err = engine
        .try_link(NodeId(0), NodeId(2), 1300.0, &mut nodes, &mut out)
        .unwrap_err();
    match err {
        LinkRejected::Cooldown { remaining_ms } => assert!((remaining_ms - 200.0).abs() < 1e-9),
        other => panic!("expected cooldown, got {other:?}"),
    }
    assert!(engine
        .try_link(NodeId(0), NodeId(2), 1500.0, &mut nodes, &mut out)
        .is_ok());
    assert_eq!(out.len(), 2);
}

#[test]
fn rejected_attempts_do_not_start_the_cooldown() {
    let mut nodes = layer_at(6.0);
    let mut engine = LinkEngine::new(rules(), "u1".into(), 42, Box::new(OfflineSync));
    let mut out = Vec::new();
    assert!(engine
        .try_link(NodeId(0), NodeId(1), 0.0, &mut nodes, &mut out)
        .is_err());
    assert!(engine
        .try_link(NodeId(0), NodeId(2), 1.0, &mut nodes, &mut out)
        .is_ok());
}

#[test]
fn unknown_and_identical_nodes_are_rejected() {
    let mut nodes = layer_at(3.0);
    let mut engine = LinkEngine::new(rules(), "u1".into(), 42, Box::new(OfflineSync));
    let mut out = Vec::new();
    assert_eq!(
        engine.try_link(NodeId(0), NodeId(9), 0.0, &mut nodes, &mut out),
        Err(LinkRejected::UnknownNode(NodeId(9)))
    );
    assert_eq!(
        engine.try_link(NodeId(1), NodeId(1), 0.0, &mut nodes, &mut out),
        Err(LinkRejected::SameNode(NodeId(1)))
    );
    assert!(out.is_empty());
}

#[test]
fn sync_request_carries_user_seed_theme_and_intensity() {
    let requests = Rc::new(RefCell::new(Vec::new()));
    let sync = CountingSync {
        calls: Cell::new(0),
        requests: requests.clone(),
    };
    let mut nodes = layer_at(3.0);
    let mut engine = LinkEngine::new(rules(), "user-7".into(), 1234, Box::new(sync));
    let mut out = Vec::new();

    engine
        .try_link(NodeId(0), NodeId(1), 0.0, &mut nodes, &mut out)
        .unwrap();
    engine
        .try_link(NodeId(1), NodeId(2), 600.0, &mut nodes, &mut out)
        .unwrap();

    let reqs = requests.borrow();
    assert_eq!(reqs.len(), 2);
    assert_eq!(reqs[0].user_id, "user-7");
    assert_eq!(reqs[0].seed, 1234);
    assert_eq!((reqs[0].node_a, reqs[0].node_b), (0, 1));
    assert_eq!(reqs[0].theme, Theme::Emotion);
    assert_eq!(reqs[0].intensity, 1.5);
    // mixed themes link at base intensity
    assert_eq!(reqs[1].intensity, 1.0);

    let json = serde_json::to_value(&reqs[0]).unwrap();
    assert_eq!(json["userId"], "user-7");
    assert_eq!(json["nodeA"], 0);
    assert_eq!(json["theme"], "emotion");
}

#[test]
fn milestone_reply_becomes_evolve_event() {
    let mut nodes = NodeLayer::from_points(
        (0..12).map(|i| (Vec3::new(0.0, 0.0, i as f32), Theme::Creativity)),
    );
    let mut engine = LinkEngine::new(rules(), "u".into(), 1, Box::new(CountingSync::default()));
    let mut out = Vec::new();
    for i in 0..10u32 {
        engine
            .try_link(NodeId(i), NodeId(i + 1), i as f64 * 600.0, &mut nodes, &mut out)
            .unwrap();
    }
    out.clear();
    engine.poll(&mut out);
    assert_eq!(engine.pending_syncs(), 0);
    assert_eq!(engine.stats().acknowledged, 10);
    let evolves: Vec<_> = out
        .iter()
        .filter_map(|e| match e {
            LinkEvent::Evolve {
                theme,
                level,
                theme_links,
            } => Some((*theme, *level, *theme_links)),
            _ => None,
        })
        .collect();
    assert_eq!(
        evolves,
        vec![(Theme::Creativity, 1, 5), (Theme::Creativity, 2, 10)]
    );
}

#[test]
fn failed_sync_keeps_the_optimistic_link() {
    let mut nodes = layer_at(3.0);
    let mut engine = LinkEngine::new(rules(), "u".into(), 1, Box::new(OfflineSync));
    let mut out = Vec::new();
    engine
        .try_link(NodeId(0), NodeId(1), 0.0, &mut nodes, &mut out)
        .unwrap();
    out.clear();
    engine.poll(&mut out);
    assert!(out.is_empty());
    assert_eq!(engine.stats().failed, 1);
    assert_eq!(engine.pending_syncs(), 0);
    assert_eq!(nodes.state(NodeId(0)), Some(NodeState::Linked));
    assert_eq!(nodes.state(NodeId(1)), Some(NodeState::Linked));
}

#[test]
fn pending_sync_never_blocks_and_stays_queued() {
    let mut nodes = layer_at(3.0);
    let mut engine = LinkEngine::new(rules(), "u".into(), 1, Box::new(NeverSync));
    let mut out = Vec::new();
    engine
        .try_link(NodeId(0), NodeId(1), 0.0, &mut nodes, &mut out)
        .unwrap();
    for _ in 0..3 {
        engine.poll(&mut out);
    }
    assert_eq!(engine.pending_syncs(), 1);
    assert_eq!(out.len(), 1);
}

#[test]
fn late_reply_is_picked_up_by_a_later_poll() {
    let replies = Rc::new(RefCell::new(Vec::new()));
    let sync = DeferredSync {
        replies: replies.clone(),
    };
    let mut nodes = layer_at(3.0);
    let mut engine = LinkEngine::new(rules(), "u".into(), 1, Box::new(sync));
    let mut out = Vec::new();
    engine
        .try_link(NodeId(0), NodeId(1), 0.0, &mut nodes, &mut out)
        .unwrap();
    out.clear();

    engine.poll(&mut out);
    assert!(out.is_empty());
    assert_eq!(engine.pending_syncs(), 1);

    let tx = replies.borrow_mut().pop().unwrap();
    tx.send(Ok(UpsertLinkReply {
        total_links: 5,
        theme_links: 5,
        milestone_added: true,
        milestone_level: 1,
    }))
    .unwrap();
    engine.poll(&mut out);
    assert_eq!(engine.pending_syncs(), 0);
    assert_eq!(
        out,
        vec![LinkEvent::Evolve {
            theme: Theme::Emotion,
            level: 1,
            theme_links: 5
        }]
    );
}

#[test]
fn dropped_reply_channel_counts_as_failure() {
    let replies = Rc::new(RefCell::new(Vec::new()));
    let sync = DeferredSync {
        replies: replies.clone(),
    };
    let mut nodes = layer_at(3.0);
    let mut engine = LinkEngine::new(rules(), "u".into(), 1, Box::new(sync));
    let mut out = Vec::new();
    engine
        .try_link(NodeId(0), NodeId(1), 0.0, &mut nodes, &mut out)
        .unwrap();
    replies.borrow_mut().clear();
    out.clear();
    engine.poll(&mut out);
    assert!(out.is_empty());
    assert_eq!(engine.stats().failed, 1);
    assert_eq!(nodes.state(NodeId(1)), Some(NodeState::Linked));
}

#[test]
fn completions_after_dispose_are_ignored() {
    let mut nodes = NodeLayer::from_points(
        (0..6).map(|i| (Vec3::new(0.0, 0.0, i as f32), Theme::Logic)),
    );
    let mut engine = LinkEngine::new(rules(), "u".into(), 1, Box::new(CountingSync::default()));
    let mut out = Vec::new();
    for i in 0..5u32 {
        engine
            .try_link(NodeId(i), NodeId(i + 1), i as f64 * 600.0, &mut nodes, &mut out)
            .unwrap();
    }
    engine.dispose();
    out.clear();
    engine.poll(&mut out);
    assert!(out.is_empty());
    assert_eq!(engine.pending_syncs(), 0);
    assert_eq!(engine.stats().acknowledged, 0);
}

proptest! {
    #[test]
    fn link_succeeds_iff_within_max_distance(
        ax in -6.0f32..6.0, ay in -6.0f32..6.0, az in 0.0f32..40.0,
        bx in -6.0f32..6.0, by in -6.0f32..6.0, bz in 0.0f32..40.0,
    ) {
        let a = Vec3::new(ax, ay, az);
        let b = Vec3::new(bx, by, bz);
        let mut nodes = NodeLayer::from_points([(a, Theme::Memory), (b, Theme::Logic)]);
        let mut engine = LinkEngine::new(rules(), "p".into(), 0, Box::new(OfflineSync));
        let mut out = Vec::new();
        let result = engine.try_link(NodeId(0), NodeId(1), 0.0, &mut nodes, &mut out);
        let max = rules().max_link_distance;
        if a.distance(b) > max {
            prop_assert!(matches!(result, Err(LinkRejected::TooFar { .. })), "expected TooFar, got {:?}", result);
            prop_assert!(out.is_empty());
            prop_assert_eq!(nodes.state(NodeId(0)), Some(NodeState::Locked));
        } else {
            prop_assert!(result.is_ok());
            prop_assert_eq!(out.len(), 1);
        }
    }
}
