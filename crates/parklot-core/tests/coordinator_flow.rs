#![allow(clippy::unwrap_used)]
// Integration tests for the coordinator: frames in, outbound frames and
// lot state out, over the in-memory link.

use std::num::NonZeroU32;
use std::time::Duration;

use bytes::Bytes;
use parklot_core::{
    Coordinator, CoordinatorHandle, CoreError, Outcome, Position, Registry, ReliableDelivery,
    RetryPolicy,
};
use parklot_radio::{
    DisplaySlot, InboundFrame, InboundMessage, LinkOutcome, MemoryTransport, NodeAddress,
    OutboundMessage, SpaceState,
};
use pretty_assertions::assert_eq;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

const ENTRANCE: NodeAddress = NodeAddress::new(0xE0);
const G1: NodeAddress = NodeAddress::new(0x10);
const G2: NodeAddress = NodeAddress::new(0x20);

// ── Fixtures ────────────────────────────────────────────────────────

/// Mall at the origin, cinema far east. G1 owns two spaces near the mall,
/// G2 one space next to the cinema.
fn lot() -> Registry {
    let mut b = Registry::builder();
    b.destination("mall", Position::new(0, 0)).unwrap();
    b.destination("cinema", Position::new(100, 0)).unwrap();
    let g1 = b.controller("G1", Position::new(0, 0), G1).unwrap();
    let g2 = b.controller("G2", Position::new(100, 0), G2).unwrap();
    b.space(g1, 1, 10, 0).unwrap();
    b.space(g1, 2, 5, 0).unwrap();
    b.space(g2, 1, 0, 0).unwrap();
    b.build()
}

fn coordinator(
    registry: Registry,
    link: &MemoryTransport,
    policy: RetryPolicy,
) -> Coordinator<MemoryTransport> {
    let delivery = ReliableDelivery::new(link.clone(), policy, CancellationToken::new());
    Coordinator::new(registry, 1, delivery)
}

fn arrival(sequence: u8, entrance: u8) -> InboundFrame {
    InboundFrame::new(
        ENTRANCE,
        InboundMessage::VehicleArrival { sequence, entrance }.encode(),
    )
}

fn status(from: NodeAddress, space_number: u8, state: SpaceState) -> InboundFrame {
    InboundFrame::new(
        from,
        InboundMessage::SpaceStatus {
            space_number,
            state,
        }
        .encode(),
    )
}

fn best(c: &Coordinator<MemoryTransport>, destination: &str) -> Option<String> {
    c.snapshot().destination(destination).unwrap().best_space.clone()
}

fn reservation(space_number: u8) -> Bytes {
    OutboundMessage::ReservationRequest { space_number }.encode()
}

/// (destination, decoded frame) for every acknowledged send.
fn delivered(link: &MemoryTransport) -> Vec<(NodeAddress, OutboundMessage)> {
    link.delivered()
        .into_iter()
        .map(|f| (f.destination, OutboundMessage::decode(&f.payload).unwrap()))
        .collect()
}

// ── Vehicle arrivals ────────────────────────────────────────────────

#[tokio::test]
async fn arrival_suggests_reserves_and_recomputes() {
    let link = MemoryTransport::new();
    let mut c = coordinator(lot(), &link, RetryPolicy::default());
    assert_eq!(best(&c, "mall").as_deref(), Some("G1.2"));
    assert_eq!(best(&c, "cinema").as_deref(), Some("G2.1"));

    let outcome = c.handle_frame(&arrival(0, 0)).await.unwrap();
    assert_eq!(
        outcome,
        Outcome::Arrival {
            entrance: 0,
            sequence: 0,
            suggested: vec![Some("G1.2".into()), Some("G2.1".into())],
            reserved: vec!["G1.2".into(), "G2.1".into()],
        }
    );

    assert_eq!(
        delivered(&link),
        vec![
            (
                ENTRANCE,
                OutboundMessage::DisplaySpaces {
                    slots: vec![
                        DisplaySlot::Space { x: 5, y: 0 },
                        DisplaySlot::Space { x: 100, y: 0 },
                    ],
                },
            ),
            (G1, OutboundMessage::ReservationRequest { space_number: 2 }),
            (G2, OutboundMessage::ReservationRequest { space_number: 1 }),
        ]
    );

    let snapshot = c.snapshot();
    assert!(!snapshot.space("G1.2").unwrap().available);
    assert!(!snapshot.space("G2.1").unwrap().available);
    assert_eq!(snapshot.available_count(), 1);
    assert_eq!(best(&c, "mall").as_deref(), Some("G1.1"));
    assert_eq!(best(&c, "cinema").as_deref(), Some("G1.1"));
}

#[tokio::test]
async fn retransmitted_arrival_is_ignored() {
    let link = MemoryTransport::new();
    let mut c = coordinator(lot(), &link, RetryPolicy::default());

    c.handle_frame(&arrival(0, 0)).await.unwrap();
    let sent = link.attempts().len();
    let before = c.snapshot();

    let outcome = c.handle_frame(&arrival(0, 0)).await.unwrap();
    assert_eq!(
        outcome,
        Outcome::DuplicateArrival {
            entrance: 0,
            sequence: 0
        }
    );
    assert!(!outcome.changed_state());
    assert_eq!(link.attempts().len(), sent);
    assert_eq!(c.snapshot().spaces, before.spaces);
}

#[tokio::test]
async fn shared_nearest_space_is_reserved_once() {
    let mut b = Registry::builder();
    b.destination("north", Position::new(0, 10)).unwrap();
    b.destination("south", Position::new(0, 12)).unwrap();
    let g = b.controller("G1", Position::new(0, 0), G1).unwrap();
    b.space(g, 1, 0, 11).unwrap();
    b.space(g, 2, 0, 40).unwrap();
    let link = MemoryTransport::new();
    let mut c = coordinator(b.build(), &link, RetryPolicy::default());

    let outcome = c.handle_frame(&arrival(0, 0)).await.unwrap();
    let Outcome::Arrival {
        suggested,
        reserved,
        ..
    } = outcome
    else {
        panic!("expected an accepted arrival, got {outcome:?}");
    };
    assert_eq!(suggested, vec![Some("G1.1".into()), Some("G1.1".into())]);
    assert_eq!(reserved, vec!["G1.1".to_owned()]);

    let reservations: Vec<_> = link
        .delivered()
        .into_iter()
        .filter(|f| f.destination == G1)
        .map(|f| f.payload)
        .collect();
    assert_eq!(reservations, vec![reservation(1)]);
    assert_eq!(best(&c, "north").as_deref(), Some("G1.2"));
}

#[tokio::test]
async fn full_lot_displays_no_space_and_reserves_nothing() {
    let link = MemoryTransport::new();
    let mut c = coordinator(lot(), &link, RetryPolicy::default());
    for (from, n) in [(G1, 1), (G1, 2), (G2, 1)] {
        c.handle_frame(&status(from, n, SpaceState::Occupied))
            .await
            .unwrap();
    }
    assert_eq!(c.snapshot().available_count(), 0);

    let outcome = c.handle_frame(&arrival(0, 0)).await.unwrap();
    assert_eq!(
        outcome,
        Outcome::Arrival {
            entrance: 0,
            sequence: 0,
            suggested: vec![None, None],
            reserved: vec![],
        }
    );
    assert_eq!(
        delivered(&link),
        vec![(
            ENTRANCE,
            OutboundMessage::DisplaySpaces {
                slots: vec![DisplaySlot::NoSpace, DisplaySlot::NoSpace],
            },
        )]
    );
}

#[tokio::test(start_paused = true)]
async fn negative_acks_are_retried_before_reservations_go_out() {
    let link = MemoryTransport::new();
    link.script([LinkOutcome::Nak, LinkOutcome::Stall, LinkOutcome::Deliver, LinkOutcome::Nak]);
    let mut c = coordinator(lot(), &link, RetryPolicy::default());

    c.handle_frame(&arrival(0, 0)).await.unwrap();

    let tags: Vec<(NodeAddress, u8, LinkOutcome)> = link
        .attempts()
        .into_iter()
        .map(|f| (f.destination, f.payload[0], f.outcome))
        .collect();
    assert_eq!(
        tags,
        vec![
            (ENTRANCE, b'D', LinkOutcome::Nak),
            (ENTRANCE, b'D', LinkOutcome::Stall),
            (ENTRANCE, b'D', LinkOutcome::Deliver),
            (G1, b'R', LinkOutcome::Nak),
            (G1, b'R', LinkOutcome::Deliver),
            (G2, b'R', LinkOutcome::Deliver),
        ]
    );
}

#[tokio::test(start_paused = true)]
async fn bounded_policy_keeps_going_after_giving_up_on_display() {
    let link = MemoryTransport::new();
    link.script([LinkOutcome::Stall, LinkOutcome::Stall]);
    let policy = RetryPolicy::bounded(Duration::from_secs(3), NonZeroU32::new(2).unwrap());
    let mut c = coordinator(lot(), &link, policy);

    let outcome = c.handle_frame(&arrival(0, 0)).await.unwrap();
    assert!(matches!(outcome, Outcome::Arrival { .. }));
    assert_eq!(
        link.delivered()
            .into_iter()
            .map(|f| (f.destination, f.payload))
            .collect::<Vec<_>>(),
        vec![(G1, reservation(2)), (G2, reservation(1))]
    );
}

// ── Space status ────────────────────────────────────────────────────

#[tokio::test]
async fn occupied_nearest_space_falls_back_to_next() {
    let link = MemoryTransport::new();
    let mut c = coordinator(lot(), &link, RetryPolicy::default());

    let outcome = c
        .handle_frame(&status(G1, 2, SpaceState::Occupied))
        .await
        .unwrap();
    assert_eq!(
        outcome,
        Outcome::SpaceUpdated {
            space_id: "G1.2".into(),
            state: SpaceState::Occupied,
            destinations_touched: 1,
        }
    );
    assert_eq!(best(&c, "mall").as_deref(), Some("G1.1"));
    assert_eq!(best(&c, "cinema").as_deref(), Some("G2.1"));
    assert!(link.attempts().is_empty());
}

#[tokio::test]
async fn freed_space_wins_back_destinations() {
    let link = MemoryTransport::new();
    let mut c = coordinator(lot(), &link, RetryPolicy::default());
    c.handle_frame(&status(G1, 2, SpaceState::Occupied))
        .await
        .unwrap();

    let outcome = c
        .handle_frame(&status(G1, 2, SpaceState::Available))
        .await
        .unwrap();
    assert_eq!(
        outcome,
        Outcome::SpaceUpdated {
            space_id: "G1.2".into(),
            state: SpaceState::Available,
            destinations_touched: 1,
        }
    );
    assert_eq!(best(&c, "mall").as_deref(), Some("G1.2"));
}

// ── Rejected frames ─────────────────────────────────────────────────

#[tokio::test]
async fn bad_frames_leave_state_untouched() {
    let link = MemoryTransport::new();
    let mut c = coordinator(lot(), &link, RetryPolicy::default());
    let before = c.snapshot();

    let err = c
        .handle_frame(&InboundFrame::new(G1, Bytes::from_static(b"X\x01\x02")))
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        CoreError::UnrecognizedMessage { tag: b'X', sender } if sender == G1
    ));

    let err = c
        .handle_frame(&InboundFrame::new(ENTRANCE, Bytes::from_static(b"E\x01")))
        .await
        .unwrap_err();
    assert!(matches!(err, CoreError::MalformedFrame { .. }));

    let err = c
        .handle_frame(&status(NodeAddress::new(0x99), 1, SpaceState::Occupied))
        .await
        .unwrap_err();
    assert!(matches!(err, CoreError::AddressNotMapped { .. }));

    let err = c
        .handle_frame(&status(G2, 7, SpaceState::Occupied))
        .await
        .unwrap_err();
    assert!(matches!(err, CoreError::SpaceNotFound { ref space_id, .. } if space_id == "G2.7"));

    let err = c.handle_frame(&arrival(0, 4)).await.unwrap_err();
    assert!(matches!(
        err,
        CoreError::UnknownEntrance {
            entrance: 4,
            configured: 1
        }
    ));

    assert_eq!(c.snapshot().spaces, before.spaces);
    assert_eq!(c.snapshot().destinations, before.destinations);
    assert!(link.attempts().is_empty());
}

// ── Running as a task ───────────────────────────────────────────────

#[tokio::test]
async fn spawned_coordinator_publishes_snapshots() {
    let link = MemoryTransport::new();
    let c = coordinator(lot(), &link, RetryPolicy::default());
    let (tx, rx) = mpsc::channel(8);
    let handle = CoordinatorHandle::spawn(c, rx);
    let mut updates = handle.subscribe();
    assert_eq!(handle.snapshot().available_count(), 3);

    tx.send(status(G1, 2, SpaceState::Occupied)).await.unwrap();
    tokio_test::assert_ok!(updates.changed().await);
    let snapshot = updates.borrow_and_update().clone();
    assert_eq!(
        snapshot.destination("mall").unwrap().best_space.as_deref(),
        Some("G1.1")
    );

    tx.send(arrival(0, 0)).await.unwrap();
    link.wait_for_deliveries(3).await;
    tokio_test::assert_ok!(updates.changed().await);
    assert_eq!(handle.snapshot().available_count(), 0);

    handle.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn shutdown_interrupts_a_stalled_send() {
    let link = MemoryTransport::new();
    link.script([LinkOutcome::Stall; 64]);
    let c = coordinator(lot(), &link, RetryPolicy::default());
    let (tx, rx) = mpsc::channel(8);
    let handle = CoordinatorHandle::spawn(c, rx);

    tx.send(arrival(0, 0)).await.unwrap();
    tokio::time::sleep(Duration::from_secs(30)).await;
    assert!(!handle.is_finished());
    assert!(link.delivered().is_empty());

    let updates = handle.subscribe();
    handle.shutdown().await;

    // Captured spaces were marked before the display send began.
    let last = updates.borrow().clone();
    assert_eq!(last.available_count(), 1);
    assert!(link.attempts().len() >= 5);
}
