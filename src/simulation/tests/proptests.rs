use crate::simulation::tests::utils::{arb_event, arb_instant, record, shipment, via_transit};
use crate::simulation::{Event, SnapshotReplayer};
use proptest::prelude::*;
use proptest::proptest;
use std::sync::Arc;

fn sorted(mut events: Vec<Event>) -> Arc<Vec<Event>> {
    events.sort_by_key(Event::order_key);
    Arc::new(events)
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn test_replay_is_deterministic(events in prop::collection::vec(arb_event(), 0..60), t in arb_instant()) {
        let events = sorted(events);
        let first = SnapshotReplayer::new(events.clone()).state_at(t);
        let second = SnapshotReplayer::new(Arc::new(events.to_vec())).state_at(t);
        prop_assert_eq!(first, second);
    }

    #[test]
    fn test_replay_is_incremental(
        events in prop::collection::vec(arb_event(), 0..60),
        a in arb_instant(),
        b in arb_instant(),
    ) {
        let (t1, t2) = if a <= b { (a, b) } else { (b, a) };
        let events = sorted(events);
        let replayer = SnapshotReplayer::new(events.clone());
        let stepped = SnapshotReplayer::advance(replayer.state_at(t1), &events, t2);
        prop_assert_eq!(replayer.state_at(t2), stepped);
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(16))]

    #[test]
    fn test_planned_timeline_never_overdraws(
        quantities in prop::collection::vec(1..120u32, 1..6),
        cancel_day in 1..4u32,
        t in arb_instant(),
    ) {
        let shipments = quantities
            .iter()
            .enumerate()
            .map(|(i, q)| shipment(&format!("{:09}", i + 1), "DST", *q, "2025-01-01T00:00"))
            .collect::<Vec<_>>();
        let requested = quantities.iter().sum::<u32>();
        let mut session = via_transit(shipments);
        session.plan();
        session.apply_cancellations(&[record(&format!("{:02}.TRN-DST-12:00", cancel_day))]);

        let snapshot = session.state_at(t);
        for (id, s) in &snapshot.shipments {
            let total = s.held_total() + s.airborne.values().sum::<u32>() + s.ready;
            let asked = session.shipments.iter().find(|x| &x.id == id).map_or(0, |x| x.quantity);
            prop_assert!(total <= asked, "{} holds {} of {}", id, total, asked);
        }
        let goods = snapshot.warehouses.values().sum::<u32>() + snapshot.flights.values().sum::<u32>();
        prop_assert!(goods <= requested);
        for (flight, load) in &snapshot.flights {
            let capacity = session.network().get(flight).map_or(0, |f| f.capacity);
            prop_assert!(*load <= capacity, "{} carries {} > {}", flight, load, capacity);
        }
    }
}
