use crate::router::tests::utils::{add_airport, add_flight, arb_shipment, network, params, setup};
use proptest::prelude::*;
use proptest::proptest;
use std::collections::HashMap;

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    #[test]
    fn test_capacity_and_quantity_invariants(
        shipments in prop::collection::vec(arb_shipment(), 1..25),
        seed in 0..1000u64,
    ) {
        let mut airports = HashMap::new();
        let mut templates = Vec::new();
        add_airport(&mut airports, "HUB", 0, true);
        add_airport(&mut airports, "AP_1", 400, false);
        add_airport(&mut airports, "AP_2", 300, false);
        add_airport(&mut airports, "AP_3", 200, false);
        add_flight(&mut templates, &airports, "HUB", "AP_1", "06:00", "08:00", 250);
        add_flight(&mut templates, &airports, "HUB", "AP_2", "07:00", "09:30", 150);
        add_flight(&mut templates, &airports, "AP_1", "AP_3", "11:00", "12:00", 120);
        add_flight(&mut templates, &airports, "AP_2", "AP_3", "13:00", "14:00", 80);
        add_flight(&mut templates, &airports, "AP_1", "AP_2", "10:00", "11:00", 100);
        add_flight(&mut templates, &airports, "AP_3", "AP_1", "18:00", "20:00", 90);

        let (mut network, mut forecast, mut router) = setup(network(airports, &templates, 4), params().with_seed(seed));
        let assignments = router.plan(&mut network, &mut forecast, &shipments);

        prop_assert_eq!(shipments.len(), assignments.len());
        for a in &assignments {
            prop_assert_eq!(a.requested, a.assigned + a.pending, "quantity split of {}", a.shipment_id);
            prop_assert_eq!(a.assigned, a.routes.iter().map(|r| r.quantity).sum::<u32>());
            for r in &a.routes {
                prop_assert_eq!(Some(&a.destination_id), r.legs.last().map(|l| &l.destination_id));
                prop_assert!(r.quantity > 0);
            }
        }

        let mut booked = HashMap::new();
        for l in assignments.iter().flat_map(|a| a.routes.iter()).flat_map(|r| r.legs.iter().map(move |l| (l, r.quantity))) {
            *booked.entry(l.0.flight).or_insert(0u32) += l.1;
        }
        for (idx, f) in network.instances().iter().enumerate() {
            let used = booked.get(&idx).copied().unwrap_or(0);
            prop_assert!(used <= f.capacity, "{} overbooked: {} > {}", f.id, used, f.capacity);
            prop_assert_eq!(f.capacity - used, f.remaining());
        }

        let window = network.window();
        for (airport_id, airport) in network.airports().iter().filter(|(_, a)| !a.infinite_source) {
            let peak = forecast.peak_backlog(airport_id, window.start, window.end);
            prop_assert!(peak <= airport.capacity, "{} overfilled: {} > {}", airport_id, peak, airport.capacity);
        }
    }
}
