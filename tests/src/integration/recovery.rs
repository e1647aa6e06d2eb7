//! Partner loss: crashes, silent partitions and severed links.

#[cfg(test)]
mod tests {
    use super::super::{logged, rendezvous, settled_pair, SETTLE};
    use pc_01_rendezvous::testing::Simulation;
    use pc_01_rendezvous::{RendezvousApi, RendezvousConfig, SubmitError};
    use shared_types::NodeRole;
    use std::time::Duration;

    fn sweep() -> Duration {
        RendezvousConfig::for_testing().sweep_interval
    }

    fn reconnect_window() -> Duration {
        RendezvousConfig::for_testing().reconnect_timeout
    }

    // =============================================================================
    // CRASH
    // =============================================================================

    #[test]
    fn test_crashed_partner_is_dropped_within_one_sweep() {
        let (mut sim, x, y) = settled_pair();

        sim.crash(&y);
        sim.run_for(sweep());

        let session = sim.session(&x).unwrap();
        assert_ne!(session.role(), NodeRole::Paired);
        assert!(session.partners().is_empty());
        assert_eq!(sim.submit(&y, "ghost"), Err(SubmitError::NotReady));
    }

    #[test]
    fn test_survivor_coordinates_then_pairs_with_newcomer() {
        let (mut sim, x, y) = settled_pair();
        sim.crash(&y);

        assert!(sim.run_until(SETTLE, |s| s.coordinators().len() == 1));
        assert_eq!(sim.coordinators(), vec![x.clone()]);
        assert_eq!(sim.network().owner_of(&rendezvous()), Some(x.clone()));

        let z = sim.add_node(3).unwrap();
        assert!(sim.run_until(SETTLE, |s| s.all_paired()));
        sim.run_for(Duration::from_millis(100));

        assert!(sim.are_paired(&x, &z));
        assert_eq!(sim.peak_coordinators(), 1);
    }

    // =============================================================================
    // SEVERED LINK
    // =============================================================================

    #[test]
    fn test_severed_pair_finds_each_other_again() {
        let (mut sim, x, y) = settled_pair();

        sim.sever(&x, &y);
        sim.run_for(Duration::from_millis(50));
        assert!(!sim.are_paired(&x, &y));
        assert_eq!(sim.session(&x).unwrap().role(), NodeRole::Joiner);
        assert!(logged(&sim, &x, "[Rejoin] Starting search for new partner..."));

        assert!(sim.run_until(SETTLE, |s| s.all_paired()));
        sim.run_for(Duration::from_millis(100));
        assert!(sim.are_paired(&x, &y));
        assert_eq!(sim.peak_coordinators(), 1);
    }

    // =============================================================================
    // PARTITION
    // =============================================================================

    #[test]
    fn test_partitioned_partner_is_retried_then_given_up() {
        let (mut sim, x, y) = settled_pair();

        sim.partition(&y);
        sim.run_for(sweep());
        assert!(logged(
            &sim,
            &x,
            &format!("[Auto] Attempting to reconnect to partner: {y}")
        ));
        // Inside the reconnect window: no longer paired, partner remembered.
        let session = sim.session(&x).unwrap();
        assert_eq!(session.role(), NodeRole::Joiner);
        assert!(!session.snapshot().paired);
        assert_eq!(session.partners(), vec![y.clone()]);
        assert!(sim.coordinators().is_empty());

        sim.run_for(reconnect_window() + sweep());
        assert!(logged(&sim, &x, &format!("[Auto] Partner {y} not responding")));

        assert!(sim.run_until(SETTLE, |s| s.session(&x).unwrap().role() == NodeRole::Coordinator));
        assert!(sim.session(&x).unwrap().partners().is_empty());
        // The cut-off node cannot claim while unreachable.
        assert_eq!(sim.coordinators(), vec![x]);
        assert_eq!(sim.peak_coordinators(), 1);
    }

    #[test]
    fn test_paired_node_always_has_open_partner_link() {
        let (mut sim, x, y) = settled_pair();
        sim.partition(&y);

        let paired_without_link = |sim: &Simulation| {
            let session = sim.session(&x).unwrap();
            session.snapshot().paired && !session.has_open_connection(&y)
        };
        sim.run_for(sweep() + Duration::from_millis(50));
        assert!(!paired_without_link(&sim));
        sim.run_for(sweep());
        assert!(!paired_without_link(&sim));
        assert_eq!(sim.session(&x).unwrap().partners(), vec![y.clone()]);
    }

    #[test]
    fn test_partition_healed_within_window_reconnects() {
        let (mut sim, x, y) = settled_pair();

        sim.partition(&y);
        sim.run_for(Duration::from_millis(300));
        sim.heal(&y);

        let reconnected = sim.run_until(reconnect_window() + sweep(), |s| s.are_paired(&x, &y));
        assert!(reconnected);
        assert!(logged(&sim, &x, &format!("[Auto] Reconnected to partner: {y}")));
        assert_eq!(sim.session(&x).unwrap().role(), NodeRole::Paired);
        assert_eq!(sim.session(&x).unwrap().partners(), vec![y.clone()]);
        assert!(sim.coordinators().is_empty());

        let sent = sim.submit(&x, "still here").unwrap();
        sim.run_for(Duration::from_millis(100));
        assert_eq!(sim.session(&y).unwrap().messages(), &[sent]);
    }
}
