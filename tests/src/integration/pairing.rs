//! Election and two-node pairing.

#[cfg(test)]
mod tests {
    use super::super::{rendezvous, settled_pair, SETTLE};
    use pc_01_rendezvous::testing::Simulation;
    use pc_01_rendezvous::{RendezvousApi, RendezvousConfig};
    use shared_types::NodeRole;
    use std::time::Duration;

    // =============================================================================
    // ELECTION
    // =============================================================================

    #[test]
    fn test_first_node_claims_rendezvous() {
        let mut sim = Simulation::new(RendezvousConfig::for_testing());
        let a = sim.add_node(1).unwrap();

        assert_eq!(sim.session(&a).unwrap().role(), NodeRole::Coordinator);
        assert_eq!(sim.network().owner_of(&rendezvous()), Some(a.clone()));

        let b = sim.add_node(2).unwrap();
        assert_eq!(sim.session(&b).unwrap().role(), NodeRole::Joiner);
        assert_eq!(sim.coordinators(), vec![a]);
    }

    #[test]
    fn test_lone_node_keeps_waiting() {
        let mut sim = Simulation::new(RendezvousConfig::for_testing());
        let a = sim.add_node(1).unwrap();
        sim.run_for(Duration::from_secs(3));

        let session = sim.session(&a).unwrap();
        assert_eq!(session.role(), NodeRole::Coordinator);
        assert!(session.partners().is_empty());
        assert_eq!(session.status(), "Waiting for a partner...");
    }

    // =============================================================================
    // TWO-NODE PAIRING
    // =============================================================================

    #[test]
    fn test_two_nodes_pair_with_one_coordinator() {
        let (sim, a, b) = settled_pair();

        assert_eq!(sim.peak_coordinators(), 1);
        assert!(sim.are_paired(&a, &b));
        assert_eq!(sim.session(&a).unwrap().partners(), vec![b.clone()]);
        assert_eq!(sim.session(&b).unwrap().partners(), vec![a.clone()]);
        assert_eq!(sim.network().owner_of(&rendezvous()), None);
        assert!(sim.coordinators().is_empty());
    }

    #[test]
    fn test_snapshots_agree_after_pairing() {
        let (sim, a, b) = settled_pair();

        let snap_a = sim.session(&a).unwrap().snapshot();
        let snap_b = sim.session(&b).unwrap().snapshot();
        assert!(snap_a.paired && snap_b.paired);
        assert_eq!(snap_a.partners, vec![b.clone()]);
        assert_eq!(snap_b.partners, vec![a.clone()]);
        assert!(snap_a.lobby_members.is_empty());
        assert!(!snap_b.bootstrap_open);
        assert_eq!(snap_b.status, "Paired!");
    }

    #[test]
    fn test_pairing_leaves_a_diagnostic_trail() {
        let (sim, a, b) = settled_pair();

        let trail_a: Vec<&str> = sim
            .session(&a)
            .unwrap()
            .diagnostics()
            .iter()
            .map(|e| e.text.as_str())
            .collect();
        assert!(trail_a.iter().any(|t| t.starts_with("[Peer] Initialized")));
        assert!(trail_a.contains(&"[Base] Became base peer!"));
        assert!(super::super::logged(&sim, &b, "[Pair] Received pairing notification"));
    }

    /// The rendezvous identity is held until the joiner has acknowledged,
    /// so there is never a window where the joiner is stranded.
    #[test]
    fn test_rendezvous_released_only_after_joiner_paired() {
        let mut sim = Simulation::with_latency(
            RendezvousConfig::for_testing(),
            Duration::from_millis(150),
        );
        let a = sim.add_node(1).unwrap();
        let b = sim.add_node(2).unwrap();
        let limit_ms = SETTLE.as_millis() as u64;

        while !sim.all_paired() && sim.elapsed_ms() < limit_ms {
            assert!(sim.step());
            if sim.network().owner_of(&rendezvous()).as_ref() != Some(&a) {
                assert_eq!(
                    sim.session(&b).unwrap().role(),
                    NodeRole::Paired,
                    "rendezvous released at {}ms before the joiner paired",
                    sim.elapsed_ms()
                );
            }
        }
        assert!(sim.all_paired());
        assert_eq!(sim.peak_coordinators(), 1);
    }
}
