//! Join races, larger lobbies and swarm convergence.

#[cfg(test)]
mod tests {
    use super::super::{rendezvous, settled_swarm, SETTLE};
    use pc_01_rendezvous::testing::Simulation;
    use pc_01_rendezvous::{RendezvousApi, RendezvousConfig};
    use shared_types::{NodeId, NodeRole};
    use std::collections::HashMap;
    use std::time::Duration;

    #[test]
    fn test_simultaneous_joiners_one_wins_other_coordinates() {
        let mut sim = Simulation::new(RendezvousConfig::for_testing());
        let a = sim.add_node(1).unwrap();
        let b = sim.add_node(2).unwrap();
        let c = sim.add_node(3).unwrap();

        let settled = sim.run_until(SETTLE, |s| {
            s.session(&a).unwrap().role() == NodeRole::Paired && s.coordinators().len() == 1
        });
        assert!(settled);
        sim.run_for(Duration::from_millis(100));

        let partner = sim.session(&a).unwrap().partners();
        assert_eq!(partner.len(), 1);
        let (winner, loser) = if partner[0] == b { (&b, &c) } else { (&c, &b) };
        assert_eq!(&partner[0], winner);
        assert!(sim.are_paired(&a, winner));
        assert_eq!(sim.session(loser).unwrap().role(), NodeRole::Coordinator);
        assert_eq!(sim.network().owner_of(&rendezvous()), Some(loser.clone()));
        assert_eq!(sim.peak_coordinators(), 1);
    }

    #[test]
    fn test_late_node_pairs_with_waiting_coordinator() {
        let mut sim = Simulation::new(RendezvousConfig::for_testing());
        let ids: Vec<NodeId> = (1..=3).map(|seed| sim.add_node(seed).unwrap()).collect();
        // Three nodes, lobbies of two: one is left coordinating.
        let two_paired = sim.run_until(SETTLE, |s| {
            let paired = ids
                .iter()
                .filter(|id| s.session(id).unwrap().role() == NodeRole::Paired)
                .count();
            paired == 2 && s.coordinators().len() == 1
        });
        assert!(two_paired);
        let waiting = sim.coordinators();

        let d = sim.add_node(4).unwrap();
        assert!(sim.run_until(SETTLE, |s| s.all_paired()));
        sim.run_for(Duration::from_millis(100));

        assert!(sim.are_paired(&waiting[0], &d));
        assert_eq!(sim.peak_coordinators(), 1);
        assert!(ids.iter().all(|id| sim.session(id).unwrap().partners().len() == 1));
    }

    #[test]
    fn test_lobby_of_three_forms_full_mesh() {
        let (sim, ids) =
            settled_swarm(RendezvousConfig::for_testing().with_capacity(3), &[1, 2, 3]);

        for (i, x) in ids.iter().enumerate() {
            for y in &ids[i + 1..] {
                assert!(sim.are_paired(x, y), "{x} and {y} not paired");
            }
        }
        assert_eq!(sim.network().owner_of(&rendezvous()), None);
        assert_eq!(sim.peak_coordinators(), 1);
    }

    #[test]
    fn test_lobby_of_three_waits_for_third_member() {
        let mut sim = Simulation::new(RendezvousConfig::for_testing().with_capacity(3));
        let a = sim.add_node(1).unwrap();
        let b = sim.add_node(2).unwrap();
        sim.run_for(Duration::from_secs(2));

        let lobby = sim.session(&a).unwrap().snapshot();
        assert_eq!(lobby.role, NodeRole::Coordinator);
        assert_eq!(lobby.lobby_members, vec![a.clone(), b.clone()]);
        assert!(!lobby.lobby_full);
        assert!(sim.session(&b).unwrap().partners().is_empty());
    }

    /// Six nodes settle into three pairs. Along the way there is never more
    /// than one coordinator and no diagnostic trail ever shrinks.
    #[test]
    fn test_swarm_of_six_settles_into_pairs() {
        let mut sim = Simulation::new(RendezvousConfig::for_testing());
        let ids: Vec<NodeId> = (1..=6).map(|seed| sim.add_node(seed).unwrap()).collect();

        let mut trail: HashMap<NodeId, usize> = HashMap::new();
        let settled = sim.run_until(SETTLE, |s| {
            for id in s.nodes() {
                let len = s.session(id).unwrap().diagnostics().len();
                let previous = trail.insert(id.clone(), len).unwrap_or(0);
                assert!(len >= previous, "diagnostics of {id} shrank");
            }
            s.all_paired()
        });
        assert!(settled);
        sim.run_for(Duration::from_millis(100));

        assert_eq!(sim.peak_coordinators(), 1);
        for id in &ids {
            let partners = sim.session(id).unwrap().partners();
            assert_eq!(partners.len(), 1);
            assert!(sim.are_paired(id, &partners[0]));
        }
    }
}
