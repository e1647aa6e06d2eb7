//! Cross-node scenarios.
//!
//! Shared fixtures live here; each submodule holds one area of behaviour.

use pc_01_rendezvous::testing::Simulation;
use pc_01_rendezvous::RendezvousConfig;
use shared_types::NodeId;
use std::time::Duration;

pub mod lobby;
pub mod messaging;
pub mod pairing;
pub mod recovery;

/// Generous ceiling for a swarm to settle under the test timers.
pub const SETTLE: Duration = Duration::from_secs(10);

/// Rendezvous identity used by every simulated node.
pub fn rendezvous() -> NodeId {
    RendezvousConfig::for_testing().rendezvous_id
}

/// A simulation with one node per seed, run until everybody is paired.
///
/// Panics if the swarm does not settle.
pub fn settled_swarm(config: RendezvousConfig, seeds: &[u64]) -> (Simulation, Vec<NodeId>) {
    let mut sim = Simulation::new(config);
    let ids: Vec<NodeId> = seeds
        .iter()
        .map(|seed| sim.add_node(*seed).expect("node starts"))
        .collect();
    assert!(
        sim.run_until(SETTLE, |s| s.all_paired()),
        "swarm did not settle"
    );
    // Let in-flight partner dials open.
    sim.run_for(Duration::from_millis(100));
    (sim, ids)
}

/// Two nodes paired with each other: (coordinator, joiner).
pub fn settled_pair() -> (Simulation, NodeId, NodeId) {
    let (sim, ids) = settled_swarm(RendezvousConfig::for_testing(), &[1, 2]);
    (sim, ids[0].clone(), ids[1].clone())
}

/// Whether `node`'s diagnostic trail contains `needle`.
pub fn logged(sim: &Simulation, node: &NodeId, needle: &str) -> bool {
    use pc_01_rendezvous::RendezvousApi;

    sim.session(node)
        .is_some_and(|s| s.diagnostics().iter().any(|e| e.text.contains(needle)))
}
