//! Relay discipline for inbound chat envelopes.

use crate::domain::value_objects::RelayPolicy;
use shared_types::NodeId;

/// Whether an inbound envelope is relayed at all.
///
/// Envelopes authored locally are never relayed. Under
/// [`RelayPolicy::SeenSet`] an envelope that added nothing to the log has
/// already passed through here and is dropped.
pub fn should_relay(policy: RelayPolicy, from_self: bool, newly_merged: usize) -> bool {
    if from_self {
        return false;
    }
    match policy {
        RelayPolicy::ExcludeSender => true,
        RelayPolicy::SeenSet => newly_merged > 0,
    }
}

/// Partners an envelope is forwarded to.
///
/// `arrived_from` is the partner that delivered it (if the delivering
/// connection belongs to a partner) and `origin` the envelope's `from`.
pub fn relay_targets<'a>(
    partners: impl IntoIterator<Item = &'a NodeId>,
    arrived_from: Option<&NodeId>,
    origin: &NodeId,
    policy: RelayPolicy,
) -> Vec<NodeId> {
    partners
        .into_iter()
        .filter(|peer| Some(*peer) != arrived_from)
        .filter(|peer| policy == RelayPolicy::ExcludeSender || *peer != origin)
        .cloned()
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ids(names: &[&str]) -> Vec<NodeId> {
        names.iter().map(|n| NodeId::from(*n)).collect()
    }

    #[test]
    fn test_two_party_no_echo() {
        let partners = ids(&["a"]);
        let targets = relay_targets(
            &partners,
            Some(&NodeId::from("a")),
            &NodeId::from("a"),
            RelayPolicy::ExcludeSender,
        );
        assert!(targets.is_empty());
    }

    #[test]
    fn test_exclude_sender_only_skips_arrival_partner() {
        let partners = ids(&["a", "c"]);
        let targets = relay_targets(
            &partners,
            Some(&NodeId::from("c")),
            &NodeId::from("a"),
            RelayPolicy::ExcludeSender,
        );
        assert_eq!(targets, ids(&["a"]));
    }

    #[test]
    fn test_seen_set_skips_origin_too() {
        let partners = ids(&["a", "c", "d"]);
        let targets = relay_targets(
            &partners,
            Some(&NodeId::from("c")),
            &NodeId::from("a"),
            RelayPolicy::SeenSet,
        );
        assert_eq!(targets, ids(&["d"]));
    }

    #[test]
    fn test_should_relay() {
        assert!(!should_relay(RelayPolicy::ExcludeSender, true, 1));
        assert!(should_relay(RelayPolicy::ExcludeSender, false, 0));
        assert!(!should_relay(RelayPolicy::SeenSet, false, 0));
        assert!(should_relay(RelayPolicy::SeenSet, false, 2));
    }
}
