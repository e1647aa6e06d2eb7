//! Identity generation.
//!
//! Node identities are a fixed prefix plus a random base-36 suffix. Message
//! ids combine the author, the send time and another random suffix, which
//! makes them unique by construction.

use rand::Rng;
use shared_types::{MessageId, NodeId};

const BASE36: &[u8; 36] = b"0123456789abcdefghijklmnopqrstuvwxyz";

/// Length of the random part of a message id.
pub const MESSAGE_SUFFIX_LEN: usize = 9;

/// Random lowercase base-36 string of `len` characters.
pub fn random_suffix<R: Rng + ?Sized>(rng: &mut R, len: usize) -> String {
    (0..len)
        .map(|_| BASE36[rng.gen_range(0..BASE36.len())] as char)
        .collect()
}

/// Generate a fresh node identity, e.g. `ChainNode-k3x9a0qz`.
pub fn generate_node_id<R: Rng + ?Sized>(prefix: &str, suffix_len: usize, rng: &mut R) -> NodeId {
    NodeId::new(format!("{}{}", prefix, random_suffix(rng, suffix_len)))
}

/// Generate a message id: `<author>_<now_ms>_<suffix>`.
pub fn generate_message_id<R: Rng + ?Sized>(
    author: &NodeId,
    now_ms: u64,
    rng: &mut R,
) -> MessageId {
    MessageId::new(format!(
        "{}_{}_{}",
        author,
        now_ms,
        random_suffix(rng, MESSAGE_SUFFIX_LEN)
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_node_id_has_prefix_and_suffix() {
        let mut rng = StdRng::seed_from_u64(7);
        let id = generate_node_id("ChainNode-", 8, &mut rng);

        let suffix = id.as_str().strip_prefix("ChainNode-").unwrap();
        assert_eq!(suffix.len(), 8);
        assert!(suffix
            .chars()
            .all(|c| c.is_ascii_digit() || c.is_ascii_lowercase()));
    }

    #[test]
    fn test_seeded_generation_is_deterministic() {
        let a = generate_node_id("N-", 8, &mut StdRng::seed_from_u64(1));
        let b = generate_node_id("N-", 8, &mut StdRng::seed_from_u64(1));
        assert_eq!(a, b);
    }

    #[test]
    fn test_message_id_layout() {
        let mut rng = StdRng::seed_from_u64(3);
        let author = NodeId::from("ChainNode-abc");
        let id = generate_message_id(&author, 1_700_000_000_000, &mut rng);

        let parts: Vec<&str> = id.as_str().rsplitn(3, '_').collect();
        assert_eq!(parts[0].len(), MESSAGE_SUFFIX_LEN);
        assert_eq!(parts[1], "1700000000000");
        assert_eq!(parts[2], "ChainNode-abc");
    }

    #[test]
    fn test_message_ids_differ_within_same_millisecond() {
        let mut rng = StdRng::seed_from_u64(9);
        let author = NodeId::from("a");
        let first = generate_message_id(&author, 5, &mut rng);
        let second = generate_message_id(&author, 5, &mut rng);
        assert_ne!(first, second);
    }
}
