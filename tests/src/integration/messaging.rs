//! Chat submission, ordering and relay.

#[cfg(test)]
mod tests {
    use super::super::{settled_pair, settled_swarm};
    use pc_01_rendezvous::{RendezvousApi, RendezvousConfig, SubmitError};
    use shared_bus::{EventFilter, EventTopic, SessionEvent};
    use shared_types::{Message, MessageEnvelope, MessageId};
    use std::collections::HashMap;
    use std::time::Duration;

    const DELIVERY: Duration = Duration::from_millis(100);

    #[test]
    fn test_message_reaches_partner() {
        let (mut sim, x, y) = settled_pair();

        let sent = sim.submit(&y, "hello").unwrap();
        assert_eq!(sent.peer_id, y);
        assert_eq!(sent.text, "hello");
        sim.run_for(DELIVERY);

        let received = sim.session(&x).unwrap().messages();
        assert_eq!(received, &[sent.clone()]);
        assert_eq!(sim.session(&y).unwrap().messages(), &[sent]);
    }

    #[test]
    fn test_text_is_trimmed_before_sending() {
        let (mut sim, x, y) = settled_pair();

        sim.submit(&x, "  spaced out \n").unwrap();
        sim.run_for(DELIVERY);

        assert_eq!(sim.session(&y).unwrap().messages()[0].text, "spaced out");
    }

    #[test]
    fn test_log_stays_sorted_when_older_message_arrives_late() {
        let (mut sim, x, y) = settled_pair();
        let hello = sim.submit(&y, "hello").unwrap();
        sim.run_for(DELIVERY);

        let late = Message {
            id: MessageId::new("late-1"),
            peer_id: y.clone(),
            text: "written first".into(),
            timestamp: hello.timestamp - 10,
        };
        let envelope = MessageEnvelope::single(late.clone(), y.clone());
        let session = sim.session_mut(&x).unwrap();
        session.receive(envelope.clone(), None);
        session.receive(envelope, None);

        let texts: Vec<&str> = session.messages().iter().map(|m| m.text.as_str()).collect();
        assert_eq!(texts, vec!["written first", "hello"]);
    }

    #[test]
    fn test_empty_submission_changes_nothing() {
        let (mut sim, x, y) = settled_pair();
        let mut chat = sim.bus().subscribe(EventFilter::topics(vec![EventTopic::Chat]));

        assert_eq!(sim.submit(&y, ""), Err(SubmitError::EmptyText));
        assert_eq!(sim.submit(&y, "   "), Err(SubmitError::EmptyText));
        sim.run_for(DELIVERY);

        assert!(sim.session(&y).unwrap().messages().is_empty());
        assert!(sim.session(&x).unwrap().messages().is_empty());
        assert!(chat.drain().is_empty());
    }

    #[test]
    fn test_conversation_converges_on_both_sides() {
        let (mut sim, x, y) = settled_pair();

        for i in 0..5 {
            sim.submit(&x, &format!("x{i}")).unwrap();
            sim.run_for(Duration::from_millis(1));
            sim.submit(&y, &format!("y{i}")).unwrap();
            sim.run_for(Duration::from_millis(1));
        }
        sim.run_for(DELIVERY);

        let log_x = sim.session(&x).unwrap().messages();
        let log_y = sim.session(&y).unwrap().messages();
        assert_eq!(log_x.len(), 10);
        assert_eq!(log_x, log_y);
        assert!(log_x.windows(2).all(|w| w[0].timestamp <= w[1].timestamp));
    }

    /// In a lobby of three every member ends up with the message once and
    /// is notified once.
    #[test]
    fn test_lobby_of_three_delivers_once_to_each_member() {
        let (mut sim, ids) =
            settled_swarm(RendezvousConfig::for_testing().with_capacity(3), &[1, 2, 3]);
        for id in &ids {
            assert_eq!(sim.session(id).unwrap().partners().len(), 2);
        }
        let mut chat = sim.bus().subscribe(EventFilter::topics(vec![EventTopic::Chat]));

        let sent = sim.submit(&ids[0], "to everyone").unwrap();
        sim.run_for(DELIVERY);

        let mut notified: HashMap<_, usize> = HashMap::new();
        for event in chat.drain() {
            if let SessionEvent::MessageReceived { node, message } = event {
                assert_eq!(message, sent);
                *notified.entry(node).or_default() += 1;
            }
        }
        assert_eq!(notified.len(), 2);
        assert!(notified.values().all(|count| *count == 1));
        assert!(!notified.contains_key(&ids[0]));

        for id in &ids {
            assert_eq!(sim.session(id).unwrap().messages(), &[sent.clone()]);
        }
    }
}
