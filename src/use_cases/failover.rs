// Authority failover: deterministic, race-tolerant claim rule.
//
// The check is a pure function of the snapshot, so under normal propagation
// exactly one participant satisfies it; a late double-claim just sets the
// flag true twice, which the protocol tolerates.

use crate::domain::session::{SessionDoc, SessionStatus};

/// True when this participant should unilaterally claim authority: nobody
/// holds the flag and this participant occupies the earliest surviving
/// position in the turn order.
pub fn should_claim(doc: &SessionDoc, self_id: &str) -> bool {
    doc.status != SessionStatus::Ended
        && !doc.has_authority()
        && doc.earliest_surviving().map(String::as_str) == Some(self_id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::session::{ParticipantEntry, SessionPatch};
    use std::collections::BTreeMap;

    fn doc_with_roster(ids: &[&str]) -> SessionDoc {
        let mut doc = SessionDoc::new("s1", 0);
        doc.status = SessionStatus::Active;
        for id in ids {
            let patch = SessionPatch {
                upsert_participants: BTreeMap::from([(id.to_string(), ParticipantEntry::new(*id))]),
                ..Default::default()
            };
            patch.apply(&mut doc);
        }
        doc
    }

    #[test]
    fn when_nobody_holds_the_flag_then_only_the_earliest_survivor_claims() {
        let doc = doc_with_roster(&["a", "b", "c"]);

        assert!(should_claim(&doc, "a"));
        assert!(!should_claim(&doc, "b"));
        assert!(!should_claim(&doc, "c"));
    }

    #[test]
    fn when_the_earliest_participant_is_gone_then_the_next_survivor_claims() {
        let mut doc = doc_with_roster(&["a", "b", "c"]);
        doc.participants.remove("a");

        assert!(should_claim(&doc, "b"));
        assert!(!should_claim(&doc, "c"));
    }

    #[test]
    fn when_an_authority_exists_then_nobody_claims() {
        let mut doc = doc_with_roster(&["a", "b"]);
        if let Some(entry) = doc.participants.get_mut("b") {
            entry.is_authority = true;
        }

        assert!(!should_claim(&doc, "a"));
        assert!(!should_claim(&doc, "b"));
    }

    #[test]
    fn when_the_session_has_ended_then_nobody_claims() {
        let mut doc = doc_with_roster(&["a"]);
        doc.status = SessionStatus::Ended;

        assert!(!should_claim(&doc, "a"));
    }
}
