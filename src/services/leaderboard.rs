//! Ranked read-side projection of a session's participants.

use std::cmp::Ordering;

use crate::state::session::Participant;

/// A participant with their 1-based rank.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Standing {
    /// 1-based rank.
    pub position: usize,
    /// Ranked participant.
    pub participant: Participant,
}

fn ranking(a: &Participant, b: &Participant) -> Ordering {
    b.score
        .cmp(&a.score)
        .then_with(|| a.joined_at.cmp(&b.joined_at))
        .then_with(|| a.user_id.cmp(&b.user_id))
}

/// Order by score descending, then earliest join, then user id.
pub fn project(mut participants: Vec<Participant>) -> Vec<Standing> {
    participants.sort_by(ranking);
    participants
        .into_iter()
        .enumerate()
        .map(|(index, participant)| Standing {
            position: index + 1,
            participant,
        })
        .collect()
}

/// Revision of a participant set: grows with every join and every score write.
pub fn revision(participants: &[Participant]) -> u64 {
    participants.len() as u64 + participants.iter().map(|p| p.version).sum::<u64>()
}
