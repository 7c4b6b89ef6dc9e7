//! Leaderboard port. Scores are submitted once when a session finishes.

use std::sync::Mutex;

use crate::error::LeaderboardError;

/// Maximum number of entries kept by the in-memory board
pub const MAX_ENTRIES: usize = 10;

pub trait Leaderboard: Send + Sync {
    fn submit_score(&self, identity: &str, score: u32) -> Result<(), LeaderboardError>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LeaderboardEntry {
    pub identity: String,
    pub score: u32,
}

/// Top-N board kept in memory, sorted descending by score.
#[derive(Debug, Default)]
pub struct InMemoryLeaderboard {
    entries: Mutex<Vec<LeaderboardEntry>>,
}

impl InMemoryLeaderboard {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn entries(&self) -> Vec<LeaderboardEntry> {
        match self.entries.lock() {
            Ok(entries) => entries.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }
}

impl Leaderboard for InMemoryLeaderboard {
    fn submit_score(&self, identity: &str, score: u32) -> Result<(), LeaderboardError> {
        if identity.trim().is_empty() {
            return Err(LeaderboardError::EmptyIdentity);
        }
        let mut entries = self
            .entries
            .lock()
            .map_err(|_| LeaderboardError::Unavailable("lock poisoned".to_string()))?;

        // Equal scores keep submission order
        let pos = entries
            .iter()
            .position(|e| score > e.score)
            .unwrap_or(entries.len());
        entries.insert(
            pos,
            LeaderboardEntry {
                identity: identity.to_string(),
                score,
            },
        );
        entries.truncate(MAX_ENTRIES);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_empty_identity() {
        let board = InMemoryLeaderboard::new();
        assert_eq!(
            board.submit_score("  ", 10),
            Err(LeaderboardError::EmptyIdentity)
        );
        assert!(board.entries().is_empty());
    }

    #[test]
    fn keeps_descending_order() {
        let board = InMemoryLeaderboard::new();
        board.submit_score("a@x", 5).unwrap();
        board.submit_score("b@x", 12).unwrap();
        board.submit_score("c@x", 8).unwrap();
        let scores: Vec<u32> = board.entries().iter().map(|e| e.score).collect();
        assert_eq!(scores, vec![12, 8, 5]);
    }

    #[test]
    fn truncates_to_max_entries() {
        let board = InMemoryLeaderboard::new();
        for i in 0..15 {
            board.submit_score("p@x", i).unwrap();
        }
        let entries = board.entries();
        assert_eq!(entries.len(), MAX_ENTRIES);
        assert_eq!(entries[0].score, 14);
        assert_eq!(entries[MAX_ENTRIES - 1].score, 5);
    }
}
