use alloc::{string::String, vec::Vec};

use serde::{Deserialize, Serialize};

/// A stored score, before ranking.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScoreRow {
    pub display_name: String,
    pub score: u32,
    pub created_at_unix_s: u64,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RankedScore {
    pub rank: u32,
    pub display_name: String,
    pub score: u32,
    pub created_at_unix_s: u64,
}

/// Dense ranks for scores already sorted in descending order: equal scores
/// share a rank and the next distinct score gets the following one.
pub fn dense_ranks(scores: &[u32]) -> Vec<u32> {
    let mut ranks = Vec::with_capacity(scores.len());
    let mut previous: Option<u32> = None;
    let mut rank = 0u32;
    for &score in scores {
        if previous != Some(score) {
            rank += 1;
            previous = Some(score);
        }
        ranks.push(rank);
    }
    ranks
}

/// Rank rows sorted by score descending (ties in arrival order). Row order
/// is preserved.
pub fn rank_rows(rows: Vec<ScoreRow>) -> Vec<RankedScore> {
    let scores: Vec<u32> = rows.iter().map(|row| row.score).collect();
    rows.into_iter()
        .zip(dense_ranks(&scores))
        .map(|(row, rank)| RankedScore {
            rank,
            display_name: row.display_name,
            score: row.score,
            created_at_unix_s: row.created_at_unix_s,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::{format, vec};

    fn rows(scores: &[u32]) -> Vec<ScoreRow> {
        scores
            .iter()
            .enumerate()
            .map(|(i, score)| ScoreRow {
                display_name: format!("player-{i}"),
                score: *score,
                created_at_unix_s: 1_700_000_000 + i as u64,
            })
            .collect()
    }

    #[test]
    fn ties_share_a_rank() {
        assert_eq!(dense_ranks(&[9, 9, 7, 7, 5]), vec![1, 1, 2, 2, 3]);
    }

    #[test]
    fn empty_and_single() {
        assert!(dense_ranks(&[]).is_empty());
        assert_eq!(dense_ranks(&[5]), vec![1]);
        assert!(rank_rows(Vec::new()).is_empty());
    }

    #[test]
    fn all_equal_scores_rank_first() {
        assert_eq!(dense_ranks(&[0, 0, 0]), vec![1, 1, 1]);
    }

    #[test]
    fn rank_rows_keeps_order_and_fields() {
        let ranked = rank_rows(rows(&[12, 12, 3]));
        assert_eq!(ranked.len(), 3);
        assert_eq!(ranked[0].display_name, "player-0");
        assert_eq!(ranked[1].display_name, "player-1");
        assert_eq!(ranked[1].rank, 1);
        assert_eq!(ranked[2].rank, 2);
        assert_eq!(ranked[2].score, 3);
        assert_eq!(ranked[2].created_at_unix_s, 1_700_000_002);
    }
}
