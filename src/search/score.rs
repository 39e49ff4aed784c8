//! Diff scoring and candidate ranking

use serde::{Deserialize, Serialize};

/// Cost of a diff: the number of lines starting with `+` or `-`.
///
/// This is a literal prefix scan, so the `---`/`+++` file header lines of a
/// non-empty unified diff count too. An empty diff scores 0.
pub fn score_diff(diff: &str) -> u64 {
    diff.lines()
        .filter(|line| line.starts_with('+') || line.starts_with('-'))
        .count() as u64
}

/// Score of one candidate within an iteration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScoreRecord {
    pub candidate: String,
    pub score: u64,
}

/// Extremes of an iteration's scores
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ranking {
    /// Index of the winning candidate in list order
    pub winner: usize,
    pub min: u64,
    pub max: u64,
    /// Records in ascending score order; equal scores keep list order
    pub sorted: Vec<ScoreRecord>,
}

/// Rank records given in candidate-list order. `None` if there are none.
pub fn rank(records: &[ScoreRecord]) -> Option<Ranking> {
    let mut order: Vec<usize> = (0..records.len()).collect();
    order.sort_by_key(|&i| records[i].score);

    let winner = *order.first()?;
    let last = *order.last()?;
    Some(Ranking {
        winner,
        min: records[winner].score,
        max: records[last].score,
        sorted: order.iter().map(|&i| records[i].clone()).collect(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(candidate: &str, score: u64) -> ScoreRecord {
        ScoreRecord {
            candidate: candidate.into(),
            score,
        }
    }

    #[test]
    fn test_score_empty_diff() {
        assert_eq!(score_diff(""), 0);
    }

    #[test]
    fn test_score_counts_headers_and_changes() {
        let diff = "\
--- original
+++ formatted
@@ -1,3 +1,3 @@
 int a;
-int  b;
+int b;
 int c;
";
        assert_eq!(score_diff(diff), 4);
    }

    #[test]
    fn test_score_ignores_context_with_markers_inside() {
        let diff = " a - b\n x + y\n@@ -1 +1 @@\n";
        assert_eq!(score_diff(diff), 0);
    }

    #[test]
    fn test_score_without_trailing_newline() {
        assert_eq!(score_diff("+a\n-b"), 2);
    }

    #[test]
    fn test_rank_picks_first_minimum() {
        let records = vec![record("A", 5), record("B", 3), record("C", 3), record("D", 9)];
        let ranking = rank(&records).unwrap();

        assert_eq!(ranking.winner, 1);
        assert_eq!(ranking.min, 3);
        assert_eq!(ranking.max, 9);
        let order: Vec<_> = ranking.sorted.iter().map(|r| r.candidate.as_str()).collect();
        assert_eq!(order, vec!["B", "C", "A", "D"]);
    }

    #[test]
    fn test_rank_single_and_empty() {
        let ranking = rank(&[record("Only", 7)]).unwrap();
        assert_eq!(ranking.winner, 0);
        assert_eq!(ranking.min, ranking.max);

        assert!(rank(&[]).is_none());
    }
}
