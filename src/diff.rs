//! Token-level sequence alignment.
//!
//! Computes a minimal edit script between two token sequences as runs of
//! Equal/Replace/Insert/Delete opcodes, via a longest-common-subsequence
//! dynamic program with a fixed tie-break so identical inputs always produce
//! the identical opcode sequence. Tokenization happens upstream: this module
//! only compares token text for equality.

/// Kind of one diff opcode
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiffTag {
    Equal,
    Replace,
    Insert,
    Delete,
}

/// One run of a computed diff, addressed by token indices into the original
/// and corrected sequences
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiffOpcode {
    pub tag: DiffTag,
    /// Half-open token range into the original sequence
    pub orig: (usize, usize),
    /// Half-open token range into the corrected sequence
    pub corr: (usize, usize),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Step {
    Keep,
    DeleteOrig,
    InsertCorr,
}

/// Align `original` against `corrected`, returning coalesced opcode runs.
///
/// Two identical sequences yield a single Equal opcode spanning the whole
/// sequence; two empty sequences yield no opcodes.
pub fn diff_tokens(original: &[&str], corrected: &[&str]) -> Vec<DiffOpcode> {
    let n = original.len();
    let m = corrected.len();
    if n == 0 && m == 0 {
        return Vec::new();
    }

    // LCS length table, (n+1) x (m+1)
    let mut lcs = vec![vec![0usize; m + 1]; n + 1];
    for i in 1..=n {
        for j in 1..=m {
            lcs[i][j] = if original[i - 1] == corrected[j - 1] {
                lcs[i - 1][j - 1] + 1
            } else {
                lcs[i - 1][j].max(lcs[i][j - 1])
            };
        }
    }

    // Deterministic backtrack: prefer consuming the original on ties
    let mut steps = Vec::with_capacity(n + m);
    let (mut i, mut j) = (n, m);
    while i > 0 || j > 0 {
        if i > 0 && j > 0 && original[i - 1] == corrected[j - 1] {
            steps.push(Step::Keep);
            i -= 1;
            j -= 1;
        } else if j == 0 || (i > 0 && lcs[i - 1][j] >= lcs[i][j - 1]) {
            steps.push(Step::DeleteOrig);
            i -= 1;
        } else {
            steps.push(Step::InsertCorr);
            j -= 1;
        }
    }
    steps.reverse();

    coalesce(&steps)
}

/// Fold per-token steps into maximal opcode runs; adjacent delete and insert
/// runs over the same gap merge into one Replace
fn coalesce(steps: &[Step]) -> Vec<DiffOpcode> {
    let mut opcodes = Vec::new();
    let (mut i, mut j) = (0usize, 0usize);
    let mut k = 0usize;

    while k < steps.len() {
        if steps[k] == Step::Keep {
            let (i1, j1) = (i, j);
            while k < steps.len() && steps[k] == Step::Keep {
                i += 1;
                j += 1;
                k += 1;
            }
            opcodes.push(DiffOpcode { tag: DiffTag::Equal, orig: (i1, i), corr: (j1, j) });
        } else {
            let (i1, j1) = (i, j);
            while k < steps.len() && steps[k] != Step::Keep {
                match steps[k] {
                    Step::DeleteOrig => i += 1,
                    Step::InsertCorr => j += 1,
                    Step::Keep => unreachable!(),
                }
                k += 1;
            }
            let tag = match (i > i1, j > j1) {
                (true, true) => DiffTag::Replace,
                (true, false) => DiffTag::Delete,
                (false, true) => DiffTag::Insert,
                (false, false) => unreachable!(),
            };
            opcodes.push(DiffOpcode { tag, orig: (i1, i), corr: (j1, j) });
        }
    }

    opcodes
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identical_sequences_single_equal() {
        let tokens = vec!["She", "goes", "to", "school", "."];
        let ops = diff_tokens(&tokens, &tokens);
        assert_eq!(ops.len(), 1);
        assert_eq!(ops[0], DiffOpcode { tag: DiffTag::Equal, orig: (0, 5), corr: (0, 5) });
    }

    #[test]
    fn test_empty_sequences() {
        assert!(diff_tokens(&[], &[]).is_empty());
    }

    #[test]
    fn test_insert_into_empty() {
        let ops = diff_tokens(&[], &["Hello", "."]);
        assert_eq!(ops, vec![DiffOpcode { tag: DiffTag::Insert, orig: (0, 0), corr: (0, 2) }]);
    }

    #[test]
    fn test_single_replace_run() {
        let a = vec!["She", "go", "to", "school", "."];
        let b = vec!["She", "goes", "to", "school", "."];
        let ops = diff_tokens(&a, &b);
        assert_eq!(
            ops,
            vec![
                DiffOpcode { tag: DiffTag::Equal, orig: (0, 1), corr: (0, 1) },
                DiffOpcode { tag: DiffTag::Replace, orig: (1, 2), corr: (1, 2) },
                DiffOpcode { tag: DiffTag::Equal, orig: (2, 5), corr: (2, 5) },
            ]
        );
    }

    #[test]
    fn test_trailing_insert() {
        let a = vec!["I", "like", "the", "bag"];
        let b = vec!["I", "like", "the", "bag", "."];
        let ops = diff_tokens(&a, &b);
        assert_eq!(ops.len(), 2);
        assert_eq!(ops[1], DiffOpcode { tag: DiffTag::Insert, orig: (4, 4), corr: (4, 5) });
    }

    #[test]
    fn test_delete_run() {
        let a = vec!["The", "the", "cat"];
        let b = vec!["The", "cat"];
        let ops = diff_tokens(&a, &b);
        assert_eq!(ops[1], DiffOpcode { tag: DiffTag::Delete, orig: (1, 2), corr: (1, 1) });
    }

    #[test]
    fn test_adjacent_delete_insert_becomes_replace() {
        let a = vec!["a", "b", "c"];
        let b = vec!["a", "x", "y", "c"];
        let ops = diff_tokens(&a, &b);
        assert_eq!(ops[1], DiffOpcode { tag: DiffTag::Replace, orig: (1, 2), corr: (1, 3) });
    }

    #[test]
    fn test_deterministic_across_runs() {
        let a = vec!["x", "y", "x", "y"];
        let b = vec!["y", "x"];
        let first = diff_tokens(&a, &b);
        for _ in 0..10 {
            assert_eq!(diff_tokens(&a, &b), first);
        }
    }

    #[test]
    fn test_ranges_are_contiguous() {
        let a = vec!["one", "two", "three", "four"];
        let b = vec!["one", "2", "three", "4", "5"];
        let ops = diff_tokens(&a, &b);
        let mut i = 0;
        let mut j = 0;
        for op in &ops {
            assert_eq!(op.orig.0, i);
            assert_eq!(op.corr.0, j);
            i = op.orig.1;
            j = op.corr.1;
        }
        assert_eq!(i, a.len());
        assert_eq!(j, b.len());
    }
}
