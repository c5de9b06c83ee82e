//! Compacting line numbers into contiguous ranges for display.

use crate::model::LineStatus;

/// Coalesce sorted, distinct line numbers into maximal `(start, end)` runs.
#[must_use]
pub fn rangify(lines: &[u32]) -> Vec<(u32, u32)> {
    let Some((&first, rest)) = lines.split_first() else {
        return Vec::new();
    };

    debug_assert!(
        lines.windows(2).all(|w| w[0] < w[1]),
        "rangify requires sorted, deduplicated input"
    );

    let mut ranges = Vec::new();
    let mut start = first;
    let mut end = first;

    for &line in rest {
        if line == end + 1 {
            end = line;
        } else {
            ranges.push((start, end));
            start = line;
            end = line;
        }
    }

    ranges.push((start, end));
    ranges
}

/// Like [`rangify`], but a run also breaks whenever the status changes.
#[must_use]
pub fn rangify_by_status(lines: &[(u32, LineStatus)]) -> Vec<(u32, u32, LineStatus)> {
    let Some((&(first, first_status), rest)) = lines.split_first() else {
        return Vec::new();
    };

    let mut ranges = Vec::new();
    let mut start = first;
    let mut end = first;
    let mut status = first_status;

    for &(line, line_status) in rest {
        if line == end + 1 && line_status == status {
            end = line;
        } else {
            ranges.push((start, end, status));
            start = line;
            end = line;
            status = line_status;
        }
    }

    ranges.push((start, end, status));
    ranges
}

/// Render ranges as e.g. `"1-3, ~5, 7-9"`; partial ranges get a `~` prefix.
#[must_use]
pub fn stringify(ranges: &[(u32, u32, LineStatus)]) -> String {
    ranges
        .iter()
        .map(|&(start, end, status)| {
            let prefix = if status == LineStatus::Partial { "~" } else { "" };
            if start == end {
                format!("{prefix}{start}")
            } else {
                format!("{prefix}{start}-{end}")
            }
        })
        .collect::<Vec<_>>()
        .join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use LineStatus::*;

    #[test]
    fn test_rangify_empty() {
        assert_eq!(rangify(&[]), Vec::<(u32, u32)>::new());
    }

    #[test]
    fn test_rangify_single() {
        assert_eq!(rangify(&[5]), vec![(5, 5)]);
    }

    #[test]
    fn test_rangify_example() {
        assert_eq!(rangify(&[1, 2, 3, 7, 8, 9]), vec![(1, 3), (7, 9)]);
    }

    #[test]
    fn test_rangify_reconstructs_input() {
        let input = [2, 3, 5, 9, 10, 11, 12, 20];
        let rebuilt: Vec<u32> = rangify(&input)
            .into_iter()
            .flat_map(|(start, end)| start..=end)
            .collect();
        assert_eq!(rebuilt, input);
    }

    #[test]
    fn test_rangify_by_status_breaks_on_status() {
        let input = [(1, Miss), (2, Miss), (3, Partial), (4, Miss), (6, Miss)];
        assert_eq!(
            rangify_by_status(&input),
            vec![(1, 2, Miss), (3, 3, Partial), (4, 4, Miss), (6, 6, Miss)]
        );
    }

    #[test]
    fn test_rangify_by_status_no_adjacent_same_status() {
        let input = [(1, Hit), (2, Hit), (3, Miss), (4, Miss), (5, Hit), (8, Hit)];
        let ranges = rangify_by_status(&input);
        for pair in ranges.windows(2) {
            let (_, end, status) = pair[0];
            let (start, _, next_status) = pair[1];
            assert!(!(start == end + 1 && status == next_status), "{ranges:?}");
        }
    }

    #[test]
    fn test_stringify() {
        let ranges = rangify_by_status(&[(1, Miss), (2, Miss), (3, Miss), (7, Miss), (8, Miss), (9, Miss)]);
        assert_eq!(stringify(&ranges), "1-3, 7-9");
    }

    #[test]
    fn test_stringify_partial_and_singletons() {
        let ranges = [(2, 2, Miss), (4, 5, Partial), (8, 8, Partial)];
        assert_eq!(stringify(&ranges), "2, ~4-5, ~8");
    }

    #[test]
    fn test_stringify_empty() {
        assert_eq!(stringify(&[]), "");
    }
}
