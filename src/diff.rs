//! Minimal changed-region computation between two buffer snapshots.
//!
//! Works on whole lines: common prefix and suffix lines are trimmed first,
//! then the remaining middle goes through a Myers edit-script diff. The
//! region is the contiguous span in the *new* text covering every inserted
//! line — walking the script, equal and inserted chunks advance the offset,
//! deleted chunks do not (they only exist in the old text).
//!
//! The computation is time-bounded: when the deadline expires (or the
//! middle is too large to diff within bounded memory) the whole trimmed
//! middle is reported as the changed region. The result is used only for a
//! transient visual marker, so best-effort is fine and hanging is not.

use std::time::{Duration, Instant};

use crate::editor::Region;

/// Lines above this count skip the edit-script diff and take the trimmed
/// middle directly; the Myers trace is quadratic in the worst case.
const EDIT_SCRIPT_LINE_LIMIT: usize = 4096;

/// Span in `new` covering all content inserted relative to `old`.
///
/// Equal inputs and pure deletions produce an empty region.
pub fn changed_region(old: &str, new: &str, budget: Duration) -> Region {
    if old == new {
        return Region::empty_at(0);
    }
    let deadline = Instant::now() + budget;

    let old_lines = split_lines(old);
    let new_lines = split_lines(new);

    let prefix = common_prefix(&old_lines, &new_lines);
    let suffix = common_suffix(&old_lines[prefix..], &new_lines[prefix..]);

    let old_mid = &old_lines[prefix..old_lines.len() - suffix];
    let new_mid = &new_lines[prefix..new_lines.len() - suffix];

    let prefix_len: usize = new_lines[..prefix].iter().map(|l| l.len()).sum();
    let suffix_len: usize = new_lines[new_lines.len() - suffix..]
        .iter()
        .map(|l| l.len())
        .sum();

    if new_mid.is_empty() {
        // Pure deletion: nothing was inserted at all.
        return Region::empty_at(prefix_len);
    }

    if old_mid.is_empty() {
        // Pure insertion: the middle is the region.
        return Region::new(prefix_len, new.len() - suffix_len);
    }

    if old_mid.len() + new_mid.len() > EDIT_SCRIPT_LINE_LIMIT {
        return Region::new(prefix_len, new.len() - suffix_len);
    }

    match edit_script(old_mid, new_mid, deadline) {
        Some(script) => inserted_span(&script, prefix_len),
        None => {
            log::debug!("diff deadline hit, falling back to trimmed middle");
            Region::new(prefix_len, new.len() - suffix_len)
        }
    }
}

/// One chunk of the line-level edit script.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Chunk<'a> {
    Equal(&'a str),
    Delete(&'a str),
    Insert(&'a str),
}

/// Walk the script tracking a running offset into the new text.
fn inserted_span(script: &[Chunk<'_>], base_offset: usize) -> Region {
    let mut offset = base_offset;
    let mut start = None;
    let mut end = base_offset;
    for chunk in script {
        match chunk {
            Chunk::Equal(line) => offset += line.len(),
            Chunk::Insert(line) => {
                start.get_or_insert(offset);
                offset += line.len();
                end = offset;
            }
            Chunk::Delete(_) => {}
        }
    }
    match start {
        Some(start) => Region::new(start, end),
        None => Region::empty_at(base_offset),
    }
}

/// Split into lines keeping terminators, so offsets add back up exactly.
fn split_lines(text: &str) -> Vec<&str> {
    let mut lines = Vec::new();
    let mut rest = text;
    while let Some(i) = rest.find('\n') {
        lines.push(&rest[..=i]);
        rest = &rest[i + 1..];
    }
    if !rest.is_empty() {
        lines.push(rest);
    }
    lines
}

fn common_prefix(old: &[&str], new: &[&str]) -> usize {
    old.iter().zip(new).take_while(|(a, b)| a == b).count()
}

fn common_suffix(old: &[&str], new: &[&str]) -> usize {
    old.iter()
        .rev()
        .zip(new.iter().rev())
        .take_while(|(a, b)| a == b)
        .count()
}

/// Greedy Myers diff over lines, with the classic trace-based backtrack.
///
/// Returns `None` when the deadline expires mid-search.
fn edit_script<'a>(old: &[&'a str], new: &[&'a str], deadline: Instant) -> Option<Vec<Chunk<'a>>> {
    let n = old.len();
    let m = new.len();
    let max = n + m;
    let idx = |k: isize| (k + max as isize) as usize;

    // v[k] = furthest x reached on diagonal k after each round; the
    // per-round snapshots drive the backtrack.
    let mut v = vec![0usize; 2 * max + 1];
    let mut trace: Vec<Vec<usize>> = Vec::new();

    let mut found_d = None;
    'search: for d in 0..=max as isize {
        if Instant::now() > deadline {
            return None;
        }
        trace.push(v.clone());
        let mut k = -d;
        while k <= d {
            let mut x = if k == -d || (k != d && v[idx(k - 1)] < v[idx(k + 1)]) {
                v[idx(k + 1)]
            } else {
                v[idx(k - 1)] + 1
            };
            let mut y = (x as isize - k) as usize;
            while x < n && y < m && old[x] == new[y] {
                x += 1;
                y += 1;
            }
            v[idx(k)] = x;
            if x >= n && y >= m {
                found_d = Some(d);
                break 'search;
            }
            k += 2;
        }
    }
    let found_d = found_d?;

    // Backtrack from (n, m), emitting chunks in reverse.
    let mut reversed: Vec<Chunk<'a>> = Vec::new();
    let mut x = n;
    let mut y = m;
    for d in (1..=found_d).rev() {
        let v = &trace[d as usize];
        let k = x as isize - y as isize;
        let prev_k = if k == -d || (k != d && v[idx(k - 1)] < v[idx(k + 1)]) {
            k + 1
        } else {
            k - 1
        };
        let prev_x = v[idx(prev_k)];
        let prev_y = (prev_x as isize - prev_k) as usize;

        // Head of the snake right after the non-diagonal step.
        let (sx, sy) = if prev_k == k + 1 {
            (prev_x, prev_y + 1)
        } else {
            (prev_x + 1, prev_y)
        };
        while x > sx {
            reversed.push(Chunk::Equal(new[y - 1]));
            x -= 1;
            y -= 1;
        }
        if prev_k == k + 1 {
            reversed.push(Chunk::Insert(new[prev_y]));
        } else {
            reversed.push(Chunk::Delete(old[prev_x]));
        }
        x = prev_x;
        y = prev_y;
    }
    while y > 0 {
        reversed.push(Chunk::Equal(new[y - 1]));
        x = x.saturating_sub(1);
        y -= 1;
    }

    reversed.reverse();
    Some(reversed)
}
