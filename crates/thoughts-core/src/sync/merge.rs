//! Pull-side merge of remote records into the local log.

use crate::models::Thought;

#[derive(Debug, Default, Clone, PartialEq)]
pub struct MergeOutcome {
    /// Merged sequence, newest first
    pub thoughts: Vec<Thought>,
    /// Remote records added with no local counterpart
    pub added: usize,
    /// Remote records kept as conflict copies
    pub conflicts: usize,
    /// Remote records dropped as already present
    pub duplicates: usize,
}

/// Merge decoded remote records into `local`.
///
/// A remote record matching any local record on timestamp and text is a
/// duplicate. One whose timestamp is unknown locally is appended. Otherwise
/// it shares a timestamp with local records of different text and is kept
/// as a conflict copy (`id + 1`, `timestamp + 1s`), unless that copy is
/// already present. The result is sorted newest first; ties keep their prior order.
pub fn merge_remote(local: Vec<Thought>, remote: Vec<Thought>) -> MergeOutcome {
    let mut outcome = MergeOutcome {
        thoughts: local,
        ..MergeOutcome::default()
    };
    let local_len = outcome.thoughts.len();

    for incoming in remote {
        let local = &outcome.thoughts[..local_len];
        if local.iter().any(|thought| same_entry(thought, &incoming)) {
            outcome.duplicates += 1;
            continue;
        }

        if !local
            .iter()
            .any(|thought| thought.timestamp == incoming.timestamp)
        {
            tracing::debug!("Added remote thought {}", incoming.timestamp);
            outcome.thoughts.push(incoming);
            outcome.added += 1;
            continue;
        }

        let copy = incoming.conflict_copy();
        if local.iter().any(|thought| same_entry(thought, &copy)) {
            outcome.duplicates += 1;
        } else {
            tracing::debug!("Conflict at {}, keeping both", copy.timestamp);
            outcome.thoughts.push(copy);
            outcome.conflicts += 1;
        }
    }

    outcome.thoughts.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
    outcome
}

fn same_entry(a: &Thought, b: &Thought) -> bool {
    a.timestamp == b.timestamp && a.text == b.text
}
