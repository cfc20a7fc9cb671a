//! The ordered flag store for one session.
//!
//! Flags are kept ascending by timestamp. The source may deliver the same
//! flag twice, so ids already present are skipped on append.

use std::collections::HashSet;

use tracing::{debug, warn};

use flagwatch_shared::{Flag, Timestamp};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EventSet {
    flags: Vec<Flag>,
    ids: HashSet<String>,
}

impl EventSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a page, preserving timestamp order and skipping known ids.
    /// Returns the number of flags actually added.
    pub fn append(&mut self, page: Vec<Flag>) -> usize {
        let mut added = 0;
        for flag in page {
            if self.ids.contains(&flag.id) {
                debug!(flag = %flag.id, "Skipping duplicate flag");
                continue;
            }
            self.ids.insert(flag.id.clone());

            match self.flags.last() {
                Some(last) if last.timestamp > flag.timestamp => {
                    warn!(
                        flag = %flag.id,
                        timestamp = flag.timestamp,
                        last = last.timestamp,
                        "Out-of-order flag from source"
                    );
                    let at = self.flags.partition_point(|f| f.timestamp <= flag.timestamp);
                    self.flags.insert(at, flag);
                }
                _ => self.flags.push(flag),
            }
            added += 1;
        }
        added
    }

    pub fn flags(&self) -> &[Flag] {
        &self.flags
    }

    pub fn iter(&self) -> impl DoubleEndedIterator<Item = &Flag> {
        self.flags.iter()
    }

    pub fn get(&self, id: &str) -> Option<&Flag> {
        if !self.ids.contains(id) {
            return None;
        }
        self.flags.iter().find(|f| f.id == id)
    }

    pub fn len(&self) -> usize {
        self.flags.len()
    }

    pub fn is_empty(&self) -> bool {
        self.flags.is_empty()
    }

    pub fn last_timestamp(&self) -> Option<Timestamp> {
        self.flags.last().map(|f| f.timestamp)
    }
}
