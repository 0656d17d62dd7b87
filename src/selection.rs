//! Record selection by source name and time window.
//!
//! The reader consults a [`Selection`] after parsing each record header and
//! before unpacking its samples. Records that do not match are skipped
//! silently; they are neither errors nor part of the result.

use crate::record::ChannelId;
use crate::time::HpTime;

/// Predicate deciding which records the reader returns.
pub trait Selection {
    /// `start` and `end` are the record's first and last sample times.
    fn matches(&self, id: &ChannelId, start: HpTime, end: HpTime) -> bool;
}

impl<F> Selection for F
where
    F: Fn(&ChannelId, HpTime, HpTime) -> bool,
{
    fn matches(&self, id: &ChannelId, start: HpTime, end: HpTime) -> bool {
        self(id, start, end)
    }
}

/// Closed time window; `None` leaves that side open.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TimeWindow {
    pub start: Option<HpTime>,
    pub end: Option<HpTime>,
}

impl TimeWindow {
    pub fn new(start: Option<HpTime>, end: Option<HpTime>) -> Self {
        Self { start, end }
    }

    fn overlaps(&self, start: HpTime, end: HpTime) -> bool {
        self.start.is_none_or(|s| end >= s) && self.end.is_none_or(|e| start <= e)
    }
}

/// One selection entry: a source-name pattern and optional time windows.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectionEntry {
    pattern: String,
    windows: Vec<TimeWindow>,
}

/// An ordered list of source-name patterns, each with optional time windows.
///
/// Patterns are matched against `NET_STA_LOC_CHAN_Q` using `*` (any run of
/// characters) and `?` (any single character). A pattern with only four
/// components matches any quality.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SelectionList {
    entries: Vec<SelectionEntry>,
}

impl SelectionList {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a pattern that matches at any time.
    pub fn with_pattern(self, pattern: &str) -> Self {
        self.with_window(pattern, TimeWindow::default())
    }

    /// Add a pattern restricted to `window`. Adding the same pattern again
    /// extends its list of windows.
    pub fn with_window(mut self, pattern: &str, window: TimeWindow) -> Self {
        let pattern = if pattern.matches('_').count() == 3 {
            format!("{pattern}_?")
        } else {
            pattern.to_string()
        };
        match self.entries.iter_mut().find(|e| e.pattern == pattern) {
            Some(entry) => entry.windows.push(window),
            None => self.entries.push(SelectionEntry {
                pattern,
                windows: vec![window],
            }),
        }
        self
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Selection for SelectionList {
    fn matches(&self, id: &ChannelId, start: HpTime, end: HpTime) -> bool {
        let name = id.source_name();
        self.entries.iter().any(|entry| {
            glob_match(entry.pattern.as_bytes(), name.as_bytes())
                && entry.windows.iter().any(|w| w.overlaps(start, end))
        })
    }
}

/// Iterative glob matching with single-star backtracking.
fn glob_match(pattern: &[u8], text: &[u8]) -> bool {
    let (mut p, mut t) = (0, 0);
    let mut star: Option<(usize, usize)> = None;
    while t < text.len() {
        if p < pattern.len() && (pattern[p] == b'?' || pattern[p] == text[t]) {
            p += 1;
            t += 1;
        } else if p < pattern.len() && pattern[p] == b'*' {
            star = Some((p, t));
            p += 1;
        } else if let Some((sp, st)) = star {
            p = sp + 1;
            t = st + 1;
            star = Some((sp, st + 1));
        } else {
            return false;
        }
    }
    pattern[p..].iter().all(|&c| c == b'*')
}
