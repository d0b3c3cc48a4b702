use std::fmt;

/// Sequence number of one binary-log segment file.
///
/// Segments sort by sequence, which is also their creation order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(transparent)]
pub struct SegmentId(pub u64);

impl SegmentId {
    /// The segment the server opens after this one.
    pub fn next(self) -> Self {
        Self(self.0.saturating_add(1))
    }

    /// File name of this segment for the given log base name.
    ///
    /// Sequences are zero-padded to six digits, as the server writes them.
    pub fn file_name(self, base_name: &str) -> String {
        format!("{base_name}.{:06}", self.0)
    }

    /// Parse a segment file name such as `mysql-bin.000042`.
    ///
    /// Returns `None` for the index file and anything else whose suffix is
    /// not purely digits.
    pub fn from_file_name(base_name: &str, name: &str) -> Option<Self> {
        let suffix = name.strip_prefix(base_name)?.strip_prefix('.')?;
        if suffix.is_empty() || !suffix.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        suffix.parse().ok().map(Self)
    }
}

impl fmt::Display for SegmentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:06}", self.0)
    }
}

/// Inclusive range of segments captured by one incremental backup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CaptureWindow {
    pub first: SegmentId,
    pub last: SegmentId,
}

impl CaptureWindow {
    /// The window following `before`, up to and including `last`.
    pub fn after(before: SegmentId, last: SegmentId) -> Self {
        Self {
            first: before.next(),
            last,
        }
    }

    /// True when there is nothing new to capture.
    pub fn is_empty(&self) -> bool {
        self.last < self.first
    }

    pub fn contains(&self, id: SegmentId) -> bool {
        self.first <= id && id <= self.last
    }

    /// Number of segment sequences spanned by the window.
    pub fn len(&self) -> u64 {
        if self.is_empty() {
            0
        } else {
            self.last.0 - self.first.0 + 1
        }
    }

    /// Select the segments from `present` that fall inside this window.
    pub fn select(self, present: &[SegmentId]) -> impl Iterator<Item = SegmentId> + '_ {
        present.iter().copied().filter(move |id| self.contains(*id))
    }
}

impl fmt::Display for CaptureWindow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_empty() {
            write!(f, "[empty]")
        } else {
            write!(f, "[{}, {}]", self.first, self.last)
        }
    }
}
