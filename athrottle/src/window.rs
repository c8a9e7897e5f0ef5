use std::num::NonZeroUsize;

/// A fixed-duration slot of request and accept counts.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Bin {
    pub requests: u64,
    pub accepts: u64,
}

/// Request and accept counts summed over every bin of a [`Window`].
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Totals {
    pub requests: u64,
    pub accepts: u64,
}

/// A ring of bins approximating the most recent `bins * bin_duration` of traffic.
///
/// Exactly one bin is current. Marks land in the current bin and [`Window::rotate`]
/// moves to the next slot, clearing it, so the oldest counts are destroyed rather
/// than retained.
#[derive(Debug, Clone)]
pub struct Window {
    bins: Box<[Bin]>,
    current: usize,
}

impl Window {
    /// Creates a window of `bin_count` empty bins with bin 0 current.
    pub fn new(bin_count: NonZeroUsize) -> Self {
        Self {
            bins: vec![Bin::default(); bin_count.get()].into_boxed_slice(),
            current: 0,
        }
    }

    /// Counts a request in the current bin.
    pub fn mark_request(&mut self) {
        let bin = &mut self.bins[self.current];
        bin.requests = bin.requests.saturating_add(1);
    }

    /// Counts an accept in the current bin.
    pub fn mark_accept(&mut self) {
        let bin = &mut self.bins[self.current];
        bin.accepts = bin.accepts.saturating_add(1);
    }

    /// Advances to the next bin, wrapping after the last, and zeroes it.
    pub fn rotate(&mut self) {
        self.current = (self.current + 1) % self.bins.len();
        self.bins[self.current] = Bin::default();
    }

    /// Applies `ticks` rotations.
    ///
    /// Once `ticks` covers the whole ring every bin has been cleared, so the remaining
    /// rotations only move the current index.
    pub fn advance(&mut self, ticks: u64) {
        let len = self.bins.len() as u64;
        if ticks >= len {
            self.bins.fill(Bin::default());
            self.current = ((self.current as u64 + ticks % len) % len) as usize;
        } else {
            for _ in 0..ticks {
                self.rotate();
            }
        }
    }

    /// Sums every bin.
    pub fn totals(&self) -> Totals {
        self.bins.iter().fold(Totals::default(), |acc, bin| Totals {
            requests: acc.requests.saturating_add(bin.requests),
            accepts: acc.accepts.saturating_add(bin.accepts),
        })
    }

    /// Index of the bin that receives marks.
    pub fn current_index(&self) -> usize {
        self.current
    }

    /// Number of bins in the ring.
    pub fn len(&self) -> usize {
        self.bins.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bins.is_empty()
    }

    /// Every bin in slot order, starting at index 0.
    pub fn bins(&self) -> &[Bin] {
        &self.bins
    }
}
