// Two-sample debounce and edge detection over sets of button pins
//
// Pins are referred to by their index in the tracked order, so a set of
// pins is a u32 bitmask. A level is only trusted once two consecutive
// samples agree, which rejects single-poll bounce at the cost of one
// poll period of latency.

use core::fmt;

/// Most distinct pins one detector can track.
pub const MAX_PINS: usize = 32;

#[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct PinSet(u32);

impl PinSet {
    pub const EMPTY: PinSet = PinSet(0);

    /// Set holding the single tracked index `index`; empty when `index`
    /// is not below [`MAX_PINS`].
    pub const fn single(index: usize) -> Self {
        if index < MAX_PINS {
            PinSet(1 << index)
        } else {
            PinSet::EMPTY
        }
    }

    pub const fn bits(self) -> u32 {
        self.0
    }

    /// Out-of-range indices are ignored.
    pub fn insert(&mut self, index: usize) {
        debug_assert!(index < MAX_PINS);
        self.0 |= PinSet::single(index).0;
    }

    pub const fn contains(self, index: usize) -> bool {
        index < MAX_PINS && self.0 & (1 << index) != 0
    }

    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    pub const fn len(self) -> usize {
        self.0.count_ones() as usize
    }

    /// Pins in `self` that are not in `other`.
    pub const fn difference(self, other: PinSet) -> PinSet {
        PinSet(self.0 & !other.0)
    }

    pub const fn is_subset(self, other: PinSet) -> bool {
        self.0 & !other.0 == 0
    }

    pub fn iter(self) -> impl Iterator<Item = usize> {
        (0..MAX_PINS).filter(move |&i| self.contains(i))
    }
}

impl fmt::Debug for PinSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.iter()).finish()
    }
}

impl FromIterator<usize> for PinSet {
    fn from_iter<I: IntoIterator<Item = usize>>(iter: I) -> Self {
        let mut set = PinSet::EMPTY;
        for index in iter {
            set.insert(index);
        }
        set
    }
}

/// Pins that changed state on this poll.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Edges {
    /// freshly pressed
    pub down: PinSet,
    /// freshly released
    pub up: PinSet,
}

impl Edges {
    pub const NONE: Edges = Edges {
        down: PinSet::EMPTY,
        up: PinSet::EMPTY,
    };

    pub const fn is_empty(&self) -> bool {
        self.down.is_empty() && self.up.is_empty()
    }
}

pub struct EdgeDetector {
    // debounced state reported to the dispatcher
    held: PinSet,
    // last raw sample, the debounce reference
    previous: PinSet,
}

impl EdgeDetector {
    pub const fn new() -> Self {
        Self {
            held: PinSet::EMPTY,
            previous: PinSet::EMPTY,
        }
    }

    /// Feed one raw sample (set of pins currently high).
    pub fn update(&mut self, raw: PinSet) -> Edges {
        if raw != self.previous {
            // settling: remember it, trust it next poll if it holds
            self.previous = raw;
            return Edges::NONE;
        }

        if raw == self.held {
            return Edges::NONE;
        }

        let edges = Edges {
            down: raw.difference(self.held),
            up: self.held.difference(raw),
        };
        self.held = raw;
        edges
    }

    pub fn held(&self) -> PinSet {
        self.held
    }

    pub fn is_settling(&self) -> bool {
        self.previous != self.held
    }
}

impl Default for EdgeDetector {
    fn default() -> Self {
        Self::new()
    }
}
