//! Fixed-capacity ring buffer of fixed-width rows.
//!
//! Rows live in one flat arena of `capacity * width` values. Pushing into a
//! full buffer overwrites the oldest row in place; nothing is shifted.

/// Ring buffer holding up to `capacity` rows of `width` values each.
#[derive(Debug, Clone)]
pub struct RingBuffer {
    data: Vec<f64>,
    width: usize,
    capacity: usize,
    /// Slot of the oldest row.
    head: usize,
    len: usize,
}

impl RingBuffer {
    /// Create an empty buffer.
    pub fn new(capacity: usize, width: usize) -> Self {
        Self {
            data: vec![0.0; capacity * width],
            width,
            capacity,
            head: 0,
            len: 0,
        }
    }

    /// Number of rows held.
    pub fn len(&self) -> usize {
        self.len
    }

    /// Whether no rows are held.
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Whether the buffer is at capacity.
    pub fn is_full(&self) -> bool {
        self.len == self.capacity
    }

    /// Values per row.
    pub fn width(&self) -> usize {
        self.width
    }

    /// Claim the slot for a new newest row, evicting the oldest row when full.
    ///
    /// The returned slot still holds stale values and must be overwritten.
    pub fn push_slot(&mut self) -> &mut [f64] {
        let slot = if self.is_full() {
            let slot = self.head;
            self.head = (self.head + 1) % self.capacity;
            slot
        } else {
            self.len += 1;
            (self.head + self.len - 1) % self.capacity
        };
        let start = slot * self.width;
        &mut self.data[start..start + self.width]
    }

    /// Append a row.
    pub fn push(&mut self, row: &[f64]) {
        debug_assert_eq!(row.len(), self.width);
        self.push_slot().copy_from_slice(row);
    }

    /// Row `i`, oldest first.
    pub fn row(&self, i: usize) -> Option<&[f64]> {
        if i >= self.len {
            return None;
        }
        let start = ((self.head + i) % self.capacity) * self.width;
        Some(&self.data[start..start + self.width])
    }

    /// The held rows as two flat runs, oldest first (like `VecDeque::as_slices`).
    pub fn as_slices(&self) -> (&[f64], &[f64]) {
        let head = self.head * self.width;
        let end = head + self.len * self.width;
        if end <= self.data.len() {
            (&self.data[head..end], &self.data[..0])
        } else {
            let wrapped = end - self.data.len();
            (&self.data[head..], &self.data[..wrapped])
        }
    }

    /// Drop all rows.
    pub fn clear(&mut self) {
        self.head = 0;
        self.len = 0;
    }
}
