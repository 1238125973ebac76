//! Read/write swappable resource pair
//!
//! Temporal reprojection reads last frame's result while this frame writes the
//! other slot. Nothing fences the two: correctness relies on never handing the
//! `write` slot to a reader within the pass that writes it.

/// Two equally shaped resources with swappable read/write roles
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DoubleBuffer<R> {
    buffers: [R; 2],
    write_index: usize,
}

impl<R> DoubleBuffer<R> {
    /// Create a pair; `first` starts as the read slot
    pub const fn new(first: R, second: R) -> Self {
        Self { buffers: [first, second], write_index: 1 }
    }

    /// Resource currently exposed to readers
    pub fn read(&self) -> &R {
        &self.buffers[1 - self.write_index]
    }

    /// Resource currently written
    pub fn write(&self) -> &R {
        &self.buffers[self.write_index]
    }

    /// Exchange the read and write roles
    pub fn swap(&mut self) {
        self.write_index = 1 - self.write_index;
    }

    /// Both resources, for release
    pub fn both(&self) -> [&R; 2] {
        [&self.buffers[0], &self.buffers[1]]
    }

    /// Consume the pair
    pub fn into_inner(self) -> [R; 2] {
        self.buffers
    }
}
