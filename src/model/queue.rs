//! Bounded Sample Queue
//!
//! Fixed-capacity single-producer/single-consumer ring buffer between the
//! sampling task and the consumer loop.
//!
//! Positions are free-running counters; a slot is `position % capacity`, so
//! `len() = write_pos - read_pos` and never exceeds the capacity. When the
//! producer finds the queue full it advances the read position itself and
//! overwrites the oldest unread sample. Each such loss increments the overrun
//! counter. `put` never blocks and never allocates.

use std::sync::atomic::{AtomicU16, AtomicU64, AtomicUsize, Ordering};

/// A single quantized reading of the analog front end.
pub type Sample = u16;

#[derive(Debug)]
pub struct BoundedSampleQueue {
    slots: Box<[AtomicU16]>,
    write_pos: AtomicUsize,
    read_pos: AtomicUsize,
    overruns: AtomicU64,
}

impl BoundedSampleQueue {
    /// Creates a queue holding at most `capacity` unread samples.
    ///
    /// # Panics
    /// Panics if `capacity` is zero.
    pub fn new(capacity: usize) -> Self {
        assert!(capacity > 0, "queue capacity must not be zero");
        Self {
            slots: (0..capacity).map(|_| AtomicU16::new(0)).collect(),
            write_pos: AtomicUsize::new(0),
            read_pos: AtomicUsize::new(0),
            overruns: AtomicU64::new(0),
        }
    }

    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    /// Producer side. Overwrites the oldest unread sample if the queue is full.
    pub fn put(&self, sample: Sample) {
        let write = self.write_pos.load(Ordering::Relaxed);
        let read = self.read_pos.load(Ordering::Acquire);
        if write.wrapping_sub(read) >= self.capacity()
            && self
                .read_pos
                .compare_exchange(
                    read,
                    read.wrapping_add(1),
                    Ordering::AcqRel,
                    Ordering::Acquire,
                )
                .is_ok()
        {
            self.overruns.fetch_add(1, Ordering::Relaxed);
        }
        // A failed exchange means the consumer freed the slot in the meantime.
        self.slots[write % self.capacity()].store(sample, Ordering::Relaxed);
        self.write_pos.store(write.wrapping_add(1), Ordering::Release);
    }

    /// Consumer side. Returns the oldest unread sample, if any.
    pub fn get(&self) -> Option<Sample> {
        loop {
            let read = self.read_pos.load(Ordering::Acquire);
            let write = self.write_pos.load(Ordering::Acquire);
            if write == read {
                return None;
            }
            let sample = self.slots[read % self.capacity()].load(Ordering::Relaxed);
            // Retry if the producer dropped this sample while we were reading it.
            if self
                .read_pos
                .compare_exchange(
                    read,
                    read.wrapping_add(1),
                    Ordering::AcqRel,
                    Ordering::Acquire,
                )
                .is_ok()
            {
                return Some(sample);
            }
        }
    }

    /// Copies exactly `n` samples out of the queue, or nothing if fewer are available.
    pub fn pull_window(&self, n: usize) -> Option<Vec<Sample>> {
        if self.len() < n {
            return None;
        }
        let mut window = Vec::with_capacity(n);
        while window.len() < n {
            // Only this consumer removes samples, so the count checked above stays available.
            match self.get() {
                Some(sample) => window.push(sample),
                None => break,
            }
        }
        Some(window)
    }

    /// Number of unread samples.
    pub fn len(&self) -> usize {
        let read = self.read_pos.load(Ordering::Acquire);
        let write = self.write_pos.load(Ordering::Acquire);
        write.wrapping_sub(read).min(self.capacity())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Samples lost to overwriting since the queue was created.
    pub fn overruns(&self) -> u64 {
        self.overruns.load(Ordering::Relaxed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn test_fifo_order() {
        let queue = BoundedSampleQueue::new(4);
        assert!(queue.is_empty());
        queue.put(1);
        queue.put(2);
        queue.put(3);
        assert_eq!(queue.len(), 3);
        assert_eq!(queue.get(), Some(1));
        assert_eq!(queue.get(), Some(2));
        queue.put(4);
        queue.put(5);
        assert_eq!(queue.get(), Some(3));
        assert_eq!(queue.get(), Some(4));
        assert_eq!(queue.get(), Some(5));
        assert_eq!(queue.get(), None);
        assert_eq!(queue.overruns(), 0);
    }

    #[test]
    fn test_overflow_overwrites_oldest() {
        let queue = BoundedSampleQueue::new(500);
        for i in 0..600u16 {
            queue.put(i);
            assert!(queue.len() <= queue.capacity());
        }
        assert_eq!(queue.len(), 500);
        assert_eq!(queue.overruns(), 100);
        assert_eq!(queue.get(), Some(100));
    }

    #[test]
    fn test_pull_window() {
        let queue = BoundedSampleQueue::new(8);
        for i in 0..5 {
            queue.put(i);
        }
        assert!(queue.pull_window(6).is_none());
        assert_eq!(queue.len(), 5);
        assert_eq!(queue.pull_window(3), Some(vec![0, 1, 2]));
        assert_eq!(queue.len(), 2);
    }

    #[test]
    fn test_concurrent_producer_consumer() {
        let queue = Arc::new(BoundedSampleQueue::new(64));
        let producer = {
            let queue = queue.clone();
            std::thread::spawn(move || {
                for i in 0..10_000u16 {
                    queue.put(i);
                }
            })
        };
        let mut received = Vec::new();
        while !producer.is_finished() || !queue.is_empty() {
            if let Some(sample) = queue.get() {
                received.push(sample);
            }
        }
        producer.join().unwrap();
        // Everything received is in order, and whatever is missing was counted.
        assert!(received.windows(2).all(|w| w[0] < w[1]));
        assert_eq!(received.len() as u64 + queue.overruns(), 10_000);
    }
}
