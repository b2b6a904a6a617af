//! Sample Source
//!
//! Periodic producer that reads one sample from the analog front end per tick
//! and hands it to the sample queue. It does nothing else, so every tick
//! finishes in bounded time.

use crate::{api::peripherals::AnalogInput, model::queue::BoundedSampleQueue};
use log::{error, trace};
use std::{
    sync::{Arc, Mutex},
    time::Duration,
};
use tokio::{task::JoinHandle, time::MissedTickBehavior};

pub struct SampleSource<A: AnalogInput + 'static> {
    input: Arc<Mutex<A>>,
    queue: Arc<BoundedSampleQueue>,
    period: Duration,
}

impl<A: AnalogInput + 'static> SampleSource<A> {
    pub fn new(input: Arc<Mutex<A>>, queue: Arc<BoundedSampleQueue>, period: Duration) -> Self {
        Self {
            input,
            queue,
            period,
        }
    }

    /// Starts the periodic timer. The task runs until its handle is aborted.
    pub fn spawn(self) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(self.period);
            // Late ticks are caught up so the sample count matches elapsed time.
            ticker.set_missed_tick_behavior(MissedTickBehavior::Burst);
            trace!("sampling every {:?}", self.period);
            loop {
                ticker.tick().await;
                let sample = match self.input.lock() {
                    Ok(mut input) => input.read(),
                    Err(e) => {
                        error!("analog input unavailable, sampling stopped: {}", e);
                        break;
                    }
                };
                self.queue.put(sample);
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Counter(u16);

    impl AnalogInput for Counter {
        fn read(&mut self) -> u16 {
            self.0 += 1;
            self.0
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_one_sample_per_tick() {
        let queue = Arc::new(BoundedSampleQueue::new(500));
        let input = Arc::new(Mutex::new(Counter(0)));
        let handle =
            SampleSource::new(input, queue.clone(), Duration::from_millis(4)).spawn();
        // The first tick fires immediately, then one every 4 ms.
        tokio::time::sleep(Duration::from_millis(398)).await;
        handle.abort();
        assert_eq!(queue.len(), 100);
        assert_eq!(queue.get(), Some(1));
        assert_eq!(queue.overruns(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_slow_consumer_loses_oldest_samples() {
        let queue = Arc::new(BoundedSampleQueue::new(500));
        let input = Arc::new(Mutex::new(Counter(0)));
        let handle =
            SampleSource::new(input, queue.clone(), Duration::from_millis(4)).spawn();
        // Three seconds without draining exceeds the two seconds of buffering.
        tokio::time::sleep(Duration::from_millis(2998)).await;
        handle.abort();
        assert_eq!(queue.len(), queue.capacity());
        assert_eq!(queue.overruns(), 250);
        assert_eq!(queue.get(), Some(251));
    }
}
