// parallel.rs
use std::sync::Arc;

use tokio::sync::mpsc;

/// Runs one blocking task per input and yields the outputs in input order.
///
/// Every task reports `(index, output)` over a channel sized to the number of
/// tasks. Outputs that arrive ahead of an unfinished earlier task are parked
/// in a slot indexed by task number until the run in front of them is
/// complete. Memory is bounded by the number of inputs.
///
/// Must be created from within a tokio runtime. A task that panics never
/// reports, and the stream ends at its index.
pub struct Ordered<O> {
    slots: Vec<Option<O>>,
    head: usize,
    receiver: mpsc::Receiver<(usize, O)>,
}

impl<O: Send + 'static> Ordered<O> {
    pub fn spawn<I, F>(inputs: Vec<I>, transform: F) -> Self
    where
        I: Send + 'static,
        F: Fn(I) -> O + Send + Sync + 'static,
    {
        let count = inputs.len();
        let (sender, receiver) = mpsc::channel(count.max(1));
        let transform = Arc::new(transform);

        for (index, input) in inputs.into_iter().enumerate() {
            let sender = sender.clone();
            let transform = Arc::clone(&transform);
            tokio::task::spawn_blocking(move || {
                let output = transform(input);
                let _ = sender.blocking_send((index, output));
            });
        }

        Self {
            slots: (0..count).map(|_| None).collect(),
            head: 0,
            receiver,
        }
    }

    /// Returns the next output in input order, waiting for it if needed.
    pub async fn next(&mut self) -> Option<(usize, O)> {
        loop {
            if self.head >= self.slots.len() {
                return None;
            }

            if let Some(output) = self.slots[self.head].take() {
                let index = self.head;
                self.head += 1;
                return Some((index, output));
            }

            let (index, output) = self.receiver.recv().await?;
            self.slots[index] = Some(output);
        }
    }

    /// Waits for every task and returns the outputs in input order.
    pub async fn collect(mut self) -> Vec<O> {
        let mut outputs = Vec::with_capacity(self.slots.len());
        while let Some((_, output)) = self.next().await {
            outputs.push(output);
        }
        outputs
    }
}
