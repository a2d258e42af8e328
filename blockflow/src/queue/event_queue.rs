use std::any::TypeId;
use std::collections::VecDeque;

use crate::events::Envelope;

/// Whether a push observed the terminal event type among the batch it
/// was given. The caller (a runtime) is responsible for acting on it —
/// the queue itself only intercepts and drops the terminal event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PushOutcome {
    Normal,
    Terminal,
}

/// The event queue shared by both runtimes. `capacity` mirrors the
/// reference implementation's unbounded `collections.deque` by default
/// (`None`); set a bound to make `push_*` fail closed rather than grow
/// without limit.
pub struct EventQueue {
    deque: VecDeque<Envelope>,
    capacity: Option<usize>,
    terminal_type: Option<TypeId>,
}

#[derive(Debug, thiserror::Error)]
#[error("event queue is at capacity ({0})")]
pub struct QueueFull(pub usize);

impl EventQueue {
    pub fn new(capacity: Option<usize>) -> Self {
        EventQueue {
            deque: VecDeque::new(),
            capacity,
            terminal_type: None,
        }
    }

    pub fn set_terminal_type(&mut self, type_id: TypeId) {
        self.terminal_type = Some(type_id);
    }

    pub fn len(&self) -> usize {
        self.deque.len()
    }

    pub fn is_empty(&self) -> bool {
        self.deque.is_empty()
    }

    pub fn pop_front(&mut self) -> Option<Envelope> {
        self.deque.pop_front()
    }

    pub fn drain_all(&mut self) -> Vec<Envelope> {
        self.deque.drain(..).collect()
    }

    fn is_terminal(&self, envelope: &Envelope) -> bool {
        match self.terminal_type {
            Some(t) => envelope.type_id() == t || envelope.ancestors().contains(&t),
            None => false,
        }
    }

    fn remaining_capacity(&self, incoming: usize) -> Result<(), QueueFull> {
        match self.capacity {
            Some(cap) if self.deque.len() + incoming > cap => Err(QueueFull(cap)),
            _ => Ok(()),
        }
    }

    /// Depth-first push used by the synchronous runtime: every envelope
    /// in `batch` lands at the *front* of the queue, in its original
    /// order, ahead of whatever was already queued — so the next event
    /// drained is the first one this call produced.
    pub fn push_front_batch(&mut self, batch: Vec<Envelope>) -> Result<PushOutcome, QueueFull> {
        self.remaining_capacity(batch.len())?;
        let mut outcome = PushOutcome::Normal;
        for envelope in batch.into_iter().rev() {
            if self.is_terminal(&envelope) {
                outcome = PushOutcome::Terminal;
                continue;
            }
            self.deque.push_front(envelope);
        }
        Ok(outcome)
    }

    /// Breadth-first push used by the asynchronous runtime: every
    /// envelope in `batch` lands at the *back*, in order, behind
    /// whatever is already queued.
    pub fn push_back_batch(&mut self, batch: Vec<Envelope>) -> Result<PushOutcome, QueueFull> {
        self.remaining_capacity(batch.len())?;
        let mut outcome = PushOutcome::Normal;
        for envelope in batch {
            if self.is_terminal(&envelope) {
                outcome = PushOutcome::Terminal;
                continue;
            }
            self.deque.push_back(envelope);
        }
        Ok(outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::Event;

    #[derive(Debug, Clone)]
    struct A(u8);
    impl Event for A {
        fn type_name() -> &'static str {
            "A"
        }
    }

    #[derive(Debug, Clone)]
    struct Stop;
    impl Event for Stop {
        fn type_name() -> &'static str {
            "Stop"
        }
    }

    #[test]
    fn front_push_preserves_batch_order_ahead_of_existing() {
        let mut q = EventQueue::new(None);
        q.push_front_batch(vec![Envelope::new(A(1))]).unwrap();
        q.push_front_batch(vec![Envelope::new(A(2)), Envelope::new(A(3))]).unwrap();
        // batch [2, 3] lands ahead of the existing [1], in order.
        assert_eq!(q.pop_front().unwrap().downcast::<A>().unwrap().0, 2);
        assert_eq!(q.pop_front().unwrap().downcast::<A>().unwrap().0, 3);
        assert_eq!(q.pop_front().unwrap().downcast::<A>().unwrap().0, 1);
    }

    #[test]
    fn back_push_is_fifo() {
        let mut q = EventQueue::new(None);
        q.push_back_batch(vec![Envelope::new(A(1))]).unwrap();
        q.push_back_batch(vec![Envelope::new(A(2)), Envelope::new(A(3))]).unwrap();
        assert_eq!(q.pop_front().unwrap().downcast::<A>().unwrap().0, 1);
        assert_eq!(q.pop_front().unwrap().downcast::<A>().unwrap().0, 2);
        assert_eq!(q.pop_front().unwrap().downcast::<A>().unwrap().0, 3);
    }

    #[test]
    fn terminal_event_is_dropped_and_reported() {
        let mut q = EventQueue::new(None);
        q.set_terminal_type(TypeId::of::<Stop>());
        let outcome = q.push_front_batch(vec![Envelope::new(A(1)), Envelope::new(Stop)]).unwrap();
        assert_eq!(outcome, PushOutcome::Terminal);
        assert_eq!(q.len(), 1);
    }

    #[test]
    fn bounded_capacity_rejects_overflow() {
        let mut q = EventQueue::new(Some(1));
        q.push_back_batch(vec![Envelope::new(A(1))]).unwrap();
        assert!(q.push_back_batch(vec![Envelope::new(A(2))]).is_err());
    }
}
