//! The event queue (C6): a deque whose push discipline differs by
//! runtime — front-push depth-first for the synchronous runtime,
//! back-push breadth-first for the asynchronous one — plus terminal
//! event interception shared by both.

mod event_queue;

pub use event_queue::{EventQueue, PushOutcome};
