mod ordered_queue;
pub use ordered_queue::*;
