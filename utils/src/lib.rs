pub mod timer;
pub use timer::{Clock, MonotonicClock, Timer};
