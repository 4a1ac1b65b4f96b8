#![forbid(unsafe_code)]

pub mod error;
pub mod model;
pub mod parser;
pub mod scheduler;
pub mod time;

pub use error::Error;
pub use parser::{ParseError, parse};
pub use scheduler::{Draw, OutcomeReport, QuestionHandle, ReviewScheduler, SchedulerError};
pub use time::Clock;
