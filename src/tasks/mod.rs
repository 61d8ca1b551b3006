//! Background Tasks Module
//!
//! Optional tasks that run periodically beside a cache.
//!
//! # Tasks
//! - Expiry sweeper: purges expired records from a store at configured
//!   intervals

mod sweeper;

pub use sweeper::spawn_sweeper_task;
