//! Core business logic abstractions

pub mod config;
pub mod currency;
pub mod log;
pub mod notify;
pub mod rate;
pub mod store;
pub mod summary;

// Re-export main types for cleaner imports
pub use currency::{CurrencyRef, Source, WorkItem, Worklist, worklist};
pub use notify::Notifier;
pub use rate::{Quote, RateProvider, RateRecord};
pub use store::{RateRepository, ReferenceRepository};
pub use summary::RunSummary;
