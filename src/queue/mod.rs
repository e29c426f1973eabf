pub mod broker;

pub use broker::{JobBroker, JobEnvelope};
