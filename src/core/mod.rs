pub mod agent;
pub mod alert;
pub mod breaker;
pub mod brief;
pub mod clock;
pub mod comms;
pub mod config;
pub mod llm;
pub mod pipeline;
pub mod terminal;
pub mod tracking;
