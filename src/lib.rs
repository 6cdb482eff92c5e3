//! ZAKIA — conversation orchestration core for a zakat intake chatbot.
//!
//! Interviews the user through a multi-step dialog, branches over the
//! calculation variants, submits the collected data to the computation
//! service, and conditionally chains into a nested reminder opt-in flow.
//! Intent classification, the zakat arithmetic, reminder persistence, and
//! rendering are external collaborators behind the traits in [`services`]
//! and the event types in [`flow::event`].

pub mod catalog;
pub mod config;
pub mod error;
pub mod flow;
pub mod services;
pub mod session;
pub mod validate;
