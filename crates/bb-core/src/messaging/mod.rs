//! Outbound messaging: the transport port, a flood-control decorator and the
//! best-effort outbox the orchestrator talks to.

pub mod outbox;
pub mod port;
pub mod throttled;
