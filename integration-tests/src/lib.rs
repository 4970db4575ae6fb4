//! Black-box harness: a real slipway server on a free port, a scripted
//! HTTP/1.1 destination and captured tracing events.

pub mod harness;
