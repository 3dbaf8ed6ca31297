//! Typed operations executed against the envelope transport

pub mod eventing;
