//! [ntfy](https://ntfy.sh) implementation of [`NotificationSink`].
//!
//! [`NotificationSink`]: chatrelay_pipeline::NotificationSink

mod sink;

pub use sink::NtfySink;
