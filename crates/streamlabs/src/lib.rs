//! Streamlabs source adapters.
//!
//! - [`ChatboxPoller`]: polls the chatbox widget's JSON feed.
//! - [`SocketListener`]: subscribes to the Socket.IO event API (chat,
//!   donations, subs, raids).
//!
//! Both implement [`chatrelay_channels::SourceAdapter`] and retry transient
//! failures themselves.

mod chatbox;
mod packet;
mod socket;

pub use {
    chatbox::{ChatboxPoller, SeenIds},
    packet::{Packet, map_event_type, to_raw_events},
    socket::SocketListener,
};
