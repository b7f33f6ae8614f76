//! Device handling for running sessions.
//!
//! A [`Device`] stands for one connected client: a shared display, a
//! phone in someone's hand, a host tablet. It pairs the client's class
//! and role with an opaque [`Transport`] and takes care of resolving,
//! rendering and delivering the view the current state owes that client.
//!
//! # Example
//!
//! ```ignore
//! use device::{Device, DeviceSpec, LoopbackPair};
//!
//! let LoopbackPair { transport, remote } = LoopbackPair::new();
//! let mut phone = Device::connect(
//!     DeviceSpec {
//!         kind: Some("mobile".into()),
//!         role: Some("host".into()),
//!         ..Default::default()
//!     },
//!     Box::new(transport),
//! );
//!
//! phone.send_view(&game);
//! for frame in remote.drain() {
//!     println!("{frame}");
//! }
//! ```

pub mod device;
pub mod transport;

// Re-export main types
pub use device::{Device, DeviceSpec};
pub use transport::{
    Envelope, EnvelopeError, LoopbackPair, LoopbackRemote, LoopbackTransport, Transport,
};
