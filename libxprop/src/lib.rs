//! `libxprop` exposes the raw X11 window property and atom requests, GetProperty, ChangeProperty,
//! InternAtom, GetAtomName and ClearArea, to callers that want them without a toolkit's atom cache
//! sitting in between.
//!
//! [Properties and Atoms](https://tronche.com/gui/x/xlib/window-information/properties-and-atoms.html)
//! A property is a named, typed array of 8, 16 or 32 bit elements attached to a window. Names and
//! types are atoms, server interned ids standing in for strings. `libxprop` forwards each request
//! more or less as is, taking care of the byte/4 byte unit conversions and of sizing the returned
//! data by its format.
//!
//! `xpropctl` uses `libxprop` to read and write properties from the command line; however
//! `libxprop` can be handed any existing x11rb connection.
mod accessor;
mod error;
mod model;
pub mod server;
#[cfg(test)]
mod testing;
pub mod trap;
pub use accessor::{long_length, PropertyAccessor};
pub use error::*;
pub use model::*;
pub use x11rb::{
    protocol::xproto::{Atom, AtomEnum, Window},
    NONE,
};

/// All essential symbols in a simple consumable form
///
/// ### Examples
/// ```
/// use libxprop::prelude::*;
/// ```
pub mod prelude {
    pub use crate::server::PropertyServer;
    pub use crate::trap::ErrorHandler;
    pub use crate::*;
}
