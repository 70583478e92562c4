//! `PropertyAccessor` forwards window property and atom requests straight to the X server without
//! any toolkit atom cache in between. Every call is a single protocol request, or a short fixed
//! sequence of them, with the argument massaging the raw protocol needs:
//!
//! * property lengths are given in bytes and rounded up to the 4 byte units X11 works in
//! * retrieved data is sized by the reported format, 1, 2 or 4 bytes per element
//! * atom arrays are always returned as 4 byte atom ids
//!
//! Protocol errors that don't have a natural return value are handed to the error handler, see
//! [`PropertyAccessor::set_error_handler`].
use tracing::{debug, trace, warn};

use x11rb::{
    connection::Connection,
    protocol::xproto::{Atom, AtomEnum, Window},
    rust_connection::RustConnection,
};

use crate::{
    model::*,
    server::PropertyServer,
    trap::{ErrorHandler, HandlerSlot},
    ErrorWrapper, PropertyError, PropertyResult,
};

/// Convert a length in bytes to the 4 byte units GetProperty expects, rounding up.
///
/// The rounding saturates so a caller passing `u32::MAX` to mean "everything" gets the largest
/// request possible rather than a wrapped one. A zero length is rejected.
pub fn long_length(length: u32) -> PropertyResult<u32> {
    let units = length.saturating_add(3) / 4;
    if units == 0 {
        warn!("get: invalid length {}", length);
        return Err(PropertyError::InvalidLength(length as usize).into());
    }
    Ok(units)
}

/// Property accessor over a single X server connection
pub struct PropertyAccessor<S = RustConnection> {
    server: S,              // x11 connection
    handlers: HandlerSlot,  // error handler
    screen: usize,          // screen number
    root: Window,           // root window id
}

impl PropertyAccessor<RustConnection> {
    /// Connect to the X11 server named by `display` or `$DISPLAY` when `None`
    pub fn connect(display: Option<&str>) -> PropertyResult<Self> {
        let (conn, screen) = x11rb::connect(display)?;
        let root = conn
            .setup()
            .roots
            .get(screen)
            .map(|x| x.root)
            .ok_or_else(|| PropertyError::InvalidArgument(format!("screen {} not found", screen)))?;
        debug!("connect: screen: {}, root: {}", screen, root);
        Ok(PropertyAccessor::new(conn, screen, root))
    }
}

impl<S: PropertyServer> PropertyAccessor<S> {
    /// Create an accessor over an already established connection
    pub fn new(server: S, screen: usize, root: Window) -> Self {
        Self { server, handlers: HandlerSlot::default(), screen, root }
    }

    /// Get the underlying connection
    pub fn server(&self) -> &S {
        &self.server
    }

    /// Get the default screen number
    pub fn screen(&self) -> usize {
        self.screen
    }

    /// Get the root window
    pub fn root(&self) -> Window {
        self.root
    }

    /// Replace the error handler, returning the previous one.
    ///
    /// The handler receives protocol errors raised by `change` and `clear_window`, and the error
    /// that made `get` report a missing property. By default errors are logged.
    pub fn set_error_handler(&self, handler: ErrorHandler) -> ErrorHandler {
        self.handlers.install(handler)
    }

    // Send protocol errors to the error handler and let everything else through
    fn route(&self, res: PropertyResult<()>) -> PropertyResult<()> {
        match res {
            Err(ErrorWrapper::Protocol(err)) => {
                self.handlers.dispatch(&err);
                Ok(())
            },
            other => other,
        }
    }

    // Atom name for diagnostics only, falls back on the id
    fn describe_atom(&self, atom: Atom) -> String {
        if atom == x11rb::NONE {
            return "None".to_owned();
        }
        match self.server.lookup_atom_name(atom) {
            Ok(name) => String::from_utf8_lossy(&name).into_owned(),
            Err(_) => format!("#{}", atom),
        }
    }

    /// Calls ClearArea over the whole of `window` to force a refresh
    pub fn clear_window(&self, window: Window) -> PropertyResult<()> {
        debug!("clear_window: id: {}", window);
        let res = self.server.clear_window(window);
        self.route(res)
    }

    /// Retrieve a portion of the contents of a property
    ///
    /// ### Arguments
    /// * `window` - id of the window holding the property
    /// * `property` - the property to retrieve
    /// * `type_` - the expected type, or `ANY_PROPERTY_TYPE` to accept any type
    /// * `offset` - offset into the property in 4 byte units
    /// * `length` - bytes to retrieve, rounded up to the next multiple of 4
    /// * `delete` - delete the property once it has been read completely
    ///
    /// A missing property fails with `PropertyNotFound`. A type other than the expected one fails
    /// with `TypeMismatch` which carries the actual type and format.
    ///
    /// Data beyond `length` is never fetched. When the server reports leftover bytes a warning is
    /// logged and `Property::bytes_after` is non-zero; the returned data is then truncated.
    ///
    /// ### Examples
    /// ```ignore
    /// use libxprop::prelude::*;
    /// let props = PropertyAccessor::connect(None).unwrap();
    /// let name = props.get(props.root(), AtomEnum::WM_NAME.into(), ANY_PROPERTY_TYPE, 0, 1024, false).unwrap();
    /// ```
    pub fn get(
        &self, window: Window, property: Atom, type_: Atom, offset: u32, length: u32, delete: bool,
    ) -> PropertyResult<Property> {
        let long_length = long_length(length)?;
        let reply = match self.server.read_property(delete, window, property, type_, offset, long_length) {
            Ok(reply) => reply,
            Err(ErrorWrapper::Protocol(err)) => {
                self.handlers.dispatch(&err);
                return Err(PropertyError::PropertyNotFound(property).into());
            },
            Err(err) => return Err(err),
        };

        if reply.type_ == x11rb::NONE && reply.format == 0 {
            debug!("get: id: {}, prop: {} not found", window, property);
            return Err(PropertyError::PropertyNotFound(property).into());
        }

        if type_ != ANY_PROPERTY_TYPE && reply.type_ != type_ {
            warn!("couldn't match property type {} to {}", self.describe_atom(reply.type_), self.describe_atom(type_));
            return Err(PropertyError::TypeMismatch { expected: type_, actual: reply.type_, format: reply.format }.into());
        }

        // Known limitation: the remainder is never fetched
        if reply.bytes_after != 0 {
            warn!("ignoring non-zero bytes_after {}, the results will be wrong", reply.bytes_after);
        }

        let atom_pair = match reply.type_ == Atom::from(AtomEnum::ATOM) {
            true => x11rb::NONE,
            false => self.server.lookup_atom(true, ATOM_PAIR.as_bytes())?,
        };

        let mut data = reply.value;
        let width = if reply.type_ == Atom::from(AtomEnum::ATOM) || (atom_pair != x11rb::NONE && reply.type_ == atom_pair)
        {
            4
        } else {
            match PropFormat::from(reply.format) {
                Ok(format) => format.width(),
                Err(err) => {
                    warn!("unknown property return format: {}", reply.format);
                    return Err(err);
                },
            }
        };
        let items = (reply.value_len as usize).min(data.len() / width);
        data.truncate(items * width);

        debug!("get: id: {}, prop: {}, type: {}, format: {}, len: {}", window, property, reply.type_, reply.format, data.len());
        Ok(Property { type_: reply.type_, format: reply.format, bytes_after: reply.bytes_after, data })
    }

    /// Change the contents of a property
    ///
    /// ### Arguments
    /// * `window` - id of the window holding the property
    /// * `property` - the property to change
    /// * `type_` - the new type, must match the existing type when prepending or appending
    /// * `format` - 8, 16 or 32, must match the existing format when prepending or appending
    /// * `mode` - how the new data is combined with the existing data
    /// * `data` - elements of `format` bits in native byte order
    ///
    /// Protocol errors, e.g. a mismatched type when appending, go to the error handler.
    ///
    /// ### Examples
    /// ```ignore
    /// use libxprop::prelude::*;
    /// let props = PropertyAccessor::connect(None).unwrap();
    /// let atom = props.intern("_MY_PROP", false).unwrap();
    /// props.change(props.root(), atom, AtomEnum::CARDINAL.into(), 32, PropMode::Replace, &encode32(&[1, 2])).unwrap();
    /// ```
    pub fn change(
        &self, window: Window, property: Atom, type_: Atom, format: u8, mode: PropMode, data: &[u8],
    ) -> PropertyResult<()> {
        let width = PropFormat::from(format)?.width();
        if data.len() % width != 0 {
            return Err(PropertyError::InvalidLength(data.len()).into());
        }
        let count = u32::try_from(data.len() / width).map_err(|_| PropertyError::InvalidLength(data.len()))?;

        debug!("change: id: {}, prop: {}, type: {}, format: {}, mode: {}, count: {}", window, property, type_, format, mode, count);
        let res = self.server.write_property(mode.into(), window, property, type_, format, count, data);
        self.route(res)
    }

    /// Find or create the atom for `name`. With `only_if_exists` set a missing atom is returned as
    /// `x11rb::NONE` instead of being created.
    pub fn intern(&self, name: &str, only_if_exists: bool) -> PropertyResult<Atom> {
        if name.is_empty() {
            return Err(PropertyError::InvalidArgument("atom name is empty".to_owned()).into());
        }
        let atom = self.server.lookup_atom(only_if_exists, name.as_bytes())?;
        trace!("intern: {} => {}", name, atom);
        Ok(atom)
    }

    /// Get the name of `atom`.
    ///
    /// An invalid atom doesn't fail the call: the error is trapped, logged as a warning, and an
    /// empty name returned. The server is synced before and after so the trapped error can only
    /// come from this request.
    pub fn atom_name(&self, atom: Atom) -> PropertyResult<String> {
        self.server.round_trip()?;
        let trap = self.handlers.trap();
        let name = match self.server.lookup_atom_name(atom) {
            Ok(name) => name,
            Err(ErrorWrapper::Protocol(err)) => {
                self.handlers.dispatch(&err);
                vec![]
            },
            Err(err) => return Err(err),
        };
        self.server.round_trip()?;
        let code = trap.error_code();
        drop(trap);

        if code != 0 {
            warn!("error: bad atom {}: code={}", atom, code);
        }
        Ok(String::from_utf8_lossy(&name).into_owned())
    }

    /// Get a whole 8 bit string property of the given type
    pub fn get_string(&self, window: Window, property: Atom, type_: Atom) -> PropertyResult<String> {
        let prop = self.get(window, property, type_, 0, u32::MAX, false)?;
        match prop.format {
            8 => Ok(prop.as_str()?.to_owned()),
            format => Err(PropertyError::UnknownFormat(format).into()),
        }
    }

    /// Get a whole CARDINAL/32 property
    pub fn get_cardinals(&self, window: Window, property: Atom) -> PropertyResult<Vec<u32>> {
        let prop = self.get(window, property, AtomEnum::CARDINAL.into(), 0, u32::MAX, false)?;
        let values = prop.value32().ok_or(PropertyError::UnknownFormat(prop.format))?;
        Ok(values.collect())
    }

    /// Get a whole ATOM[] property
    pub fn get_atoms(&self, window: Window, property: Atom) -> PropertyResult<Vec<Atom>> {
        Ok(self.get(window, property, AtomEnum::ATOM.into(), 0, u32::MAX, false)?.atoms())
    }

    /// Set an 8 bit string property of the given type
    pub fn change_string(
        &self, window: Window, property: Atom, type_: Atom, mode: PropMode, value: &str,
    ) -> PropertyResult<()> {
        self.change(window, property, type_, 8, mode, value.as_bytes())
    }

    /// Set a CARDINAL/32 property
    pub fn change_cardinals(&self, window: Window, property: Atom, mode: PropMode, values: &[u32]) -> PropertyResult<()> {
        self.change(window, property, AtomEnum::CARDINAL.into(), 32, mode, &encode32(values))
    }

    /// Set an ATOM[] property
    pub fn change_atoms(&self, window: Window, property: Atom, mode: PropMode, atoms: &[Atom]) -> PropertyResult<()> {
        self.change(window, property, AtomEnum::ATOM.into(), 32, mode, &encode32(atoms))
    }
}
