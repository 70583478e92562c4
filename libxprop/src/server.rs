//! `PropertyServer` is the narrow slice of the X11 protocol that the accessor forwards to. It is
//! implemented for every x11rb [`Connection`] so that an existing connection owned by the host
//! application can be handed to [`crate::PropertyAccessor`] as is.
use tracing::trace;
use x11rb::{
    connection::Connection,
    protocol::xproto::{self, Atom, PropMode, Window},
    wrapper,
};

use crate::PropertyResult;

/// Raw reply to a GetProperty request
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawProperty {
    pub type_: Atom,
    pub format: u8,
    pub bytes_after: u32,

    /// Number of elements of `format` bits in `value`
    pub value_len: u32,
    pub value: Vec<u8>,
}

impl From<xproto::GetPropertyReply> for RawProperty {
    fn from(reply: xproto::GetPropertyReply) -> Self {
        RawProperty {
            type_: reply.type_,
            format: reply.format,
            bytes_after: reply.bytes_after,
            value_len: reply.value_len,
            value: reply.value,
        }
    }
}

/// Requests the accessor issues against the X server.
///
/// Protocol errors come back as [`crate::ErrorWrapper::Protocol`] so the caller can route them to
/// the installed error handler.
pub trait PropertyServer {
    /// GetProperty with `long_offset` and `long_length` in 4 byte units
    fn read_property(
        &self, delete: bool, window: Window, property: Atom, type_: Atom, long_offset: u32, long_length: u32,
    ) -> PropertyResult<RawProperty>;

    /// ChangeProperty with `data_len` elements of `format` bits
    fn write_property(
        &self, mode: PropMode, window: Window, property: Atom, type_: Atom, format: u8, data_len: u32, data: &[u8],
    ) -> PropertyResult<()>;

    /// InternAtom
    fn lookup_atom(&self, only_if_exists: bool, name: &[u8]) -> PropertyResult<Atom>;

    /// GetAtomName
    fn lookup_atom_name(&self, atom: Atom) -> PropertyResult<Vec<u8>>;

    /// ClearArea over the whole window without exposures
    fn clear_window(&self, window: Window) -> PropertyResult<()>;

    /// Block until the server has processed every request sent so far
    fn round_trip(&self) -> PropertyResult<()>;
}

impl<C: Connection> PropertyServer for C {
    fn read_property(
        &self, delete: bool, window: Window, property: Atom, type_: Atom, long_offset: u32, long_length: u32,
    ) -> PropertyResult<RawProperty> {
        trace!("read_property: win: {}, prop: {}, type: {}, off: {}, len: {}", window, property, type_, long_offset, long_length);
        let reply =
            xproto::ConnectionExt::get_property(self, delete, window, property, type_, long_offset, long_length)?
                .reply()?;
        Ok(reply.into())
    }

    fn write_property(
        &self, mode: PropMode, window: Window, property: Atom, type_: Atom, format: u8, data_len: u32, data: &[u8],
    ) -> PropertyResult<()> {
        trace!("write_property: win: {}, prop: {}, type: {}, format: {}, len: {}", window, property, type_, format, data_len);
        xproto::ConnectionExt::change_property(self, mode, window, property, type_, format, data_len, data)?
            .check()?;
        Ok(())
    }

    fn lookup_atom(&self, only_if_exists: bool, name: &[u8]) -> PropertyResult<Atom> {
        Ok(xproto::ConnectionExt::intern_atom(self, only_if_exists, name)?.reply()?.atom)
    }

    fn lookup_atom_name(&self, atom: Atom) -> PropertyResult<Vec<u8>> {
        Ok(xproto::ConnectionExt::get_atom_name(self, atom)?.reply()?.name)
    }

    fn clear_window(&self, window: Window) -> PropertyResult<()> {
        xproto::ConnectionExt::clear_area(self, false, window, 0, 0, 0, 0)?.check()?;
        Ok(())
    }

    fn round_trip(&self) -> PropertyResult<()> {
        wrapper::ConnectionExt::sync(self)?;
        Ok(())
    }
}
