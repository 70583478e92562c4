//! In-memory X server used by the unit tests. It follows the protocol rules for GetProperty and
//! ChangeProperty closely enough to exercise offsets, deletion, type mismatches and errors.
use std::{
    cell::{Cell, RefCell},
    collections::{HashMap, HashSet},
};

use x11rb::protocol::xproto::{Atom, PropMode, Window};

use crate::{
    server::{PropertyServer, RawProperty},
    PropertyResult, XError, BAD_ATOM, BAD_MATCH, BAD_VALUE, BAD_WINDOW,
};

pub const ROOT: Window = 0x100;
pub const WIN: Window = 0x2a0_0001;

// Predefined atoms up to WM_NAME, in protocol order
const PREDEFINED: [&str; 39] = [
    "PRIMARY", "SECONDARY", "ARC", "ATOM", "BITMAP", "CARDINAL", "COLORMAP", "CURSOR", "CUT_BUFFER0",
    "CUT_BUFFER1", "CUT_BUFFER2", "CUT_BUFFER3", "CUT_BUFFER4", "CUT_BUFFER5", "CUT_BUFFER6", "CUT_BUFFER7",
    "DRAWABLE", "FONT", "INTEGER", "PIXMAP", "POINT", "RECTANGLE", "RESOURCE_MANAGER", "RGB_COLOR_MAP",
    "RGB_BEST_MAP", "RGB_BLUE_MAP", "RGB_DEFAULT_MAP", "RGB_GRAY_MAP", "RGB_GREEN_MAP", "RGB_RED_MAP", "STRING",
    "VISUALID", "WINDOW", "WM_COMMAND", "WM_HINTS", "WM_CLIENT_MACHINE", "WM_ICON_NAME", "WM_ICON_SIZE",
    "WM_NAME",
];

#[derive(Debug, Clone)]
struct Stored {
    type_: Atom,
    format: u8,
    data: Vec<u8>,
}

#[derive(Default)]
pub struct FakeServer {
    atoms: RefCell<Vec<String>>,
    windows: RefCell<HashSet<Window>>,
    props: RefCell<HashMap<(Window, Atom), Stored>>,
    log: RefCell<Vec<String>>,
    format_override: Cell<Option<u8>>,
    value_len_override: Cell<Option<u32>>,
}

impl FakeServer {
    pub fn new() -> Self {
        let server = FakeServer::default();
        server.atoms.borrow_mut().extend(PREDEFINED.iter().map(|x| x.to_string()));
        server.windows.borrow_mut().extend([ROOT, WIN]);
        server
    }

    /// Requests issued so far, in order
    pub fn log(&self) -> Vec<String> {
        self.log.borrow().clone()
    }

    pub fn requests(&self) -> usize {
        self.log.borrow().len()
    }

    pub fn atom(&self, name: &str) -> Atom {
        let mut atoms = self.atoms.borrow_mut();
        match atoms.iter().position(|x| x == name) {
            Some(i) => i as Atom + 1,
            None => {
                atoms.push(name.to_owned());
                atoms.len() as Atom
            },
        }
    }

    pub fn set(&self, window: Window, property: Atom, type_: Atom, format: u8, data: &[u8]) {
        self.props.borrow_mut().insert((window, property), Stored { type_, format, data: data.to_vec() });
    }

    pub fn stored(&self, window: Window, property: Atom) -> Option<(Atom, u8, Vec<u8>)> {
        self.props.borrow().get(&(window, property)).map(|x| (x.type_, x.format, x.data.clone()))
    }

    /// Report this format in every GetProperty reply
    pub fn override_format(&self, format: u8) {
        self.format_override.set(Some(format));
    }

    /// Report this element count in every GetProperty reply
    pub fn override_value_len(&self, value_len: u32) {
        self.value_len_override.set(Some(value_len));
    }

    fn record(&self, request: &str) {
        self.log.borrow_mut().push(request.to_owned());
    }

    fn check_window(&self, window: Window) -> PropertyResult<()> {
        match self.windows.borrow().contains(&window) {
            true => Ok(()),
            false => Err(XError::new(BAD_WINDOW, window).into()),
        }
    }

    fn check_atom(&self, atom: Atom) -> PropertyResult<()> {
        match atom != 0 && atom as usize <= self.atoms.borrow().len() {
            true => Ok(()),
            false => Err(XError::new(BAD_ATOM, atom).into()),
        }
    }
}

fn width(format: u8) -> Option<usize> {
    match format {
        8 => Some(1),
        16 => Some(2),
        32 => Some(4),
        _ => None,
    }
}

impl PropertyServer for FakeServer {
    fn read_property(
        &self, delete: bool, window: Window, property: Atom, type_: Atom, long_offset: u32, long_length: u32,
    ) -> PropertyResult<RawProperty> {
        self.record("GetProperty");
        self.check_window(window)?;
        self.check_atom(property)?;

        let stored = match self.props.borrow().get(&(window, property)) {
            Some(stored) => stored.clone(),
            None => return Ok(RawProperty::default()),
        };
        let format = self.format_override.get().unwrap_or(stored.format);
        if type_ != 0 && type_ != stored.type_ {
            return Ok(RawProperty {
                type_: stored.type_,
                format,
                bytes_after: stored.data.len() as u32,
                value_len: 0,
                value: vec![],
            });
        }

        let total = stored.data.len() as u64;
        let start = 4 * long_offset as u64;
        if start > total {
            return Err(XError::new(BAD_VALUE, long_offset).into());
        }
        let len = (total - start).min(4 * long_length as u64);
        let after = total - start - len;
        let value = stored.data[start as usize..(start + len) as usize].to_vec();
        let value_len = self.value_len_override.get().unwrap_or((len as usize / width(stored.format).unwrap_or(1)) as u32);
        if delete && after == 0 {
            self.props.borrow_mut().remove(&(window, property));
        }
        Ok(RawProperty { type_: stored.type_, format, bytes_after: after as u32, value_len, value })
    }

    fn write_property(
        &self, mode: PropMode, window: Window, property: Atom, type_: Atom, format: u8, data_len: u32, data: &[u8],
    ) -> PropertyResult<()> {
        self.record("ChangeProperty");
        self.check_window(window)?;
        self.check_atom(property)?;
        self.check_atom(type_)?;
        let width = width(format).ok_or(XError::new(BAD_VALUE, format as u32))?;
        let data = &data[..data_len as usize * width];

        let key = (window, property);
        let mut props = self.props.borrow_mut();
        if mode == PropMode::REPLACE || !props.contains_key(&key) {
            props.insert(key, Stored { type_, format, data: data.to_vec() });
            return Ok(());
        }
        if let Some(stored) = props.get_mut(&key) {
            if stored.type_ != type_ || stored.format != format {
                return Err(XError::new(BAD_MATCH, property).into());
            }
            if mode == PropMode::PREPEND {
                stored.data.splice(0..0, data.iter().copied());
            } else {
                stored.data.extend_from_slice(data);
            }
        }
        Ok(())
    }

    fn lookup_atom(&self, only_if_exists: bool, name: &[u8]) -> PropertyResult<Atom> {
        self.record("InternAtom");
        let name = String::from_utf8_lossy(name);
        let exists = self.atoms.borrow().iter().any(|x| x.as_str() == name.as_ref());
        match exists || !only_if_exists {
            true => Ok(self.atom(&name)),
            false => Ok(x11rb::NONE),
        }
    }

    fn lookup_atom_name(&self, atom: Atom) -> PropertyResult<Vec<u8>> {
        self.record("GetAtomName");
        self.check_atom(atom)?;
        Ok(self.atoms.borrow()[atom as usize - 1].as_bytes().to_vec())
    }

    fn clear_window(&self, window: Window) -> PropertyResult<()> {
        self.record("ClearArea");
        self.check_window(window)
    }

    fn round_trip(&self) -> PropertyResult<()> {
        self.record("Sync");
        Ok(())
    }
}
