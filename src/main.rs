//! `xpropctl` reads and writes raw X11 window properties and atoms from the command line using
//! `libxprop`. Requests go straight to the X server, there is no atom cache involved, which makes
//! it handy for poking at what a toolkit or window manager actually stored on a window.
//!
//! ## Command line examples
//!
//! ### Read a property
//! Print the name of the root window.
//! ```bash
//! xpropctl get root WM_NAME
//! ```
//!
//! ### Write a property
//! Set a CARDINAL/32 property with two values on a window.
//! ```bash
//! xpropctl set 0x2a00001 _MY_PROP CARDINAL 32 1 2
//! ```
//!
//! ### Look up atoms
//! ```bash
//! xpropctl intern _NET_WM_NAME --only-if-exists
//! xpropctl name 39
//! ```
use clap::{crate_description, crate_version, Arg, ArgAction, ArgMatches, Command};
use gory::*;
use libxprop::prelude::*;
use tracing::{debug, Level};
use witcher::prelude::*;

fn cli() -> Command {
    let window = Arg::new("window").required(true).help("Window id in decimal, 0x hex or 'root'");
    Command::new("xpropctl")
        .about(crate_description!())
        .subcommand_required(true)
        .arg_required_else_help(true)
        .version(crate_version!())
        .arg(Arg::new("display").short('d').long("display").global(true).help("X display to connect to"))
        .arg(
            Arg::new("verbose")
                .short('v')
                .long("verbose")
                .global(true)
                .action(ArgAction::Count)
                .help("Increase logging, repeat for more"),
        )
        .subcommand(
            Command::new("get")
                .visible_alias("g")
                .about("Read a window property")
                .arg(window.clone())
                .arg(Arg::new("property").required(true).help("Property name or atom id"))
                .arg(Arg::new("type").short('t').long("type").default_value("any").help("Expected type"))
                .arg(Arg::new("offset").short('o').long("offset").default_value("0").help("Offset in 4 byte units"))
                .arg(Arg::new("length").short('l').long("length").default_value("65536").help("Bytes to read"))
                .arg(
                    Arg::new("delete")
                        .long("delete")
                        .action(ArgAction::SetTrue)
                        .help("Delete the property once read completely"),
                ),
        )
        .subcommand(
            Command::new("set")
                .visible_alias("s")
                .about("Change a window property")
                .arg(window.clone())
                .arg(Arg::new("property").required(true).help("Property name or atom id"))
                .arg(Arg::new("type").required(true).help("Property type name or atom id"))
                .arg(Arg::new("format").required(true).help("Element size: 8, 16 or 32"))
                .arg(
                    Arg::new("mode")
                        .short('m')
                        .long("mode")
                        .default_value("replace")
                        .help("replace, prepend or append"),
                )
                .arg(Arg::new("values").num_args(0..).help("Text for format 8, numbers or atom names otherwise")),
        )
        .subcommand(
            Command::new("intern")
                .visible_alias("i")
                .about("Find or create an atom")
                .arg(Arg::new("name").required(true))
                .arg(
                    Arg::new("only-if-exists")
                        .long("only-if-exists")
                        .action(ArgAction::SetTrue)
                        .help("Don't create the atom if it doesn't exist"),
                ),
        )
        .subcommand(
            Command::new("name")
                .visible_alias("n")
                .about("Get the name of an atom")
                .arg(Arg::new("atom").required(true)),
        )
        .subcommand(Command::new("clear").visible_alias("c").about("Clear a window").arg(window))
}

fn main() {
    let matches = cli().get_matches();
    init_logging(matches.get_count("verbose"));
    if let Err(err) = run(&matches) {
        eprintln!("{:?}", err);
        std::process::exit(1);
    }
}

// Log to stderr so property output stays clean
fn init_logging(verbosity: u8) {
    let level = match verbosity {
        0 => Level::WARN,
        1 => Level::INFO,
        2 => Level::DEBUG,
        _ => Level::TRACE,
    };
    tracing_subscriber::fmt().with_max_level(level).with_writer(std::io::stderr).init();
}

fn run(matches: &ArgMatches) -> Result<()> {
    let disp = matches.get_one::<String>("display").map(|x| x.as_str());
    let props = PropertyAccessor::connect(disp).wrap("failed to connect to the X11 server")?;
    debug!("run: display: {:?}, root: {}", disp, props.root());

    match matches.subcommand() {
        Some(("get", sub)) => get(&props, sub),
        Some(("set", sub)) => set(&props, sub),
        Some(("intern", sub)) => {
            let name = arg(sub, "name");
            let atom = props.intern(name, sub.get_flag("only-if-exists")).wrap("failed to intern atom")?;
            println!("{}", atom);
            Ok(())
        },
        Some(("name", sub)) => {
            let atom = number(arg(sub, "atom"))?;
            println!("{}", props.atom_name(atom).wrap("failed to get atom name")?);
            Ok(())
        },
        Some(("clear", sub)) => {
            let win = window(&props, arg(sub, "window"))?;
            props.clear_window(win).wrap("failed to clear window")
        },
        _ => unreachable!(),
    }
}

fn get(props: &PropertyAccessor, sub: &ArgMatches) -> Result<()> {
    let win = window(props, arg(sub, "window"))?;
    let name = arg(sub, "property");
    let property = atom(props, name, true)?;
    let type_ = match arg(sub, "type") {
        x if x.eq_ignore_ascii_case("any") => ANY_PROPERTY_TYPE,
        x => atom(props, x, true)?,
    };
    let offset = number(arg(sub, "offset"))?;
    let length = number(arg(sub, "length"))?;

    let prop = props
        .get(win, property, type_, offset, length, sub.get_flag("delete"))
        .wrap(&format!("failed to get property {}", name))?;
    let type_name = props.atom_name(prop.type_).wrap("failed to get type name")?;
    println!("{}({}/{}) = {}", name.cyan(), type_name.yellow(), prop.format, render(props, &type_name, &prop)?);
    Ok(())
}

fn set(props: &PropertyAccessor, sub: &ArgMatches) -> Result<()> {
    let win = window(props, arg(sub, "window"))?;
    let property = atom(props, arg(sub, "property"), false)?;
    let type_name = arg(sub, "type");
    let type_ = atom(props, type_name, false)?;
    let format = u8::try_from(number(arg(sub, "format"))?).wrap("invalid format")?;
    let mode = PropMode::try_from(arg(sub, "mode")).wrap("invalid mode")?;
    let values: Vec<&str> = sub.get_many::<String>("values").map(|x| x.map(|x| x.as_str()).collect()).unwrap_or_default();
    let data = encode_values(props, type_name, format, &values)?;
    props.change(win, property, type_, format, mode, &data).wrap("failed to change property")
}

// Encode command line values as property data of the given format
fn encode_values<S: PropertyServer>(
    props: &PropertyAccessor<S>, type_name: &str, format: u8, values: &[&str],
) -> Result<Vec<u8>> {
    Ok(match format {
        8 => values.join(" ").into_bytes(),
        16 => {
            let values = values
                .iter()
                .map(|x| u16::try_from(number(x)?).wrap(&format!("value {} out of range for format 16", x)))
                .collect::<Result<Vec<_>>>()?;
            encode16(&values)
        },
        _ if type_name == "ATOM" || type_name == ATOM_PAIR => {
            let atoms = values.iter().map(|x| atom(props, x, false)).collect::<Result<Vec<_>>>()?;
            encode32(&atoms)
        },
        _ => encode32(&values.iter().map(|x| number(x)).collect::<Result<Vec<_>>>()?),
    })
}

// Decode the data for display according to its type and format
fn render(props: &PropertyAccessor, type_name: &str, prop: &Property) -> Result<String> {
    if type_name == "ATOM" || type_name == ATOM_PAIR {
        let names = prop.atoms().into_iter().map(|x| props.atom_name(x)).collect::<PropertyResult<Vec<_>>>();
        return Ok(names.wrap("failed to get atom names")?.join(", "));
    }
    let text = match prop.format {
        8 => format!("{:?}", prop.to_string_lossy()),
        16 => prop.value16().map(|x| x.map(|x| x.to_string()).collect::<Vec<_>>().join(", ")).unwrap_or_default(),
        _ if type_name == "WINDOW" => {
            prop.value32().map(|x| x.map(|x| format!("0x{:x}", x)).collect::<Vec<_>>().join(", ")).unwrap_or_default()
        },
        _ => prop.value32().map(|x| x.map(|x| x.to_string()).collect::<Vec<_>>().join(", ")).unwrap_or_default(),
    };
    if prop.is_incomplete() {
        return Ok(format!("{} {}", text, format!("... {} more bytes", prop.bytes_after).red()));
    }
    Ok(text)
}

fn arg<'a>(sub: &'a ArgMatches, name: &str) -> &'a str {
    sub.get_one::<String>(name).map(|x| x.as_str()).unwrap_or_default()
}

// Parse decimal or 0x prefixed hex
fn number(val: &str) -> Result<u32> {
    let parsed = match val.strip_prefix("0x") {
        Some(hex) => u32::from_str_radix(hex, 16),
        None => val.parse::<u32>(),
    };
    parsed.wrap(&format!("invalid number {}", val))
}

fn window<S: PropertyServer>(props: &PropertyAccessor<S>, val: &str) -> Result<Window> {
    match val {
        "root" => Ok(props.root()),
        _ => number(val),
    }
}

// Atom ids are taken as is, names are interned
fn atom<S: PropertyServer>(props: &PropertyAccessor<S>, val: &str, only_if_exists: bool) -> Result<Atom> {
    if let Ok(atom) = val.parse::<u32>() {
        return Ok(atom);
    }
    let atom = props.intern(val, only_if_exists).wrap(&format!("failed to intern {}", val))?;
    if atom == NONE {
        return Err(PropertyError::InvalidArgument(format!("atom {} does not exist", val))).wrap("unknown atom");
    }
    Ok(atom)
}

#[cfg(test)]
mod tests {
    use super::*;
    use libxprop::server::RawProperty;
    use std::cell::RefCell;

    // Only answers InternAtom, every other request is unexpected here
    struct Atoms(RefCell<Vec<String>>);

    impl PropertyServer for Atoms {
        fn read_property(&self, _: bool, _: Window, _: Atom, _: Atom, _: u32, _: u32) -> PropertyResult<RawProperty> {
            unimplemented!()
        }

        fn write_property(
            &self, _: x11rb::protocol::xproto::PropMode, _: Window, _: Atom, _: Atom, _: u8, _: u32, _: &[u8],
        ) -> PropertyResult<()> {
            unimplemented!()
        }

        fn lookup_atom(&self, only_if_exists: bool, name: &[u8]) -> PropertyResult<Atom> {
            let name = String::from_utf8_lossy(name).into_owned();
            let mut atoms = self.0.borrow_mut();
            match atoms.iter().position(|x| *x == name) {
                Some(i) => Ok(i as Atom + 1),
                None if only_if_exists => Ok(NONE),
                None => {
                    atoms.push(name);
                    Ok(atoms.len() as Atom)
                },
            }
        }

        fn lookup_atom_name(&self, _: Atom) -> PropertyResult<Vec<u8>> {
            unimplemented!()
        }

        fn clear_window(&self, _: Window) -> PropertyResult<()> {
            unimplemented!()
        }

        fn round_trip(&self) -> PropertyResult<()> {
            Ok(())
        }
    }

    fn accessor() -> PropertyAccessor<Atoms> {
        let atoms = vec!["PRIMARY".to_owned(), "SECONDARY".to_owned(), "ARC".to_owned(), "ATOM".to_owned()];
        PropertyAccessor::new(Atoms(RefCell::new(atoms)), 0, 0x100)
    }

    #[test]
    fn test_cli_builds() {
        cli().debug_assert();
    }

    #[test]
    fn test_number() {
        assert_eq!(number("42").unwrap(), 42);
        assert_eq!(number("0x2a00001").unwrap(), 0x2a0_0001);
        assert!(number("0xzz").is_err());
        assert!(number("-1").is_err());
        assert!(number("").is_err());
    }

    #[test]
    fn test_window() {
        let props = accessor();
        assert_eq!(window(&props, "root").unwrap(), 0x100);
        assert_eq!(window(&props, "0x10").unwrap(), 16);
        assert!(window(&props, "xterm").is_err());
    }

    #[test]
    fn test_atom() {
        let props = accessor();
        assert_eq!(atom(&props, "39", true).unwrap(), 39);
        assert_eq!(atom(&props, "ATOM", true).unwrap(), 4);
        assert!(atom(&props, "_NOT_THERE", true).is_err());
        assert_eq!(atom(&props, "_NOT_THERE", false).unwrap(), 5);
    }

    #[test]
    fn test_encode_values() {
        let props = accessor();
        assert_eq!(encode_values(&props, "STRING", 8, &["hello", "world"]).unwrap(), b"hello world".to_vec());
        assert_eq!(encode_values(&props, "INTEGER", 16, &["1", "0xffff"]).unwrap(), encode16(&[1, 0xffff]));
        assert_eq!(encode_values(&props, "CARDINAL", 32, &["7", "0x10"]).unwrap(), encode32(&[7, 16]));
        assert_eq!(encode_values(&props, "ATOM", 32, &["ARC", "3"]).unwrap(), encode32(&[3, 3]));
    }

    #[test]
    fn test_encode_values_rejects_out_of_range() {
        let props = accessor();
        assert!(encode_values(&props, "INTEGER", 16, &["70000"]).is_err());
        assert!(encode_values(&props, "INTEGER", 16, &["65536"]).is_err());
        assert!(encode_values(&props, "CARDINAL", 32, &["4294967296"]).is_err());
    }
}
