use libxprop::prelude::*;

fn main() {
    let props = PropertyAccessor::connect(None).unwrap();
    let root = props.root();
    println!("X11 Properties");
    println!("-----------------------------------------------------------------------");
    println!("Screen:            {}", props.screen());
    println!("Root Window:       {}", root);

    let name = props.get_string(root, AtomEnum::WM_NAME.into(), ANY_PROPERTY_TYPE).unwrap_or("".to_owned());
    println!("Root Name:         {}", name);

    let supported = props.intern("_NET_SUPPORTED", true).unwrap();
    let atoms = props.get_atoms(root, supported).unwrap_or(vec![]);
    println!("Supported Hints:   {}", atoms.len());
    println!();
    println!("{:<10} {}", "ATOM", "NAME");
    println!("{:-<72}", "");
    for atom in atoms {
        println!("{:<10} {}", atom, props.atom_name(atom).unwrap_or("".to_owned()));
    }
}
