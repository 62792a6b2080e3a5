//! Identifier rules for emitted stubs. Wire names (member names passed as
//! string literals) are never touched; only Rust identifiers are derived here.

const PORTAL_NAMESPACE: &str = "org.freedesktop.portal";

/// Strict and reserved keywords of the 2021 edition
const KEYWORDS: &[&str] = &[
    "abstract", "as", "async", "await", "become", "box", "break", "const", "continue", "do",
    "dyn", "else", "enum", "extern", "false", "final", "fn", "for", "gen", "if", "impl", "in",
    "let", "loop", "macro", "match", "mod", "move", "mut", "override", "priv", "pub", "ref",
    "return", "static", "struct", "trait", "true", "try", "type", "typeof", "unsafe",
    "unsized", "use", "virtual", "where", "while", "yield",
];

/// Keywords that can't be raw identifiers
const UNRAWABLE: &[&str] = &["self", "Self", "super", "crate"];

/// Make `name` usable as an identifier
pub fn escape_identifier(name: &str) -> String {
    if UNRAWABLE.contains(&name) {
        format!("{}_", name)
    } else if KEYWORDS.contains(&name) {
        format!("r#{}", name)
    } else {
        name.to_string()
    }
}

fn lower_first(name: &str) -> String {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) => first.to_lowercase().chain(chars).collect(),
        None => String::new(),
    }
}

fn upper_first(name: &str) -> String {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// `org.freedesktop.portal.Secret` → `SecretPortal`, `org.example.Clock` → `Clock`
pub fn type_name(interface: &str) -> String {
    let (namespace, last) = match interface.rsplit_once('.') {
        Some((namespace, last)) => (namespace, last),
        None => ("", interface),
    };
    let name = if namespace.starts_with(PORTAL_NAMESPACE) {
        format!("{}Portal", last)
    } else {
        last.to_string()
    };
    escape_identifier(&name)
}

/// Lower-case only the first character: `RetrieveSecret` → `retrieveSecret`
pub fn function_name(member: &str) -> String {
    escape_identifier(&lower_first(member))
}

pub fn getter_name(property: &str) -> String {
    format!("get{}", upper_first(property))
}

pub fn setter_name(property: &str) -> String {
    format!("set{}", upper_first(property))
}

/// `session_handle` → `sessionHandle`; unnamed args become `arg<index>`
pub fn parameter_name(name: Option<&str>, index: usize) -> String {
    let raw = match name {
        Some(raw) if !raw.is_empty() => raw,
        _ => return format!("arg{}", index),
    };
    let converted: String = raw
        .split('_')
        .enumerate()
        .map(|(i, part)| {
            if i == 0 {
                part.to_lowercase()
            } else {
                upper_first(part)
            }
        })
        .collect();
    if converted.is_empty() {
        return format!("arg{}", index);
    }
    escape_identifier(&converted)
}

/// Bindings of the write closures emitted in method bodies. A closure body
/// that names a parameter must not see it shadowed by one of these.
const CLOSURE_BINDINGS: &[&str] = &["message", "item", "key", "value"];

/// [`parameter_name`] for a method in-argument: `message` → `message_`
pub fn argument_name(name: Option<&str>, index: usize) -> String {
    let name = parameter_name(name, index);
    if CLOSURE_BINDINGS.contains(&name.as_str()) {
        format!("{}_", name)
    } else {
        name
    }
}

/// `FinishAcquireDevices` → `FinishAcquireDevicesResult`
pub fn result_record_name(method: &str) -> String {
    format!("{}Result", upper_first(method))
}

/// `DeviceEvents` → `DeviceEventsEvent`
pub fn event_record_name(signal: &str) -> String {
    format!("{}Event", upper_first(signal))
}

/// Module holding an interface's records: `UsbPortal` → `usb_portal`
pub fn module_name(type_name: &str) -> String {
    let bare = type_name.trim_start_matches("r#");
    let mut out = String::new();
    let mut previous: Option<char> = None;
    for c in bare.chars() {
        if c.is_uppercase() {
            if matches!(previous, Some(p) if p.is_lowercase() || p.is_ascii_digit()) {
                out.push('_');
            }
            out.extend(c.to_lowercase());
        } else {
            out.push(c);
        }
        previous = Some(c);
    }
    // Modules share the type namespace with the struct itself
    if out == bare {
        out.push_str("_records");
    }
    escape_identifier(&out)
}

/// Whether the name needs `non_camel_case_types` allowed
pub fn is_lower_camel(name: &str) -> bool {
    name.trim_start_matches("r#")
        .chars()
        .next()
        .map_or(false, char::is_lowercase)
}
