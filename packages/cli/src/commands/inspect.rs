use anyhow::{Context, Result};
use busgen_compiler::{map_type, naming};
use busgen_introspect::{parse, IntrospectionNode};
use busgen_signature::Signature;
use clap::Args;
use colored::Colorize;
use std::fs;
use std::path::PathBuf;

#[derive(Debug, Args)]
pub struct InspectArgs {
    /// Introspection document to read
    pub file: String,

    /// Print a per-member summary with mapped Rust types instead of JSON
    #[arg(long)]
    pub summary: bool,
}

pub fn inspect(args: InspectArgs, cwd: &str) -> Result<()> {
    let path = PathBuf::from(cwd).join(&args.file);
    let source = fs::read_to_string(&path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    let document = parse(&source)?;

    if args.summary {
        print!("{}", summarize(&document));
    } else {
        println!("{}", serde_json::to_string_pretty(&document)?);
    }
    Ok(())
}

fn mapped(signature: &Signature) -> String {
    match map_type(signature) {
        Ok(ty) => ty.render(),
        Err(e) => format!("<{}>", e),
    }
}

/// One line per member: wire signature and the Rust type stubs use for it
fn summarize(document: &IntrospectionNode) -> String {
    let mut out = String::new();
    for interface in document.all_interfaces() {
        out.push_str(&format!(
            "{} ({})\n",
            interface.name.bold(),
            naming::type_name(&interface.name)
        ));
        for method in &interface.methods {
            let inputs: Vec<String> = method.in_args.iter().map(|arg| mapped(&arg.type_)).collect();
            let outputs: Vec<String> = method.out_args.iter().map(|arg| mapped(&arg.type_)).collect();
            out.push_str(&format!(
                "  method {}({}) -> ({})\n",
                method.name,
                inputs.join(", "),
                outputs.join(", ")
            ));
        }
        for signal in &interface.signals {
            let args: Vec<String> = signal.args.iter().map(|arg| mapped(&arg.type_)).collect();
            out.push_str(&format!("  signal {}({})\n", signal.name, args.join(", ")));
        }
        for property in &interface.properties {
            out.push_str(&format!(
                "  property {}: {} [{:?}]\n",
                property.name,
                mapped(&property.type_),
                property.access
            ));
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_summary() {
        colored::control::set_override(false);
        let document = parse(
            r#"<node><interface name="org.freedesktop.portal.Secret">
                <method name="RetrieveSecret">
                  <arg type="h" name="fd" direction="in"/>
                  <arg type="a{sv}" name="options" direction="in"/>
                  <arg type="o" name="handle" direction="out"/>
                </method>
                <property name="version" type="u" access="read"/>
            </interface></node>"#,
        )
        .unwrap();

        assert_eq!(
            summarize(&document),
            "org.freedesktop.portal.Secret (SecretPortal)\n  \
             method RetrieveSecret(i32, IndexMap<String, Value>) -> (String)\n  \
             property version: u32 [Read]\n"
        );
    }

    #[test]
    fn test_inspect_reads_relative_path() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("empty.xml"), "<node/>").unwrap();
        let args = InspectArgs {
            file: "empty.xml".to_string(),
            summary: false,
        };
        inspect(args, dir.path().to_str().unwrap()).unwrap();
    }
}
