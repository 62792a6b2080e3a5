use crate::config::{Config, DEFAULT_CONFIG_NAME};
use anyhow::Result;
use clap::Args;
use colored::Colorize;
use std::fs;
use std::path::PathBuf;

const EXAMPLE_DOCUMENT: &str = r#"<!DOCTYPE node PUBLIC "-//freedesktop//DTD D-BUS Object Introspection 1.0//EN"
 "http://www.freedesktop.org/standards/dbus/1.0/introspect.dtd">
<node>
  <interface name="org.example.Clock">
    <method name="Now">
      <arg type="t" name="seconds" direction="out"/>
    </method>
    <method name="SetAlarm">
      <arg type="t" name="at" direction="in"/>
      <arg type="a{sv}" name="options" direction="in"/>
      <arg type="o" name="handle" direction="out"/>
    </method>
    <signal name="Ticked">
      <arg type="t" name="seconds"/>
    </signal>
    <property name="Timezone" type="s" access="readwrite"/>
  </interface>
</node>
"#;

#[derive(Debug, Args)]
pub struct InitArgs {
    /// Directory for introspection documents
    #[arg(short, long, default_value = "interfaces")]
    pub src_dir: String,

    /// Directory for generated stubs
    #[arg(short, long, default_value = "src/generated")]
    pub out_dir: String,

    /// Force overwrite existing config
    #[arg(short, long)]
    pub force: bool,
}

pub fn init(args: InitArgs, cwd: &str) -> Result<()> {
    let config_path = PathBuf::from(cwd).join(DEFAULT_CONFIG_NAME);

    if config_path.exists() && !args.force {
        println!(
            "{} {} already exists",
            "⚠️".yellow(),
            DEFAULT_CONFIG_NAME.bright_white()
        );
        println!("Use --force to overwrite");
        return Ok(());
    }

    println!("{}", "Initializing busgen project...".bright_blue().bold());

    let src_dir = PathBuf::from(cwd).join(&args.src_dir);
    if !src_dir.exists() {
        fs::create_dir_all(&src_dir)?;
        println!("  {} Created {}/", "✓".green(), args.src_dir);
    }

    let example_file = src_dir.join("example.xml");
    if !example_file.exists() {
        fs::write(&example_file, EXAMPLE_DOCUMENT)?;
        println!("  {} Created example.xml", "✓".green());
    }

    let config = Config {
        src_dir: args.src_dir.clone(),
        out_dir: args.out_dir.clone(),
        ..Config::default()
    };
    let config_json = serde_json::to_string_pretty(&config)?;
    fs::write(&config_path, config_json)?;

    println!("  {} Created {}", "✓".green(), DEFAULT_CONFIG_NAME);
    println!();
    println!("{}", "Project initialized".green().bold());
    println!();
    println!("Next steps:");
    println!("  1. Drop introspection XML into {}/", args.src_dir);
    println!("  2. Run: busgen compile");
    println!("  3. Check output in {}/", args.out_dir);

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::{compile, CompileArgs};

    fn args(force: bool) -> InitArgs {
        InitArgs {
            src_dir: "interfaces".to_string(),
            out_dir: "src/generated".to_string(),
            force,
        }
    }

    #[test]
    fn test_init_creates_project() {
        let dir = tempfile::tempdir().unwrap();
        let cwd = dir.path().to_str().unwrap();
        init(args(false), cwd).unwrap();

        assert!(dir.path().join("interfaces/example.xml").exists());
        assert_eq!(Config::load(cwd).unwrap(), Config::default());

        // The example document compiles as-is
        let compile_args = CompileArgs {
            path: None,
            stdout: false,
            out_dir: None,
            runtime_crate: None,
            no_header: false,
        };
        compile(compile_args, cwd).unwrap();
        let stub = fs::read_to_string(dir.path().join("src/generated/example.rs")).unwrap();
        assert!(stub.contains("pub async fn setAlarm(&self, at: u64, options: IndexMap<String, Value>) -> RuntimeResult<String> {"));
    }

    #[test]
    fn test_init_keeps_existing_config() {
        let dir = tempfile::tempdir().unwrap();
        let cwd = dir.path().to_str().unwrap();
        fs::write(dir.path().join(DEFAULT_CONFIG_NAME), r#"{ "outDir": "gen" }"#).unwrap();

        init(args(false), cwd).unwrap();
        assert_eq!(Config::load(cwd).unwrap().out_dir, "gen");

        init(args(true), cwd).unwrap();
        assert_eq!(Config::load(cwd).unwrap().out_dir, "src/generated");
    }
}
