use crate::config::Config;
use anyhow::{anyhow, Context, Result};
use busgen_compiler::compile_xml;
use clap::Args;
use colored::Colorize;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;
use walkdir::WalkDir;

#[derive(Debug, Args)]
pub struct CompileArgs {
    /// File or directory to compile (defaults to the configured srcDir)
    pub path: Option<String>,

    /// Output to stdout instead of files
    #[arg(long)]
    pub stdout: bool,

    /// Output directory (overrides config)
    #[arg(short, long)]
    pub out_dir: Option<String>,

    /// Runtime crate path used in generated imports (overrides config)
    #[arg(long)]
    pub runtime_crate: Option<String>,

    /// Leave out the generated-file banner
    #[arg(long)]
    pub no_header: bool,
}

pub fn compile(args: CompileArgs, cwd: &str) -> Result<()> {
    let mut config = Config::load(cwd)?;
    if let Some(out_dir) = &args.out_dir {
        config.out_dir = out_dir.clone();
    }
    if let Some(runtime_crate) = &args.runtime_crate {
        config.runtime_crate = runtime_crate.clone();
    }
    if args.no_header {
        config.header = false;
    }

    let src_dir = match &args.path {
        Some(path) => PathBuf::from(cwd).join(path),
        None => config.get_src_dir(cwd),
    };
    if !src_dir.exists() {
        return Err(anyhow!("Source path does not exist: {}", src_dir.display()));
    }

    let xml_files = find_xml_files(&src_dir);
    if xml_files.is_empty() {
        eprintln!("{}", "No .xml files found".yellow());
        return Ok(());
    }

    // With --stdout the generated code is the only thing on stdout
    if !args.stdout {
        println!("{}", "Compiling introspection documents...".bright_blue().bold());
        println!("Found {} files", xml_files.len());
    }

    let root = if src_dir.is_file() {
        src_dir.parent().map(Path::to_path_buf).unwrap_or_default()
    } else {
        src_dir.clone()
    };

    let mut success_count = 0;
    let mut error_count = 0;

    for xml_file in &xml_files {
        let relative_path = xml_file.strip_prefix(&root).unwrap_or(xml_file);
        match compile_file(xml_file, relative_path, &args, &config, cwd) {
            Ok(output_path) => {
                success_count += 1;
                if !args.stdout {
                    println!(
                        "  {} {} → {}",
                        "✓".green(),
                        relative_path.display(),
                        output_path
                    );
                }
            }
            Err(e) => {
                error_count += 1;
                eprintln!(
                    "  {} {} - {}",
                    "✗".red(),
                    relative_path.display(),
                    format!("{:#}", e).red()
                );
            }
        }
    }

    if error_count > 0 {
        return Err(anyhow!(
            "Compiled {} files, {} failed",
            success_count,
            error_count
        ));
    }

    if !args.stdout {
        println!();
        println!("{} Compiled {} files successfully", "✓".green(), success_count);
    }
    Ok(())
}

/// `.xml` files under `path` (or `path` itself), in a stable order
pub fn find_xml_files(path: &Path) -> Vec<PathBuf> {
    let files: Vec<PathBuf> = WalkDir::new(path)
        .follow_links(true)
        .sort_by_file_name()
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|entry| entry.file_type().is_file())
        .map(|entry| entry.into_path())
        .filter(|path| path.extension().and_then(|s| s.to_str()) == Some("xml"))
        .collect();
    files
}

fn compile_file(
    file_path: &Path,
    relative_path: &Path,
    args: &CompileArgs,
    config: &Config,
    cwd: &str,
) -> Result<String> {
    let source = fs::read_to_string(file_path)
        .with_context(|| format!("Failed to read {}", file_path.display()))?;

    let source_name = relative_path.display().to_string();
    debug!(file = %source_name, "Compiling document");
    let output = compile_xml(&source, config.compile_options(&source_name))?;

    if args.stdout {
        print!("{}", output);
        return Ok("stdout".to_string());
    }

    let output_file = config
        .get_out_dir(cwd)
        .join(relative_path)
        .with_extension("rs");
    if let Some(parent) = output_file.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(&output_file, output)
        .with_context(|| format!("Failed to write {}", output_file.display()))?;

    Ok(output_file.display().to_string())
}
