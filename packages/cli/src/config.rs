use busgen_compiler::CompileOptions;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

pub const DEFAULT_CONFIG_NAME: &str = "busgen.config.json";

/// busgen configuration file format
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    /// Directory searched for introspection `.xml` files
    #[serde(default = "default_src_dir")]
    pub src_dir: String,

    /// Directory generated `.rs` files are written to
    #[serde(default = "default_out_dir")]
    pub out_dir: String,

    /// Crate path the stubs import the runtime from
    #[serde(default = "default_runtime_crate")]
    pub runtime_crate: String,

    /// Emit the generated-file banner
    #[serde(default = "default_header")]
    pub header: bool,
}

fn default_src_dir() -> String {
    "interfaces".to_string()
}

fn default_out_dir() -> String {
    "src/generated".to_string()
}

fn default_runtime_crate() -> String {
    CompileOptions::default().runtime_crate
}

fn default_header() -> bool {
    true
}

impl Config {
    /// Load config from a directory
    pub fn load(cwd: &str) -> anyhow::Result<Self> {
        let config_path = PathBuf::from(cwd).join(DEFAULT_CONFIG_NAME);

        if config_path.exists() {
            let content = std::fs::read_to_string(&config_path)?;
            let config: Config = serde_json::from_str(&content)?;
            Ok(config)
        } else {
            Ok(Config::default())
        }
    }

    pub fn get_src_dir(&self, cwd: &str) -> PathBuf {
        PathBuf::from(cwd).join(&self.src_dir)
    }

    pub fn get_out_dir(&self, cwd: &str) -> PathBuf {
        PathBuf::from(cwd).join(&self.out_dir)
    }

    /// Compiler options for one document
    pub fn compile_options(&self, source_name: &str) -> CompileOptions {
        CompileOptions {
            runtime_crate: self.runtime_crate.clone(),
            emit_header: self.header,
            source_name: Some(source_name.to_string()),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            src_dir: default_src_dir(),
            out_dir: default_out_dir(),
            runtime_crate: default_runtime_crate(),
            header: default_header(),
        }
    }
}
