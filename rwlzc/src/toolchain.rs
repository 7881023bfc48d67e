//! Native compilation of generated IR.
//!
//! The front end stops at IR text. Turning that text into an executable is
//! the job of a [`Toolchain`]; the bundled [`SystemToolchain`] writes the IR
//! to a `.ll` file and hands it to a C compiler driver, which verifies it,
//! compiles it, and links it against the C library.

use std::path::{Path, PathBuf};
use std::process::Command;

use thiserror::Error;

use crate::config::ToolchainConfig;

#[derive(Debug, Error)]
pub enum LinkError {
    #[error("failed to write IR to {path}: {source}")]
    WriteIr {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to run `{driver}`: {source}")]
    Spawn {
        driver: String,
        #[source]
        source: std::io::Error,
    },

    #[error("`{driver}` exited with {status}:\n{stderr}")]
    Failed {
        driver: String,
        status: String,
        stderr: String,
    },
}

/// Accepts IR text and produces an executable.
pub trait Toolchain {
    fn link(&self, ir: &str, output: &Path) -> Result<PathBuf, LinkError>;
}

/// A C compiler driver on the `PATH` (`clang` by default).
#[derive(Debug, Clone)]
pub struct SystemToolchain {
    driver: String,
    args: Vec<String>,
}

impl SystemToolchain {
    pub fn new(config: &ToolchainConfig) -> Self {
        Self {
            driver: config.driver.clone(),
            args: config.args.clone(),
        }
    }

    /// The driver invocation for an IR file already on disk.
    pub fn command(&self, ir_path: &Path, output: &Path) -> Command {
        let mut command = Command::new(&self.driver);
        command.args(&self.args).arg(ir_path).arg("-o").arg(output);
        command
    }
}

impl Toolchain for SystemToolchain {
    fn link(&self, ir: &str, output: &Path) -> Result<PathBuf, LinkError> {
        let ir_path = output.with_extension("ll");
        std::fs::write(&ir_path, ir).map_err(|source| LinkError::WriteIr {
            path: ir_path.clone(),
            source,
        })?;

        tracing::info!(
            driver = %self.driver,
            input = %ir_path.display(),
            output = %output.display(),
            "linking"
        );
        let result = self
            .command(&ir_path, output)
            .output()
            .map_err(|source| LinkError::Spawn {
                driver: self.driver.clone(),
                source,
            })?;

        if !result.status.success() {
            return Err(LinkError::Failed {
                driver: self.driver.clone(),
                status: result.status.to_string(),
                stderr: String::from_utf8_lossy(&result.stderr).into_owned(),
            });
        }
        Ok(output.to_path_buf())
    }
}
