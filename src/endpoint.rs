//! Input and output streams, opened lazily by the stage that owns them.

use crate::error::{PipelineError, Result};
use std::fmt;
use std::fs::File;
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};

/// Where the source stage reads from.
pub enum Input {
    Stdin,
    Path(PathBuf),
    Reader(Box<dyn Read + Send>),
}

/// Where the sink stage writes to.
pub enum Output {
    Stdout,
    /// Created or truncated when opened.
    Path(PathBuf),
    Writer(Box<dyn Write + Send>),
}

impl Input {
    /// `None` or `-` mean stdin.
    pub fn from_arg(path: Option<&Path>) -> Self {
        match path {
            Some(p) if p != Path::new("-") => Input::Path(p.to_path_buf()),
            _ => Input::Stdin,
        }
    }

    pub fn reader<R: Read + Send + 'static>(reader: R) -> Self {
        Input::Reader(Box::new(reader))
    }

    pub(crate) fn open(self) -> Result<Box<dyn Read + Send>> {
        match self {
            Input::Stdin => Ok(Box::new(io::stdin())),
            Input::Path(path) => match File::open(&path) {
                Ok(file) => Ok(Box::new(file)),
                Err(source) => Err(PipelineError::Open {
                    role: "input",
                    path,
                    source,
                }),
            },
            Input::Reader(reader) => Ok(reader),
        }
    }
}

impl Output {
    /// `None` or `-` mean stdout.
    pub fn from_arg(path: Option<&Path>) -> Self {
        match path {
            Some(p) if p != Path::new("-") => Output::Path(p.to_path_buf()),
            _ => Output::Stdout,
        }
    }

    pub fn writer<W: Write + Send + 'static>(writer: W) -> Self {
        Output::Writer(Box::new(writer))
    }

    pub(crate) fn open(self) -> Result<Box<dyn Write + Send>> {
        match self {
            Output::Stdout => Ok(Box::new(io::stdout())),
            Output::Path(path) => match File::create(&path) {
                Ok(file) => Ok(Box::new(file)),
                Err(source) => Err(PipelineError::Open {
                    role: "output",
                    path,
                    source,
                }),
            },
            Output::Writer(writer) => Ok(writer),
        }
    }
}

impl fmt::Display for Input {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Input::Stdin => f.write_str("<stdin>"),
            Input::Path(path) => write!(f, "{}", path.display()),
            Input::Reader(_) => f.write_str("<reader>"),
        }
    }
}

impl fmt::Display for Output {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Output::Stdout => f.write_str("<stdout>"),
            Output::Path(path) => write!(f, "{}", path.display()),
            Output::Writer(_) => f.write_str("<writer>"),
        }
    }
}
