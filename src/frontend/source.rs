use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use log::info;

/// One `.vm` file selected for translation.
#[derive(Debug, Clone, PartialEq)]
pub struct SourceFile {
    /// Module name used for static variables.
    pub name: String,
    pub path: PathBuf,
}

impl SourceFile {
    pub fn new(path: PathBuf) -> Self {
        Self {
            name: module_name(&path),
            path,
        }
    }

    pub fn read(&self) -> io::Result<String> {
        fs::read_to_string(&self.path)
    }
}

/// The files to translate and where their output goes.
#[derive(Debug, Clone)]
pub struct SourceSet {
    pub files: Vec<SourceFile>,
    pub output: PathBuf,
    /// A directory is a whole program and gets the bootstrap by default.
    pub whole_program: bool,
}

#[derive(Debug)]
pub enum SourceError {
    Io { path: PathBuf, source: io::Error },
    NotVmFile(PathBuf),
    NoVmFiles(PathBuf),
}

impl std::fmt::Display for SourceError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SourceError::Io { path, source } => write!(f, "{}: {}", path.display(), source),
            SourceError::NotVmFile(path) => {
                write!(f, "expected a .vm file, got {}", path.display())
            }
            SourceError::NoVmFiles(path) => {
                write!(f, "no .vm files found in {}", path.display())
            }
        }
    }
}

impl std::error::Error for SourceError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            SourceError::Io { source, .. } => Some(source),
            _ => None,
        }
    }
}

impl SourceSet {
    /// A `.vm` file translates to `<stem>.asm` beside it; a directory
    /// translates every `.vm` file directly inside it, in name order, to
    /// `<dir>/<dirname>.asm`.
    pub fn open(path: &Path) -> Result<Self, SourceError> {
        let meta = fs::metadata(path).map_err(|source| SourceError::Io {
            path: path.to_path_buf(),
            source,
        })?;

        if meta.is_dir() {
            Self::open_dir(path)
        } else {
            if !is_vm_file(path) {
                return Err(SourceError::NotVmFile(path.to_path_buf()));
            }
            info!("{} selected for translation", path.display());
            Ok(SourceSet {
                files: vec![SourceFile::new(path.to_path_buf())],
                output: path.with_extension("asm"),
                whole_program: false,
            })
        }
    }

    fn open_dir(dir: &Path) -> Result<Self, SourceError> {
        let io_err = |source| SourceError::Io {
            path: dir.to_path_buf(),
            source,
        };

        let mut paths = Vec::new();
        for entry in fs::read_dir(dir).map_err(io_err)? {
            let path = entry.map_err(io_err)?.path();
            if path.is_file() && is_vm_file(&path) {
                paths.push(path);
            }
        }
        if paths.is_empty() {
            return Err(SourceError::NoVmFiles(dir.to_path_buf()));
        }
        paths.sort();

        for path in &paths {
            info!("{} selected for translation", path.display());
        }

        let dir_name = dir
            .canonicalize()
            .ok()
            .and_then(|p| p.file_name().map(|n| n.to_string_lossy().into_owned()))
            .unwrap_or_else(|| "out".to_string());

        Ok(SourceSet {
            files: paths.into_iter().map(SourceFile::new).collect(),
            output: dir.join(format!("{}.asm", dir_name)),
            whole_program: true,
        })
    }
}

fn is_vm_file(path: &Path) -> bool {
    path.extension().and_then(|e| e.to_str()) == Some("vm")
}

/// File stem, with anything that is not a legal Hack symbol character
/// replaced by `_`.
pub fn module_name(path: &Path) -> String {
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();

    stem.chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | '$' | ':') {
                c
            } else {
                '_'
            }
        })
        .collect()
}
