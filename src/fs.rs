use {
  log::debug,
  std::path::{Path, PathBuf},
  thiserror,
};

const MOD: &str = std::module_path!();

#[derive(thiserror::Error, Debug)]
pub enum Error {

  #[error("No such file or directory: `{0}`")]
  Missing(PathBuf),

  #[error("Failed to read `{path}`: {source}")]
  Io {
    path: PathBuf,
    #[source]
    source: std::io::Error,
  },
}

impl Error {

  pub fn exit_code(&self) -> i32 {
    match self {
      Error::Missing(_) => exitcode::OSFILE,
      Error::Io { .. } => exitcode::IOERR,
    }
  }

  fn io<P: AsRef<Path>>(path: P, source: std::io::Error) -> Self {
    Error::Io { path: path.as_ref().to_path_buf(), source }
  }
}

pub type Result<T> = std::result::Result<T, Error>;

#[inline]
pub fn require<P: AsRef<Path>>(path: P) -> Result<()> {
  match path.as_ref().exists() {
    true => Ok(()),
    false => Err(Error::Missing(path.as_ref().to_path_buf())),
  }
}

#[inline]
pub fn require_dir<P: AsRef<Path>>(path: P) -> Result<()> {
  match path.as_ref().is_dir() {
    true => Ok(()),
    false => Err(Error::Missing(path.as_ref().to_path_buf())),
  }
}

#[inline]
pub fn require_file<P: AsRef<Path>>(path: P) -> Result<()> {
  match path.as_ref().is_file() {
    true => Ok(()),
    false => Err(Error::Missing(path.as_ref().to_path_buf())),
  }
}

pub fn realpath<P: AsRef<Path>>(path: P) -> Result<PathBuf> {
  std::fs::canonicalize(&path).map_err(|e| Error::io(&path, e))
}

pub fn loads<P: AsRef<Path>>(path: P) -> Result<String> {
  debug!(target: MOD, "loading {}", path.as_ref().display());
  std::fs::read_to_string(&path).map_err(|e| Error::io(&path, e))
}

// string path helpers for paths inside a container, which need not exist here

pub fn dirname(path: &str) -> &str {
  match path.rfind('/') {
    Some(index) => {
      let head = &path[..=index];
      let trimmed = head.trim_end_matches('/');
      if trimmed.is_empty() { head } else { trimmed }
    },
    None => "",
  }
}

pub fn basename(path: &str) -> &str {
  match path.rfind('/') {
    Some(index) => &path[index + 1..],
    None => path,
  }
}
