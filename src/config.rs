// interpreter configuration
//
// `Config` is built once from the environment and the command line and then only
// borrowed. Each setting falls back through a list of environment variables before
// its built-in default.

use {
  clap::ValueEnum,
  log::warn,
  std::path::Path,
};

const MOD: &str = std::module_path!();

pub const DEFAULT_DOCKER: &str = "docker";
pub const DEFAULT_PYTHON: &str = "python3";
pub const DEFAULT_MIRROR: &str = "docker_mirror.py";
pub const DEFAULT_DOCKERFILE: &str = "Dockerfile";
pub const DEFAULT_BASE: &str = "ubuntu:24.04";
pub const DEFAULT_TIMEOUT: u64 = 999;

/////
// CmdStyle, how the `CMD` list is written into the commit change
//
// `Repr` writes a list literal like `['sleep', '9999']` which is what existing
// images were committed with. `Json` writes `["sleep","9999"]`, the exec form the
// engine parses as an argv.

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum CmdStyle {
  Repr,
  Json,
}

impl Default for CmdStyle {
  fn default() -> Self { CmdStyle::Repr }
}

impl CmdStyle {

  pub fn render(&self, argv: &[&str]) -> String {
    match self {
      CmdStyle::Repr => {
        let items: Vec<String> = argv.iter().map(|arg| repr(arg)).collect();
        format!("[{}]", items.join(", "))
      },
      CmdStyle::Json => serde_json::to_string(argv).unwrap_or_default(),
    }
  }
}

fn repr(item: &str) -> String {
  // quote like a list literal: single quotes unless only double quotes avoid escapes

  let escaped = item.replace('\\', "\\\\");
  if item.contains('\'') && !item.contains('"') {
    format!("\"{}\"", escaped)
  } else {
    format!("'{}'", escaped.replace('\'', "\\'"))
  }
}

/////
// Config

#[derive(Clone, Debug)]
pub struct Config {
  pub docker: String,
  pub python: String,
  pub mirror: String,
  pub dockerfile: String,
  pub base: String,
  pub into: String,
  pub timeout: u64,
  pub build_envs: Vec<String>,
  pub build_args: Vec<String>,
  pub add_hosts: Vec<String>,
  pub local: bool,
  pub updates: bool,
  pub universe: bool,
  pub epel: bool,
  pub cmd_style: CmdStyle,
}

impl Default for Config {

  fn default() -> Self {
    Self {
      docker: DEFAULT_DOCKER.to_owned(),
      python: DEFAULT_PYTHON.to_owned(),
      mirror: DEFAULT_MIRROR.to_owned(),
      dockerfile: DEFAULT_DOCKERFILE.to_owned(),
      base: DEFAULT_BASE.to_owned(),
      into: default_tag(),
      timeout: DEFAULT_TIMEOUT,
      build_envs: Vec::new(),
      build_args: Vec::new(),
      add_hosts: Vec::new(),
      local: false,
      updates: false,
      universe: false,
      epel: false,
      cmd_style: CmdStyle::default(),
    }
  }
}

impl Config {

  pub fn from_env() -> Self {
    Self::from_vars(|name| std::env::var(name).ok())
  }

  pub fn from_vars<F>(var: F) -> Self
  where
    F: Fn(&str) -> Option<String>,
  {
    // the first variable that is set wins, in the order listed

    let lookup = |names: &[&str]| names.iter().find_map(|name| var(name));
    let defaults = Self::default();
    let timeout = match lookup(&["DOCKER_IMAGE_TIMEOUT"]) {
      Some(value) => value.trim().parse().unwrap_or_else(|_| {
        warn!(target: MOD, "DOCKER_IMAGE_TIMEOUT is not a number: {}", value);
        DEFAULT_TIMEOUT
      }),
      None => DEFAULT_TIMEOUT,
    };
    Self {
      docker: lookup(&["DOCKER_EXE", "DOCKER_BIN"]).unwrap_or(defaults.docker),
      python: lookup(&["DOCKER_PYTHON", "DOCKER_PYTHON3"]).unwrap_or(defaults.python),
      mirror: lookup(&["DOCKER_MIRROR_PY", "DOCKER_MIRROR"]).unwrap_or_else(default_mirror),
      dockerfile: lookup(&["DOCKER_IMAGE_DOCKERFILE"]).unwrap_or(defaults.dockerfile),
      base: lookup(&["DOCKER_IMAGE_BASE", "DOCKER_IMAGE_FROM"]).unwrap_or(defaults.base),
      into: lookup(&["DOCKER_IMAGE_INTO", "DOCKER_IMAGE_TAG"]).unwrap_or(defaults.into),
      timeout,
      build_envs: words(lookup(&["DOCKER_IMAGE_BUILD_ENVS"])),
      build_args: words(lookup(&["DOCKER_IMAGE_BUILD_ARGS"])),
      ..defaults
    }
  }

  pub fn envs(&self) -> Vec<String> {
    // initial NAME=VALUE list of every session

    self.build_envs.iter().chain(self.build_args.iter()).cloned().collect()
  }

  pub fn mirror_options(&self) -> Vec<&'static str> {
    let mut options = Vec::new();
    if self.local { options.push("--local"); }
    if self.updates { options.push("--updates"); }
    if self.universe { options.push("--universe"); }
    if self.epel { options.push("--epel"); }
    options
  }
}

fn words(value: Option<String>) -> Vec<String> {
  value
    .unwrap_or_default()
    .split_whitespace()
    .map(String::from)
    .collect()
}

pub fn default_tag() -> String {
  format!("test_{}", chrono::Local::now().format("%y%m%d%H%M"))
}

fn default_mirror() -> String {
  // the mirror helper is expected beside our own executable

  let dir = std::env::args()
    .next()
    .and_then(|arg0| Path::new(&arg0).parent().map(|dir| dir.to_path_buf()))
    .filter(|dir| !dir.as_os_str().is_empty())
    .unwrap_or_else(|| Path::new(".").to_path_buf());
  dir.join(DEFAULT_MIRROR).to_string_lossy().into_owned()
}

#[cfg(test)]
mod tests {

  use {
    std::collections::HashMap,
    crate::config::{CmdStyle, Config, DEFAULT_TIMEOUT},
  };

  fn config(vars: &[(&str, &str)]) -> Config {
    let vars: HashMap<String, String> = vars
      .iter()
      .map(|(k, v)| (k.to_string(), v.to_string()))
      .collect();
    Config::from_vars(|name| vars.get(name).cloned())
  }

  #[test]
  fn test_defaults() {
    let config = config(&[]);
    assert_eq!(config.docker, "docker");
    assert_eq!(config.python, "python3");
    assert!(config.mirror.ends_with("docker_mirror.py"));
    assert_eq!(config.dockerfile, "Dockerfile");
    assert_eq!(config.base, "ubuntu:24.04");
    assert!(config.into.starts_with("test_"));
    assert_eq!(config.timeout, DEFAULT_TIMEOUT);
    assert!(config.envs().is_empty());
    assert!(config.mirror_options().is_empty());
  }

  #[test]
  fn test_env_fallbacks() {
    let config = config(&[
      ("DOCKER_BIN", "podman"),
      ("DOCKER_PYTHON3", "/usr/bin/python3.11"),
      ("DOCKER_MIRROR", "/opt/mirror/docker_mirror.py"),
      ("DOCKER_IMAGE_FROM", "centos:7"),
      ("DOCKER_IMAGE_TAG", "local/demo:1"),
      ("DOCKER_IMAGE_INTO", "local/demo:2"),
      ("DOCKER_IMAGE_TIMEOUT", "60"),
      ("DOCKER_IMAGE_DOCKERFILE", "Imagefile"),
    ]);
    assert_eq!(config.docker, "podman");
    assert_eq!(config.python, "/usr/bin/python3.11");
    assert_eq!(config.mirror, "/opt/mirror/docker_mirror.py");
    assert_eq!(config.base, "centos:7");
    assert_eq!(config.into, "local/demo:2");
    assert_eq!(config.timeout, 60);
    assert_eq!(config.dockerfile, "Imagefile");
  }

  #[test]
  fn test_bad_timeout() {
    assert_eq!(config(&[("DOCKER_IMAGE_TIMEOUT", "soon")]).timeout, DEFAULT_TIMEOUT);
  }

  #[test]
  fn test_build_envs_then_args() {
    let config = config(&[
      ("DOCKER_IMAGE_BUILD_ARGS", " C=3 "),
      ("DOCKER_IMAGE_BUILD_ENVS", "A=1  B=2"),
    ]);
    assert_eq!(config.envs(), vec!["A=1", "B=2", "C=3"]);
  }

  #[test]
  fn test_mirror_options() {
    let config = Config { local: true, universe: true, epel: true, ..Config::default() };
    assert_eq!(config.mirror_options(), vec!["--local", "--universe", "--epel"]);
  }

  #[test]
  fn test_cmd_style() {
    assert_eq!(CmdStyle::Repr.render(&["sleep", "9999"]), "['sleep', '9999']");
    assert_eq!(CmdStyle::Repr.render(&["it's"]), "[\"it's\"]");
    assert_eq!(CmdStyle::Repr.render(&[""]), "['']");
    assert_eq!(CmdStyle::Json.render(&["sleep", "9999"]), "[\"sleep\",\"9999\"]");
  }
}
