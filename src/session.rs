//! Build sessions and the scratch container behind them.
//!
//! A session spans from an `INTO`/`TAG` directive to the next `INTO`/`TAG`,
//! `COMMIT` or the end of the directive list. While it is open a detached container
//! named after the target tag sleeps in the background and every directive runs
//! inside it. Closing the session commits that container to the tag.

use {
  lazy_static::lazy_static,
  log::{debug, info},
  regex::Regex,
  crate::{
    config::Config,
    fs::basename,
    package,
    progs::{docker::Docker, mirror::Mirror},
    run::{Result, Shell},
  },
};

const MOD: &str = std::module_path!();

pub const CONTAINER_PREFIX: &str = "build-";

lazy_static! {
  static ref TAG_SEPARATORS: Regex = Regex::new("[:.]").unwrap();
}

/// Why a session is being closed.
///
/// Replacing a session with a new `INTO`/`TAG` stops the scratch container before
/// committing it. A `COMMIT` directive or the end of the list commits the running
/// container as it is.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Close {
  Replace,
  Terminal,
}

#[derive(Clone, Debug, Default)]
pub struct BuildSession {
  pub building: String,
  pub tagging: String,
  pub into: Option<String>,
  pub runuser: String,
  pub runexe: String,
  pub runcmd: String,
  pub envs: Vec<String>,
  pub distro: String,
  pub refresh: Option<String>,
  pub search: Option<String>,
  pub package: Option<String>,
}

/// Name of the scratch container for `tag`.
pub fn container_name(tag: &str) -> String {
  format!("{}{}", CONTAINER_PREFIX, TAG_SEPARATORS.replace_all(basename(tag), "-"))
}

impl BuildSession {

  pub fn new(config: &Config) -> Self {
    Self {
      building: config.base.clone(),
      tagging: config.into.clone(),
      envs: config.envs(),
      ..Self::default()
    }
  }

  pub fn container(&self) -> Option<&str> {
    self.into.as_deref()
  }

  pub fn open(&mut self, config: &Config, shell: &dyn Shell, tag: &str) -> Result<()> {
    // commit any running session, then start a scratch container for `tag`

    if self.into.is_some() {
      self.close(config, shell, Close::Replace)?;
    }
    let docker = Docker::new(&config.docker);
    let mirror = Mirror::new(&config.python, &config.mirror);
    self.tagging = tag.to_owned();
    self.distro = mirror.detect(shell, &self.building)?;
    self.refresh = None;
    self.search = None;
    self.package = None;
    let name = container_name(&self.tagging);
    let mut add_hosts = mirror.start(shell, &self.distro, &config.mirror_options())?;
    for add_host in &config.add_hosts {
      add_hosts.push_str(&format!(" --add-host {}", add_host));
    }
    info!(target: MOD, "building {} from {} ({})", self.tagging, self.building, self.distro);
    shell.sh(&docker.rm_force(&name))?;
    shell.sh(&docker.run_detached(&name, add_hosts.trim(), &self.building, config.timeout))?;
    self.into = Some(name);
    Ok(())
  }

  pub fn commit_changes(&self, config: &Config) -> Vec<String> {
    // `-c` change flags carrying the image's USER and CMD

    let mut changes = Vec::new();
    if !self.runcmd.is_empty() {
      let mut argv: Vec<&str> = Vec::new();
      if !self.runexe.is_empty() {
        argv.extend(self.runexe.split(' '));
      }
      argv.extend(self.runcmd.split(' '));
      changes.push(format!("-c 'CMD {}'", config.cmd_style.render(&argv)));
    }
    if !self.runuser.is_empty() {
      changes.push(format!("-c 'USER {}'", self.runuser));
    }
    changes
  }

  pub fn close(&mut self, config: &Config, shell: &dyn Shell, reason: Close) -> Result<()> {
    let into = match self.into.take() {
      Some(into) => into,
      None => return Ok(()),
    };
    let docker = Docker::new(&config.docker);
    let changes = self.commit_changes(config);
    info!(target: MOD, "commit {} into {}", into, self.tagging);
    shell.sx(&docker.rmi(&self.tagging));
    if reason == Close::Replace {
      shell.sx(&docker.stop(&into));
    }
    shell.sh(&docker.commit(&changes, &into, &self.tagging))?;
    shell.sh(&docker.rm_force(&into))?;
    Ok(())
  }

  pub fn refresh(&mut self, config: &Config, shell: &dyn Shell) {
    // update the package index once per session

    if self.refresh.is_some() {
      return;
    }
    let refresh = package::package_refresh(&self.distro);
    if let Some(into) = &self.into {
      debug!(target: MOD, "refresh {}", refresh);
      shell.sx(&Docker::new(&config.docker).exec(into, &refresh));
    }
    self.refresh = Some(refresh);
  }

  pub fn search_tool(&mut self) -> &str {
    let distro = &self.distro;
    self.search.get_or_insert_with(|| package::package_search(distro))
  }

  pub fn package_tool(&mut self) -> &str {
    let distro = &self.distro;
    self.package.get_or_insert_with(|| package::package_tool(distro))
  }
}

#[cfg(test)]
pub(crate) mod testing {

  use {
    std::cell::RefCell,
    crate::run::{Error, Result, Shell},
  };

  /// Shell double that records every line instead of running it.
  #[derive(Default)]
  pub struct Recorder {
    pub lines: RefCell<Vec<String>>,
    pub failing: Vec<String>,
    pub outputs: Vec<(String, String)>,
  }

  impl Recorder {

    pub fn new() -> Self {
      Self::default()
    }

    pub fn with_output(mut self, needle: &str, output: &str) -> Self {
      self.outputs.push((needle.to_owned(), output.to_owned()));
      self
    }

    pub fn failing(mut self, needle: &str) -> Self {
      self.failing.push(needle.to_owned());
      self
    }

    pub fn lines(&self) -> Vec<String> {
      self.lines.borrow().clone()
    }

    pub fn count(&self, needle: &str) -> usize {
      self.lines.borrow().iter().filter(|line| line.contains(needle)).count()
    }

    fn record(&self, line: &str) -> i32 {
      self.lines.borrow_mut().push(line.to_owned());
      match self.failing.iter().any(|needle| line.contains(needle.as_str())) {
        true => 1,
        false => 0,
      }
    }
  }

  impl Shell for Recorder {

    fn sh(&self, line: &str) -> Result<()> {
      match self.record(line) {
        0 => Ok(()),
        code => Err(Error::UnexpectedExitCode(code)),
      }
    }

    fn sx(&self, line: &str) -> Option<i32> {
      Some(self.record(line))
    }

    fn output(&self, line: &str) -> Result<String> {
      self.record(line);
      Ok(self.outputs
        .iter()
        .find(|(needle, _)| line.contains(needle.as_str()))
        .map(|(_, output)| output.clone())
        .unwrap_or_default())
    }
  }
}

#[cfg(test)]
mod tests {

  use crate::{
    config::{CmdStyle, Config},
    session::{container_name, testing::Recorder, BuildSession, Close},
  };

  fn config() -> Config {
    Config {
      python: "python3".into(),
      mirror: "docker_mirror.py".into(),
      base: "ubuntu:24.04".into(),
      into: "test_latest".into(),
      ..Config::default()
    }
  }

  #[test]
  fn test_container_name() {
    assert_eq!(container_name("demo:1"), "build-demo-1");
    assert_eq!(container_name("localhost:5000/testing/centos-7.9:latest"), "build-centos-7-9-latest");
  }

  #[test]
  fn test_new_session() {
    let config = Config { build_envs: vec!["A=1".into()], build_args: vec!["B=2".into()], ..config() };
    let session = BuildSession::new(&config);
    assert_eq!(session.building, "ubuntu:24.04");
    assert_eq!(session.tagging, "test_latest");
    assert_eq!(session.envs, vec!["A=1", "B=2"]);
    assert!(session.container().is_none());
  }

  #[test]
  fn test_open() {
    let config = Config { add_hosts: vec!["repo.local:10.0.0.1".into()], updates: true, ..config() };
    let shell = Recorder::new()
      .with_output(" detect ", "ubuntu:24.04")
      .with_output(" start ", "--add-host=archive.ubuntu.com:172.17.0.2");
    let mut session = BuildSession::new(&config);
    session.open(&config, &shell, "demo:1").unwrap();
    assert_eq!(session.container(), Some("build-demo-1"));
    assert_eq!(session.distro, "ubuntu:24.04");
    assert_eq!(shell.lines(), vec![
      "python3 docker_mirror.py detect ubuntu:24.04",
      "python3 docker_mirror.py start ubuntu:24.04 --add-hosts --no-detect --updates",
      "docker rm -f build-demo-1",
      "docker run -d --name=build-demo-1 --rm=true \
       --add-host=archive.ubuntu.com:172.17.0.2 --add-host repo.local:10.0.0.1 \
       ubuntu:24.04 sleep 999",
    ]);
  }

  #[test]
  fn test_close_paths() {
    let config = config();
    let shell = Recorder::new();
    let mut session = BuildSession::new(&config);
    session.into = Some("build-x".into());
    session.close(&config, &shell, Close::Terminal).unwrap();
    assert_eq!(shell.count("docker stop"), 0);
    assert!(session.container().is_none());

    let shell = Recorder::new();
    session.into = Some("build-x".into());
    session.close(&config, &shell, Close::Replace).unwrap();
    assert_eq!(shell.lines(), vec![
      "docker rmi test_latest",
      "docker stop build-x",
      "docker commit build-x test_latest",
      "docker rm -f build-x",
    ]);
  }

  #[test]
  fn test_close_without_container() {
    let config = config();
    let shell = Recorder::new();
    BuildSession::new(&config).close(&config, &shell, Close::Terminal).unwrap();
    assert!(shell.lines().is_empty());
  }

  #[test]
  fn test_failed_commit() {
    let config = config();
    let shell = Recorder::new().failing(" commit ");
    let mut session = BuildSession::new(&config);
    session.into = Some("build-x".into());
    assert!(session.close(&config, &shell, Close::Terminal).is_err());
    assert_eq!(shell.count(" rm -f "), 0);
  }

  #[test]
  fn test_commit_changes() {
    let config = config();
    let mut session = BuildSession::new(&config);
    assert!(session.commit_changes(&config).is_empty());
    session.runuser = "nobody".into();
    session.runexe = "/usr/bin/systemctl".into();
    session.runcmd = "init".into();
    assert_eq!(session.commit_changes(&config), vec![
      "-c 'CMD ['/usr/bin/systemctl', 'init']'",
      "-c 'USER nobody'",
    ]);
    let json = Config { cmd_style: CmdStyle::Json, ..config };
    assert_eq!(session.commit_changes(&json)[0], "-c 'CMD [\"/usr/bin/systemctl\",\"init\"]'");
  }

  #[test]
  fn test_refresh_once() {
    let config = config();
    let shell = Recorder::new();
    let mut session = BuildSession::new(&config);
    session.into = Some("build-x".into());
    session.distro = "centos:7".into();
    session.refresh(&config, &shell);
    session.refresh(&config, &shell);
    assert_eq!(shell.count("check-update"), 1);
    assert!(session.package_tool().starts_with("yum"));
    assert!(session.search_tool().ends_with("search"));
  }
}
