// thin wrapper for the docker_mirror.py helper
//
// The helper runs local package mirror containers and answers with `--add-host`
// flags that make them resolvable under the upstream repository hostnames.

use {
  log::debug,
  crate::run::{Result, Shell},
};

const MOD: &str = std::module_path!();

pub struct Mirror<'a> {
  python: &'a str,
  script: &'a str,
}

impl<'a> Mirror<'a> {

  pub fn new(python: &'a str, script: &'a str) -> Self {
    Self { python, script }
  }

  fn command(&self, args: &[&str]) -> String {
    let mut parts = vec![self.python, self.script];
    parts.extend(args.iter().filter(|arg| !arg.is_empty()));
    parts.join(" ")
  }

  pub fn detect(&self, shell: &dyn Shell, image: &str) -> Result<String> {
    // distro name of `image`, e.g. `ubuntu:24.04` or `opensuse/leap:15.5`

    shell.output(&self.command(&["detect", image]))
  }

  pub fn start(&self, shell: &dyn Shell, distro: &str, options: &[&str]) -> Result<String> {
    // start the mirror containers for `distro`, returning their add-host flags

    let mut args = vec!["start", distro, "--add-hosts", "--no-detect"];
    args.extend(options);
    shell.output(&self.command(&args))
  }

  pub fn stop(&self, shell: &dyn Shell, distro: &str) {
    let args = ["stop", distro, "--add-hosts", "--no-detect"];
    if let Err(err) = shell.output(&self.command(&args)) {
      debug!(target: MOD, "ignoring mirror stop failure: {}", err);
    }
  }
}

#[cfg(test)]
mod tests {

  use crate::progs::mirror::Mirror;

  #[test]
  fn test_command() {
    let mirror = Mirror::new("python3", "./docker_mirror.py");
    assert_eq!(mirror.command(&["detect", "centos:7"]), "python3 ./docker_mirror.py detect centos:7");
    assert_eq!(
      mirror.command(&["stop", "", "--add-hosts", "--no-detect"]),
      "python3 ./docker_mirror.py stop --add-hosts --no-detect");
  }
}
