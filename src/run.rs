use {
  log::{debug, info},
  std::process::{Command, Stdio},
  thiserror,
};

const MOD: &str = std::module_path!();

/////
// Errors

#[derive(thiserror::Error, Debug)]
pub enum Error {

  #[error("Command exited with unexpected status code `{0}`")]
  UnexpectedExitCode(i32),

  #[error("Child process returned no exit code")]
  ExitCodeMissing,

  #[error(transparent)]
  IOError(#[from] std::io::Error),
}

impl Error {

  pub fn exit_code(&self) -> i32 {
    // status to hand back to our own caller when a fatal command fails

    match self {
      Error::UnexpectedExitCode(code) if *code != 0 => *code,
      _ => 1,
    }
  }
}

pub type Result<T> = std::result::Result<T, Error>;

/////
// Output, the result of running a command

#[derive(Debug)]
pub struct Output {
  code: i32,
  pub stdout: Option<String>,
}

impl Output {

  fn new(code: i32, stdout: Option<String>) -> Self {
    Self { code, stdout }
  }

  pub fn code(&self) -> i32 { self.code }

  pub fn zero(&self) -> bool { self.code == 0 }

  pub fn stdout(&self) -> Option<&str> { self.stdout.as_deref() }
}

/////
// Shell, the seam between the interpreter and the host
//
// - `sh` runs a line and fails on a nonzero exit
// - `sx` runs a line and only reports its exit code
// - `output` runs a line and returns its stdout with trailing whitespace removed

pub trait Shell {

  fn sh(&self, line: &str) -> Result<()>;

  fn sx(&self, line: &str) -> Option<i32>;

  fn output(&self, line: &str) -> Result<String>;
}

/////
// Runner, run shell lines using `process::Command`

#[derive(Clone, Debug, Default)]
pub struct Runner {
  enforce_code: Option<i32>,
  capture: bool,
}

impl Runner {

  pub fn new() -> Self {
    Self::default()
  }

  pub fn enforce(&mut self) -> &mut Self {
    self.enforce_code = Some(0i32);
    self
  }

  pub fn capture(&mut self) -> &mut Self {
    self.capture = true;
    self
  }

  pub fn run(&self, line: &str) -> Result<Output> {
    // run `line` through the shell, blocking until it exits

    let mut command = Command::new("sh");
    command
      .arg("-c")
      .arg(line)
      .stdin(Stdio::null());
    let (code, stdout) = if self.capture {
      let output = command.stderr(Stdio::inherit()).output()?;
      let code = output.status.code().ok_or(Error::ExitCodeMissing)?;
      (code, Some(String::from_utf8_lossy(&output.stdout).into_owned()))
    } else {
      let status = command.status()?;
      (status.code().ok_or(Error::ExitCodeMissing)?, None)
    };
    match self.enforce_code {
      Some(enforce_code) if enforce_code != code => Err(Error::UnexpectedExitCode(code)),
      _ => Ok(Output::new(code, stdout)),
    }
  }
}

impl Shell for Runner {

  fn sh(&self, line: &str) -> Result<()> {
    info!(target: MOD, ": {}", line);
    self.clone().enforce().run(line)?;
    Ok(())
  }

  fn sx(&self, line: &str) -> Option<i32> {
    info!(target: MOD, ": {}", line);
    let mut runner = self.clone();
    runner.enforce_code = None;
    match runner.run(line) {
      Ok(output) => {
        if !output.zero() {
          debug!(target: MOD, "ignoring exit code {}", output.code());
        }
        Some(output.code())
      },
      Err(err) => {
        debug!(target: MOD, "ignoring failure: {}", err);
        None
      },
    }
  }

  fn output(&self, line: &str) -> Result<String> {
    info!(target: MOD, ": {}", line);
    let mut runner = self.clone();
    runner.enforce_code = None;
    let output = runner.capture().run(line)?;
    Ok(output.stdout().unwrap_or_default().trim_end().to_owned())
  }
}

#[cfg(test)]
mod tests {

  use crate::run::{Error, Runner, Shell};

  #[test]
  fn test_capture() {
    let output = Runner::new()
      .capture()
      .enforce()
      .run("echo hello test")
      .unwrap();
    assert_eq!(output.code(), 0);
    assert_eq!(output.stdout().unwrap(), "hello test\n");
  }

  #[test]
  fn test_enforce() {
    let err = Runner::new()
      .enforce()
      .run("exit 3")
      .unwrap_err();
    assert!(matches!(err, Error::UnexpectedExitCode(3)));
    assert_eq!(err.exit_code(), 3);
  }

  #[test]
  fn test_reuse() {
    let mut runner = Runner::new();
    runner.run("/bin/false").unwrap();
    runner.enforce();
    runner.run("/bin/true").unwrap();
  }

  #[test]
  fn test_shell_modes() {
    let runner = Runner::new();
    assert!(runner.sh("true").is_ok());
    assert!(runner.sh("false").is_err());
    assert_eq!(runner.sx("exit 5"), Some(5));
    assert_eq!(runner.output("printf 'ubuntu:24.04\\n\\n'").unwrap(), "ubuntu:24.04");
  }
}
