//! The directive interpreter.
//!
//! [`Builder::build`] walks a directive list in order against one [`BuildSession`].
//! `BUILD <dir>` loads `<dir>/<dockerfile>` as another directive list and
//! interprets it with a fresh session of its own, so nested files can open and
//! commit images without touching the session of the file that included them.
//!
//! Directives that only prepare an image (SEARCH, INSTALL, COPY, SAVE, SYMLINK,
//! MAKE) are best-effort. RUN, TEST and the commit steps abort the whole build,
//! including every enclosing BUILD.

use {
  log::{debug, error, info, warn},
  std::path::{Path, PathBuf},
  thiserror,
  crate::{
    config::Config,
    directive::{self, pairs, Command, Directive},
    fs,
    progs::{docker::Docker, mirror::Mirror},
    run::{self, Shell},
    session::{BuildSession, Close},
  },
};

const MOD: &str = std::module_path!();

/////
// Errors

#[derive(thiserror::Error, Debug)]
pub enum Error {

  #[error("{0}")]
  Usage(String),

  #[error("No container for `{0}`, use INTO or TAG first")]
  NoContainer(String),

  #[error("In `{file}` missing arguments for {keywords}")]
  MissingArguments { file: PathBuf, keywords: String },

  #[error("Cycle detected at `{0}`")]
  Cycle(PathBuf),

  #[error(transparent)]
  Directive(#[from] directive::Error),

  #[error(transparent)]
  Filesystem(#[from] fs::Error),

  #[error(transparent)]
  Run(#[from] run::Error),
}

impl Error {

  pub fn exit_code(&self) -> i32 {
    match self {
      Error::Usage(_) | Error::NoContainer(_) => exitcode::USAGE,
      Error::MissingArguments { .. } => exitcode::DATAERR,
      Error::Cycle(_) => exitcode::OSERR,
      Error::Directive(err) => err.exit_code(),
      Error::Filesystem(err) => err.exit_code(),
      Error::Run(err) => err.exit_code(),
    }
  }
}

pub type Result<T> = std::result::Result<T, Error>;

/////
// CyclicGuard, the nested files currently being expanded

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CyclicGuard(Vec<PathBuf>);

impl CyclicGuard {

  pub fn new() -> Self {
    Self::default()
  }

  pub fn contains(&self, path: &Path) -> bool {
    self.0.iter().any(|entry| entry == path)
  }

  pub fn with(&self, path: PathBuf) -> Self {
    // a copy extended by `path`, for one nested call only

    let mut paths = self.0.clone();
    paths.push(path);
    Self(paths)
  }

  pub fn depth(&self) -> usize {
    self.0.len()
  }
}

/////
// Frame, the state of one directive list

struct Frame {
  session: BuildSession,
  dockerfile: String,
}

/////
// Builder

pub struct Builder<'a> {
  config: &'a Config,
  shell: &'a dyn Shell,
}

fn split_once_or<'s>(arg: &'s str, separator: char, default: &'s str) -> (&'s str, &'s str) {
  arg.split_once(separator).unwrap_or((arg, default))
}

fn single_quoted(arg: &str) -> String {
  // body of a single-quoted shell word

  arg.replace('\'', "'\\''")
}

impl<'a> Builder<'a> {

  pub fn new(config: &'a Config, shell: &'a dyn Shell) -> Self {
    Self { config, shell }
  }

  pub fn build<I>(&self, tokens: I) -> Result<BuildSession>
  where
    I: IntoIterator,
    I::Item: AsRef<str>,
  {
    self.interpret(tokens, &CyclicGuard::new())
  }

  fn interpret<I>(&self, tokens: I, guard: &CyclicGuard) -> Result<BuildSession>
  where
    I: IntoIterator,
    I::Item: AsRef<str>,
  {
    let mut frame = Frame {
      session: BuildSession::new(self.config),
      dockerfile: self.config.dockerfile.clone(),
    };
    for directive in pairs(tokens) {
      let directive = directive.map_err(|err| {
        error!(target: MOD, "{}", err);
        Error::from(err)
      })?;
      info!(target: MOD, "- {}", directive);
      if let Err(err) = self.dispatch(&mut frame, &directive, guard) {
        // BUILD failures are reported where they happen
        if directive.command != Command::Build {
          error!(target: MOD, "{}: {}", directive, err);
        }
        return Err(err);
      }
    }
    let mut session = frame.session;
    if session.into.is_some() {
      info!(target: MOD, "-- ends");
      session.close(self.config, self.shell, Close::Terminal).map_err(|err| {
        error!(target: MOD, "commit {}: {}", session.tagging, err);
        err
      })?;
    }
    Mirror::new(&self.config.python, &self.config.mirror).stop(self.shell, &session.distro);
    Ok(session)
  }

  fn dispatch(&self, frame: &mut Frame, directive: &Directive, guard: &CyclicGuard) -> Result<()> {
    let arg = directive.argument.as_str();
    let docker = Docker::new(&self.config.docker);
    let session = &mut frame.session;
    match &directive.command {
      Command::From => {
        session.building = arg.to_owned();
      },
      Command::Into | Command::Tag => {
        if arg.is_empty() {
          warn!(target: MOD, "no tag value given");
          return Ok(());
        }
        session.open(self.config, self.shell, arg)?;
      },
      Command::Env => match arg.is_empty() {
        true => warn!(target: MOD, "no env value given"),
        false => session.envs.push(arg.to_owned()),
      },
      Command::Exe => match arg.is_empty() {
        true => warn!(target: MOD, "no exe value given"),
        false => session.runexe = arg.to_owned(),
      },
      Command::Cmd => match arg.is_empty() {
        true => warn!(target: MOD, "no cmd value given"),
        false => session.runcmd = arg.to_owned(),
      },
      Command::User => match arg.is_empty() {
        true => warn!(target: MOD, "no user value given"),
        false => session.runuser = arg.to_owned(),
      },
      Command::Search => {
        if arg.is_empty() {
          warn!(target: MOD, "no search pattern given");
          return Ok(());
        }
        let into = match best_effort_container(session, directive) {
          Some(into) => into,
          None => return Ok(()),
        };
        session.refresh(self.config, self.shell);
        let search = session.search_tool().to_owned();
        self.shell.sx(&docker.exec(&into, &format!("{} {}", search, arg)));
      },
      Command::Install => {
        let (test, pack) = match arg.split_once('@') {
          Some((test, pack)) => (test, pack),
          None => ("", arg),
        };
        if pack.is_empty() {
          warn!(target: MOD, "no install pack given");
          return Ok(());
        }
        let into = match best_effort_container(session, directive) {
          Some(into) => into,
          None => return Ok(()),
        };
        session.refresh(self.config, self.shell);
        let tool = session.package_tool().to_owned();
        debug!(target: MOD, "TEST {} PACK {} FROM {}", test, pack, arg);
        let command = match test.is_empty() {
          true => format!("{} install -y {}", tool, pack),
          false => format!("bash -c 'test -f {} || {} install -y {}'", test, tool, pack),
        };
        self.shell.sx(&docker.exec(&into, &command));
      },
      Command::Copy => {
        let (src, dst) = split_once_or(arg, ':', "");
        if src.is_empty() {
          warn!(target: MOD, "no copy src given");
          return Ok(());
        }
        if dst.is_empty() {
          warn!(target: MOD, "no copy dst given");
          return Ok(());
        }
        if let Some(into) = best_effort_container(session, directive) {
          self.shell.sx(&docker.copy_in(src, &into, dst));
        }
      },
      Command::Save => {
        let (src, dst) = split_once_or(arg, ':', "./");
        if let Some(into) = best_effort_container(session, directive) {
          self.shell.sx(&docker.copy_out(&into, src, dst));
        }
      },
      Command::Symlink => {
        let (src, dst) = split_once_or(arg, ':', "/tmp");
        let into = match best_effort_container(session, directive) {
          Some(into) => into,
          None => return Ok(()),
        };
        let command = match !dst.contains('/') && src.contains('/') {
          true => format!("ln -s {} {}/{}", fs::basename(src), fs::dirname(src), dst),
          false => format!("ln -s {} {}", src, dst),
        };
        self.shell.sx(&docker.exec_with(&session.envs, None, &into, &command));
      },
      Command::Make => {
        let dst = arg.strip_prefix(':').unwrap_or(arg);
        if dst.is_empty() {
          warn!(target: MOD, "no make dst given");
          return Ok(());
        }
        let into = match best_effort_container(session, directive) {
          Some(into) => into,
          None => return Ok(()),
        };
        if dst.ends_with('/') {
          self.shell.sx(&docker.exec(&into, &format!("mkdir -p {}", dst)));
        } else {
          let dir = fs::dirname(dst);
          if !dir.is_empty() {
            self.shell.sx(&docker.exec(&into, &format!("mkdir -p {}", dir)));
          }
          self.shell.sx(&docker.exec(&into, &format!("touch {}", dst)));
        }
      },
      Command::Test => {
        let into = required_container(session, directive)?;
        let command = match arg.strip_prefix(':') {
          Some(path) => format!("wc -l {}", path),
          None => arg.to_owned(),
        };
        self.shell.sh(&docker.exec_with(&session.envs, None, &into, &command))?;
      },
      Command::Run => {
        let into = required_container(session, directive)?;
        let user = Some(session.runuser.as_str()).filter(|user| !user.is_empty());
        let command = format!("bash -c '{}'", single_quoted(arg));
        self.shell.sh(&docker.exec_with(&session.envs, user, &into, &command))?;
      },
      Command::Commit => {
        info!(target: MOD, "-- commit");
        session.close(self.config, self.shell, Close::Terminal)?;
      },
      Command::File => {
        if arg.is_empty() {
          return Err(Error::Usage("no dockerfile value provided".to_owned()));
        }
        fs::require(arg)?;
        frame.dockerfile = arg.to_owned();
      },
      Command::Build => {
        let (filename, lines) = self.nested(&frame.dockerfile, arg, guard).map_err(|err| {
          error!(target: MOD, "BUILD {}: {}", arg, err);
          err
        })?;
        debug!(target: MOD, "BUILD {} at depth {}", filename.display(), guard.depth() + 1);
        self.interpret(lines, &guard.with(filename))?;
      },
      Command::Unknown(command) => {
        error!(target: MOD, "unknown cmd {}", command);
      },
    }
    Ok(())
  }

  fn nested(&self, dockerfile: &str, dir: &str, guard: &CyclicGuard) -> Result<(PathBuf, Vec<String>)> {
    // resolve and read `<dir>/<dockerfile>`, refusing files already being expanded

    if dir.is_empty() {
      return Err(Error::Usage("no build directory provided".to_owned()));
    }
    fs::require_dir(dir)?;
    let path = Path::new(dir).join(dockerfile);
    fs::require_file(&path)?;
    let filename = fs::realpath(&path)?;
    if guard.contains(&filename) {
      return Err(Error::Cycle(filename));
    }
    let text = fs::loads(&filename)?;
    let lines = directive_lines(&text);
    let missing = missing_arguments(&lines);
    if !missing.is_empty() {
      return Err(Error::MissingArguments { file: filename, keywords: missing.join(" and ") });
    }
    let lines = lines.into_iter().map(String::from).collect();
    Ok((filename, lines))
  }
}

fn best_effort_container(session: &BuildSession, directive: &Directive) -> Option<String> {
  let into = session.container().map(String::from);
  if into.is_none() {
    warn!(target: MOD, "skipping {}: no container, use INTO or TAG first", directive);
  }
  into
}

fn required_container(session: &BuildSession, directive: &Directive) -> Result<String> {
  session
    .container()
    .map(String::from)
    .ok_or_else(|| Error::NoContainer(directive.to_string()))
}

/// Directive lines of a nested file, without blank lines and `#` comments.
pub fn directive_lines(text: &str) -> Vec<&str> {
  text
    .lines()
    .map(str::trim_end)
    .filter(|line| !line.trim_start().is_empty() && !line.trim_start().starts_with('#'))
    .collect()
}

fn is_directive(line: &str) -> bool {
  let word = line.split(' ').next().unwrap_or_default();
  !matches!(Command::parse(word), Command::Unknown(_))
}

/// Bare keywords that are not followed by an argument line.
pub fn missing_arguments<'s>(lines: &[&'s str]) -> Vec<&'s str> {
  lines
    .iter()
    .enumerate()
    .filter(|(index, line)| {
      directive::needs_argument(line)
        && match lines.get(index + 1) {
          Some(next) => is_directive(next),
          None => true,
        }
    })
    .map(|(_, line)| *line)
    .collect()
}
