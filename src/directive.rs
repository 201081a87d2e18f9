//! Directives and the pairing of raw tokens into them.
//!
//! A directive list is a flat sequence of tokens. Most directives are written as a
//! keyword followed by its argument (`INSTALL vim`), either as two tokens or as one
//! token containing a space. Two shorthands need no keyword at all:
//!
//! - `marker@package` is an `INSTALL` that is skipped when `marker` exists
//! - `:path` is a `MAKE` that creates an empty file (or a directory with a trailing `/`)
//!
//! Pairing is lazy so that directives ahead of a malformed token still run.

use {
  std::fmt,
  thiserror,
};

#[derive(thiserror::Error, Debug, PartialEq, Eq)]
pub enum Error {

  #[error("Unrecognized command `{0}`")]
  Unrecognized(String),

  #[error("Missing argument for `{0}`")]
  MissingArgument(String),
}

impl Error {

  pub fn exit_code(&self) -> i32 { exitcode::USAGE }
}

pub type Result<T> = std::result::Result<T, Error>;

/////
// Command

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Command {
  From,
  Into,
  Tag,
  File,
  Build,
  Env,
  Exe,
  Cmd,
  User,
  Search,
  Install,
  Copy,
  Save,
  Symlink,
  Make,
  Test,
  Run,
  Commit,
  Unknown(String),
}

impl Command {

  pub fn parse(word: &str) -> Self {
    // keywords are accepted in all-upper or all-lower case only

    let upper = word.to_ascii_uppercase();
    if word != upper && word != word.to_ascii_lowercase() {
      return Command::Unknown(word.to_owned());
    }
    match upper.as_str() {
      "FROM" => Command::From,
      "INTO" => Command::Into,
      "TAG" => Command::Tag,
      "FILE" => Command::File,
      "BUILD" => Command::Build,
      "ENV" => Command::Env,
      "EXE" => Command::Exe,
      "CMD" => Command::Cmd,
      "USER" => Command::User,
      "SEARCH" => Command::Search,
      "INSTALL" => Command::Install,
      "COPY" => Command::Copy,
      "SAVE" => Command::Save,
      "SYMLINK" => Command::Symlink,
      "MAKE" => Command::Make,
      "TEST" => Command::Test,
      "RUN" => Command::Run,
      "COMMIT" => Command::Commit,
      _ => Command::Unknown(word.to_owned()),
    }
  }

  pub fn keyword(&self) -> &str {
    match self {
      Command::From => "FROM",
      Command::Into => "INTO",
      Command::Tag => "TAG",
      Command::File => "FILE",
      Command::Build => "BUILD",
      Command::Env => "ENV",
      Command::Exe => "EXE",
      Command::Cmd => "CMD",
      Command::User => "USER",
      Command::Search => "SEARCH",
      Command::Install => "INSTALL",
      Command::Copy => "COPY",
      Command::Save => "SAVE",
      Command::Symlink => "SYMLINK",
      Command::Make => "MAKE",
      Command::Test => "TEST",
      Command::Run => "RUN",
      Command::Commit => "COMMIT",
      Command::Unknown(word) => word.as_str(),
    }
  }

  pub fn needs_argument(&self) -> bool {
    !matches!(self, Command::Commit | Command::Unknown(_))
  }
}

impl fmt::Display for Command {

  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.keyword())
  }
}

/// Whether `token` is a bare keyword that takes the next token as its argument.
pub fn needs_argument(token: &str) -> bool {
  Command::parse(token).needs_argument()
}

/////
// Directive

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Directive {
  pub command: Command,
  pub argument: String,
}

impl Directive {

  pub fn new(command: Command, argument: &str) -> Self {
    Self { command, argument: argument.to_owned() }
  }

  fn split(line: &str) -> Self {
    // "CMD arg" with the argument running to the end of the line

    match line.split_once(' ') {
      Some((command, argument)) => Self::new(Command::parse(command), argument),
      None => Self::new(Command::parse(line), ""),
    }
  }
}

impl fmt::Display for Directive {

  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{} [{}]", self.command, self.argument)
  }
}

/////
// Pairing, tokens to directives

#[derive(Debug)]
enum State {
  Idle,
  AwaitingArgumentFor(Command),
}

pub struct Pairing<I> {
  tokens: I,
  state: State,
  failed: bool,
}

pub fn pairs<I>(tokens: I) -> Pairing<I::IntoIter>
where
  I: IntoIterator,
  I::Item: AsRef<str>,
{
  Pairing { tokens: tokens.into_iter(), state: State::Idle, failed: false }
}

impl<I> Iterator for Pairing<I>
where
  I: Iterator,
  I::Item: AsRef<str>,
{
  type Item = Result<Directive>;

  fn next(&mut self) -> Option<Self::Item> {
    if self.failed {
      return None;
    }
    loop {
      let token = match self.tokens.next() {
        Some(token) => token,
        None => {
          return match std::mem::replace(&mut self.state, State::Idle) {
            State::Idle => None,
            State::AwaitingArgumentFor(command) => {
              self.failed = true;
              Some(Err(Error::MissingArgument(command.to_string())))
            },
          };
        },
      };
      let token = token.as_ref();
      if let State::AwaitingArgumentFor(command) = std::mem::replace(&mut self.state, State::Idle) {
        return Some(Ok(Directive::new(command, token)));
      }
      if token.contains(' ') {
        return Some(Ok(Directive::split(token)));
      }
      if token.contains('@') {
        return Some(Ok(Directive::new(Command::Install, token)));
      }
      if token.starts_with(':') {
        return Some(Ok(Directive::new(Command::Make, token)));
      }
      match Command::parse(token) {
        Command::Commit => return Some(Ok(Directive::new(Command::Commit, ""))),
        Command::Unknown(_) => {
          self.failed = true;
          return Some(Err(Error::Unrecognized(token.to_owned())));
        },
        command => self.state = State::AwaitingArgumentFor(command),
      }
    }
  }
}
