use {
  chrono,
  fern,
  log::LevelFilter,
};

#[derive(thiserror::Error, Debug)]
pub enum Error {

  #[error(transparent)] LogSetLogger(#[from] log::SetLoggerError),
}

pub type Result<T> = std::result::Result<T, Error>;

const LEVELS: [LevelFilter; 6] = [
  LevelFilter::Off,
  LevelFilter::Error,
  LevelFilter::Warn,
  LevelFilter::Info,
  LevelFilter::Debug,
  LevelFilter::Trace,
];

pub fn level(verbose: u8, quiet: u8) -> LevelFilter {
  // warnings by default, each `-v` one step louder and each `-^` one step quieter

  let index = 2 + i32::from(verbose) - i32::from(quiet);
  LEVELS[index.max(0).min(LEVELS.len() as i32 - 1) as usize]
}

pub fn setup<O>(level: LevelFilter, output: O) -> Result<()>
where
  O: Into<fern::Output>,
{
  Ok(fern::Dispatch
    ::new()
    .format(|out, message, record| {
      out.finish(format_args!(
        "{0: <18} {1: >5} {2}",
        chrono::Local::now().format("%m/%d %H:%M:%S%.3f"),
        record.level(),
        message,
      ))
    })
    .level(level)
    .chain(output)
    .apply()?)
}

#[cfg(test)]
mod tests {

  use {
    log::LevelFilter,
    crate::logging::level,
  };

  #[test]
  fn test_level() {
    assert_eq!(level(0, 0), LevelFilter::Warn);
    assert_eq!(level(1, 0), LevelFilter::Info);
    assert_eq!(level(2, 0), LevelFilter::Debug);
    assert_eq!(level(9, 0), LevelFilter::Trace);
    assert_eq!(level(0, 1), LevelFilter::Error);
    assert_eq!(level(1, 9), LevelFilter::Off);
  }
}
