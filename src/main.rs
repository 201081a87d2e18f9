//! docker-image - build images from a directive list using local package mirrors

use {
  anyhow::Context,
  clap::{ArgAction, Parser},
  log::{debug, error},
  docker_image::{
    build::Builder,
    config::{CmdStyle, Config},
    logging,
    run::{Runner, Shell},
  },
};

const MOD: &str = std::module_path!();

#[derive(Parser, Debug)]
#[command(name = "docker-image")]
#[command(version, about = "Build images using the local docker_mirror.py repo packages", long_about = None)]
#[command(override_usage = "docker-image [OPTIONS] [FROM image] [INTO image] [INSTALL pack] ...")]
struct Cli {
  /// More logging
  #[arg(short, long, action = ArgAction::Count)]
  verbose: u8,

  /// Less logging
  #[arg(short = '^', long, action = ArgAction::Count)]
  quiet: u8,

  /// Path to the docker_mirror.py helper
  #[arg(short = '>', long, value_name = "PY")]
  mirror: Option<String>,

  /// Use another container tool
  #[arg(short = 'D', long, value_name = "EXE")]
  docker: Option<String>,

  /// Python interpreter for the mirror helper
  #[arg(short = 'P', long, value_name = "EXE")]
  python: Option<String>,

  /// Add a NAME=VALUE environment for RUN, TEST and SYMLINK (repeatable)
  #[arg(long = "build-arg", value_name = "NAME=VALUE")]
  build_args: Vec<String>,

  /// Add hosts for the epel repo as well
  #[arg(long)]
  epel: bool,

  /// Add hosts for the updates variant
  #[arg(long, visible_alias = "update")]
  updates: bool,

  /// Add hosts for the universe variant
  #[arg(long)]
  universe: bool,

  /// Additional add-host beyond docker_mirror.py (repeatable)
  #[arg(long = "add-host", value_name = "HOST:IP")]
  add_hosts: Vec<String>,

  /// Fail if the local mirror is not found
  #[arg(short, long, visible_alias = "localmirrors", action = ArgAction::Count)]
  local: u8,

  /// Change directory before building
  #[arg(short = 'C', long, value_name = "PATH")]
  chdir: Option<String>,

  /// Base image for FROM
  #[arg(short = 'b', long, visible_alias = "from", value_name = "N")]
  base: Option<String>,

  /// Target tag for INTO
  #[arg(short = 't', long, visible_alias = "tag", value_name = "N")]
  into: Option<String>,

  /// Dockerfile name used by BUILD
  #[arg(short = 'f', long, value_name = "M")]
  file: Option<String>,

  /// Seconds a scratch container may live
  #[arg(long, value_name = "SECS")]
  timeout: Option<u64>,

  /// How the image CMD is written on commit
  #[arg(long, value_enum, default_value_t = CmdStyle::Repr)]
  cmd_style: CmdStyle,

  /// Directives, e.g. FROM centos:7 INTO app:1 INSTALL vim
  directives: Vec<String>,
}

impl Cli {

  fn config(&self, env: Config) -> Config {
    // command line over environment over defaults

    let mut build_args = env.build_args.clone();
    build_args.extend(self.build_args.iter().cloned());
    Config {
      docker: self.docker.clone().unwrap_or(env.docker),
      python: self.python.clone().unwrap_or(env.python),
      mirror: self.mirror.clone().unwrap_or(env.mirror),
      dockerfile: self.file.clone().unwrap_or(env.dockerfile),
      base: self.base.clone().unwrap_or(env.base),
      into: self.into.clone().unwrap_or(env.into),
      timeout: self.timeout.unwrap_or(env.timeout),
      build_envs: env.build_envs,
      build_args,
      add_hosts: self.add_hosts.clone(),
      local: self.local > 0,
      updates: self.updates,
      universe: self.universe,
      epel: self.epel,
      cmd_style: self.cmd_style,
    }
  }
}

fn execute<S>(config: &Config, chdir: Option<&str>, shell: &dyn Shell, directives: &[S]) -> anyhow::Result<i32>
where
  S: AsRef<str>,
{
  // relative BUILD and FILE paths resolve against `chdir`

  if let Some(chdir) = chdir {
    std::env::set_current_dir(chdir)
      .with_context(|| format!("Failed to change directory to {}", chdir))?;
  }
  debug!(target: MOD, "{:?}", config);
  match Builder::new(config, shell).build(directives) {
    Ok(_) => Ok(0),
    Err(err) => Ok(err.exit_code()),
  }
}

fn run(cli: &Cli) -> anyhow::Result<i32> {
  logging::setup(logging::level(cli.verbose, cli.quiet), std::io::stderr())
    .context("Failed to set up logging")?;
  let config = cli.config(Config::from_env());
  execute(&config, cli.chdir.as_deref(), &Runner::new(), cli.directives.as_slice())
}

fn main() {
  let cli = Cli::parse();
  let code = run(&cli).unwrap_or_else(|err| {
    error!(target: MOD, "{:#}", err);
    eprintln!("docker-image: {:#}", err);
    1
  });
  std::process::exit(code);
}
