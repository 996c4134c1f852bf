pub mod genoutput;
pub mod solutions;
pub mod test;

use std::path::PathBuf;

use anyhow::Context as _;
use gradekit_core::Config;

use crate::util;

#[derive(Debug, clap::Parser)]
#[command(author, version, about, long_about = None)]
pub struct GlobalArgs {
    #[command(subcommand)]
    pub subcmd: Subcommand,
}

#[derive(Debug, clap::Subcommand)]
pub enum Subcommand {
    /// Grade a submission archive
    #[command(alias("t"))]
    Test(test::Args),

    /// Build the staff solution, buggy solutions and judges
    Solutions(solutions::Args),

    /// Generate reference outputs and runtime budgets
    #[command(name = "genoutput")]
    GenOutput(genoutput::Args),
}

pub type SubcmdResult = anyhow::Result<()>;

impl GlobalArgs {
    pub async fn exec_subcmd(&self) -> SubcmdResult {
        use Subcommand::*;
        match &self.subcmd {
            Test(args) => test::exec(args, self).await,
            Solutions(args) => solutions::exec(args, self).await,
            GenOutput(args) => genoutput::exec(args, self).await,
        }
    }
}

#[derive(Debug, clap::Args)]
pub struct ProjectArgs {
    /// Project config file
    pub config: PathBuf,

    /// Directory holding the solutions, judges and tests [default: current dir]
    #[arg(short = 'C', long)]
    pub project_dir: Option<PathBuf>,
}

impl ProjectArgs {
    pub fn load(&self) -> anyhow::Result<(PathBuf, Config)> {
        let cfg = Config::from_toml_file(self.config.clone())
            .with_context(|| format!("Failed to load {}", self.config.to_string_lossy()))?;
        let dir = self.project_dir();
        log::info!("Project dir is {}", dir.to_string_lossy());
        Ok((dir, cfg))
    }

    /// Absolute project dir. Relative ones are taken from the current dir.
    pub fn project_dir(&self) -> PathBuf {
        match &self.project_dir {
            Some(dir) if dir.is_relative() => util::current_dir().join(dir),
            Some(dir) => dir.clone(),
            None => util::current_dir(),
        }
    }
}
