use std::path::PathBuf;

use gradekit_core::{action, print_success};

use super::{GlobalArgs, ProjectArgs, SubcmdResult};

#[derive(Debug, clap::Args)]
pub struct Args {
    #[command(flatten)]
    pub project: ProjectArgs,

    /// Submission archive (tar)
    pub submit_file: PathBuf,

    /// Also write the grade report as JSON to this file
    #[arg(long)]
    pub report: Option<PathBuf>,
}

pub async fn exec(args: &Args, _global_args: &GlobalArgs) -> SubcmdResult {
    let (project_dir, cfg) = args.project.load()?;

    let report = action::do_test(&project_dir, &cfg, &args.submit_file).await?;

    if let Some(path) = &args.report {
        fsutil::write_json_with_mkdir(path, &report)?;
        print_success!("Saved grade report to {}", path.to_string_lossy());
    }
    Ok(())
}
