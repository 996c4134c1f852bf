use gradekit_core::{action, print_success};

use super::{GlobalArgs, ProjectArgs, SubcmdResult};

#[derive(Debug, clap::Args)]
pub struct Args {
    #[command(flatten)]
    pub project: ProjectArgs,
}

pub async fn exec(args: &Args, _: &GlobalArgs) -> SubcmdResult {
    let (project_dir, cfg) = args.project.load()?;
    action::compile_solutions(&project_dir, &cfg).await?;
    action::generate_output(&project_dir, &cfg).await?;
    print_success!(
        "Reference outputs are up to date ({} tests)",
        cfg.integration.tests.len()
    );
    Ok(())
}
