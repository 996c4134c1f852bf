use std::io::Write as _;

use colored::Colorize as _;
use gradekit_core::style::ColorTheme as _;

/// Log to stderr, `warn` and above unless `RUST_LOG` says otherwise.
pub fn init() {
    let env = env_logger::Env::default().default_filter_or("warn");
    env_logger::Builder::from_env(env)
        .format(|buf, record| {
            let level = record.level();
            writeln!(
                buf,
                "[{} {}] {}",
                level.as_str().color(level.color()),
                record.target().dimmed(),
                record.args()
            )
        })
        .init();
}
