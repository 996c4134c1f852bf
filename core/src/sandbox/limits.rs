use std::time::Duration;

use serde::Deserialize;
use tokio::process::Command;

/// Resource caps applied to limited runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct Limits {
    /// CPU time in seconds.
    pub time_limit: u64,
    /// Largest file the process may write, in bytes.
    pub disk_limit: u64,
    /// Address space in megabytes.
    pub memory_limit: u64,
}

#[cfg(all(target_os = "linux", target_env = "gnu"))]
type Resource = libc::__rlimit_resource_t;
#[cfg(not(all(target_os = "linux", target_env = "gnu")))]
type Resource = libc::c_int;

fn apply_rlimit(resource: Resource, soft: u64, hard: u64) -> std::io::Result<()> {
    let limit = libc::rlimit {
        rlim_cur: soft as libc::rlim_t,
        rlim_max: hard as libc::rlim_t,
    };
    let rc = unsafe { libc::setrlimit(resource, &limit) };
    if rc == 0 {
        Ok(())
    } else {
        Err(std::io::Error::last_os_error())
    }
}

impl Limits {
    /// Upper bound on real time for a limited run. A process that sleeps or blocks
    /// never exhausts its CPU limit, so it is killed after this instead.
    pub fn wall_clock(&self) -> Duration {
        Duration::from_secs(self.time_limit.saturating_mul(2).saturating_add(1))
    }

    pub fn memory_bytes(&self) -> u64 {
        self.memory_limit.saturating_mul(1024 * 1024)
    }

    /// Install the limits on `cmd` so they take effect in the child right before exec.
    /// The child also becomes the leader of a new process group so the whole tree
    /// can be killed at once.
    pub(crate) fn install(&self, cmd: &mut Command) {
        let limits = *self;
        let memory = limits.memory_bytes();
        unsafe {
            cmd.pre_exec(move || {
                if libc::setpgid(0, 0) != 0 {
                    return Err(std::io::Error::last_os_error());
                }
                apply_rlimit(
                    libc::RLIMIT_CPU,
                    limits.time_limit,
                    limits.time_limit.saturating_add(1),
                )?;
                apply_rlimit(libc::RLIMIT_FSIZE, limits.disk_limit, limits.disk_limit)?;
                apply_rlimit(libc::RLIMIT_AS, memory, memory)?;
                Ok(())
            });
        }
    }

    pub(crate) fn validate(&self) -> Result<(), String> {
        if self.time_limit == 0 || self.disk_limit == 0 || self.memory_limit == 0 {
            return Err(format!("jail limits must all be positive: {:?}", self));
        }
        Ok(())
    }
}
