//! PID liveness probe.

/// Check whether a process with `pid` still exists.
///
/// An exited but not yet reaped child still counts as existing.
#[cfg(unix)]
pub fn pid_alive(pid: u32) -> bool {
    use nix::sys::signal;
    use nix::unistd::Pid;

    let Ok(raw) = i32::try_from(pid) else {
        return false;
    };

    // Signal None is the "null signal": it only checks that we could signal the process
    match signal::kill(Pid::from_raw(raw), None) {
        Ok(()) => true,
        Err(nix::errno::Errno::ESRCH) => false, // No such process
        Err(_) => true,                         // Process exists but we lack permission
    }
}

#[cfg(not(unix))]
pub fn pid_alive(_pid: u32) -> bool {
    // No cheap probe; callers fall back to the exit signal.
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    #[cfg(unix)]
    fn alive_for_self() {
        assert!(pid_alive(std::process::id()));
    }

    #[test]
    #[cfg(unix)]
    fn dead_for_impossible_pid() {
        // Above any pid_max the kernel allows
        assert!(!pid_alive(2_147_483_000));
    }
}
