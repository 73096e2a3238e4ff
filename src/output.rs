use std::sync::OnceLock;

static QUIET: OnceLock<bool> = OnceLock::new();

/// Fix quiet mode for the process; `KBSYNC_QUIET=1` also enables it.
///
/// Only the first call has an effect.
pub fn init_quiet(flag: bool) {
    QUIET.get_or_init(|| flag || quiet_from_env());
}

pub fn is_quiet() -> bool {
    *QUIET.get_or_init(quiet_from_env)
}

fn quiet_from_env() -> bool {
    std::env::var("KBSYNC_QUIET")
        .map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
        .unwrap_or(false)
}
