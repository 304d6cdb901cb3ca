//! Bootstrap of the process-wide embedded PostgreSQL cluster.
//!
//! `pg-embed-setup-unpriv` installs under `/var/tmp` by default. Sandboxed
//! runs cannot write there, so when `PG_RUNTIME_DIR` or `PG_DATA_DIR` is
//! unset both are pointed at a directory under `target/` for the duration of
//! the bootstrap. `PG_PASSWORD` is pinned so a reused data directory keeps
//! accepting the password it was initialised with.

use std::path::PathBuf;
use std::sync::{Mutex, OnceLock};
use std::time::Duration;

use pg_embedded_setup_unpriv::ClusterHandle;

static PG_EMBED_BOOTSTRAP_LOCK: OnceLock<Mutex<()>> = OnceLock::new();

const MAX_RETRIES: u32 = 3;
const RETRY_DELAY_MS: u64 = 500;
const STABLE_PASSWORD: &str = "futureproof_embedded_test";

fn pg_embed_dirs() -> Result<(PathBuf, PathBuf), std::io::Error> {
    let target_dir = std::env::var_os("CARGO_TARGET_DIR").map_or_else(
        || {
            PathBuf::from(env!("CARGO_MANIFEST_DIR"))
                .join("..")
                .join("target")
        },
        PathBuf::from,
    );
    let base = target_dir.join("pg-embed").join("shared");
    let runtime_dir = base.join("install");
    let data_dir = base.join("data");
    std::fs::create_dir_all(&runtime_dir)?;
    std::fs::create_dir_all(&data_dir)?;
    Ok((runtime_dir, data_dir))
}

fn is_transient_error(err: &str) -> bool {
    let err_lower = err.to_lowercase();
    [
        "error decoding response body",
        "connection reset",
        "connection refused",
        "timed out",
        "timeout",
        "temporarily unavailable",
        "dns error",
    ]
    .iter()
    .any(|pattern| err_lower.contains(pattern))
}

fn scoped_env() -> Result<Vec<(&'static str, Option<String>)>, String> {
    let mut vars = Vec::new();
    if std::env::var_os("PG_RUNTIME_DIR").is_none() || std::env::var_os("PG_DATA_DIR").is_none() {
        let (runtime_dir, data_dir) = pg_embed_dirs().map_err(|err| err.to_string())?;
        vars.push((
            "PG_RUNTIME_DIR",
            Some(runtime_dir.to_string_lossy().into_owned()),
        ));
        vars.push(("PG_DATA_DIR", Some(data_dir.to_string_lossy().into_owned())));
    }
    if std::env::var_os("PG_PASSWORD").is_none() {
        vars.push(("PG_PASSWORD", Some(STABLE_PASSWORD.to_owned())));
    }
    Ok(vars)
}

/// The shared cluster for this test binary, started on first use.
///
/// Retries transient download failures since parallel suites fetch the
/// PostgreSQL binaries at the same time.
pub fn shared_cluster() -> Result<&'static ClusterHandle, String> {
    let _bootstrap_guard = PG_EMBED_BOOTSTRAP_LOCK
        .get_or_init(|| Mutex::new(()))
        .lock()
        .unwrap_or_else(|err| err.into_inner());
    let _env_guard = env_lock::lock_env(scoped_env()?);

    let mut last_error = String::new();
    for attempt in 0..=MAX_RETRIES {
        match pg_embedded_setup_unpriv::test_support::shared_cluster_handle() {
            Ok(handle) => return Ok(handle),
            Err(err) => {
                last_error = format!("{err:?}");
                if attempt == MAX_RETRIES || !is_transient_error(&last_error) {
                    break;
                }
                let delay = Duration::from_millis(RETRY_DELAY_MS * (1 << attempt));
                eprintln!(
                    "pg-embed: transient error on attempt {}/{}, retrying in {delay:?}: {last_error}",
                    attempt + 1,
                    MAX_RETRIES + 1,
                );
                std::thread::sleep(delay);
            }
        }
    }
    Err(last_error)
}
