//! Mount configuration: CLI positionals plus the `-o key=value,...` option
//! bag, parsed in two layers like the original mount tool's `Args` class.
//!
//! Unlike the original's dynamically-typed `OrderedDict` dispatch, this is
//! a single struct built field-by-field, each field backed by a
//! `default_*` function in the style of a `#[serde(default = "...")]`
//! config struct, so every default is named and independently testable.

use std::path::PathBuf;

use crate::error::GitFsError;

/// Megabytes, as accepted by `max_size`/`max_offset`.
const BYTES_PER_MB: u64 = 1024 * 1024;

fn default_ssh_key() -> PathBuf {
    std::env::var_os("HOME")
        .map(|home| PathBuf::from(home).join(".ssh/id_rsa"))
        .unwrap_or_else(|| PathBuf::from(".ssh/id_rsa"))
}

const fn default_max_size_mb() -> u64 {
    10
}

const fn default_fetch_timeout_secs() -> u64 {
    30
}

const fn default_merge_timeout_secs() -> u64 {
    5
}

const fn default_idle_fetch_timeout_secs() -> u64 {
    300
}

const fn default_min_idle_times() -> u64 {
    3
}

fn default_current_path() -> String {
    "current".to_owned()
}

fn default_history_path() -> String {
    "history".to_owned()
}

const fn default_max_open_files() -> i64 {
    -1
}

fn default_log() -> String {
    "syslog".to_owned()
}

fn default_log_level() -> String {
    "warning".to_owned()
}

fn default_committer_name() -> String {
    "GitFS".to_owned()
}

fn default_committer_email() -> String {
    "gitfs@localhost".to_owned()
}

/// Fully resolved mount configuration: the two positionals plus every
/// `-o` key's effective value (explicit or default).
#[derive(Clone, Debug)]
pub struct MountOptions {
    /// The remote repository to clone and track.
    pub remote_url: String,
    /// Where to mount the filesystem.
    pub mount_point: PathBuf,

    /// Local clone staging directory. Defaults to a fresh temp directory.
    pub repo_path: PathBuf,
    /// Mount-wide uid override (from `-o user=`), resolved from a username
    /// or numeric uid.
    pub uid: u32,
    /// Mount-wide gid override (from `-o group=`).
    pub gid: u32,
    /// Tracked branch. Empty string means "the remote's default branch",
    /// resolved after clone.
    pub branch: String,

    /// HTTP(S) basic-auth username.
    pub username: Option<String>,
    /// HTTP(S) basic-auth password or token.
    pub password: Option<String>,
    /// SSH username (informational; embedded in the remote URL by the caller).
    pub ssh_user: Option<String>,
    /// SSH private key path.
    pub ssh_key: PathBuf,

    /// Stay attached to the controlling terminal instead of daemonizing.
    pub foreground: bool,
    /// Allow other users to access the mount.
    pub allow_other: bool,
    /// Allow root to access the mount (implied when run as root).
    pub allow_root: bool,

    /// Name attached to the author identity on generated commits.
    pub committer_name: String,
    /// Email attached to the author identity on generated commits.
    pub committer_email: String,

    /// Maximum file size accepted by `write`, in bytes.
    pub max_size: u64,
    /// Reserved for future partial-write support; currently informational.
    pub max_offset: Option<u64>,

    /// How often `FetchWorker` fetches when otherwise idle.
    pub fetch_timeout_secs: u64,
    /// How long a single merge attempt may run before being treated as failed.
    pub merge_timeout_secs: u64,
    /// `FetchWorker`'s wait timeout once the mount has been idle for a while.
    pub idle_fetch_timeout_secs: u64,
    /// Consecutive idle ticks before `SyncWorker` sets the idle event.
    pub min_idle_times: u64,

    /// Mount-relative name of the writable view (`/` elides `IndexView`).
    pub current_path: String,
    /// Mount-relative name of the read-only history view.
    pub history_path: String,

    /// Extra exclude-file path, unioned with `.gitignore`.
    pub ignore_file: Option<PathBuf>,
    /// Paths always excluded from staging regardless of `.gitignore`.
    pub hard_ignore: Vec<String>,

    /// `setrlimit(RLIMIT_NOFILE, ...)` value; `-1` leaves the ambient limit.
    pub max_open_files: i64,
    /// Force debug-level logging regardless of `log_level`.
    pub debug: bool,
    /// `"syslog"` or a file path for the rotating log sink.
    pub log: String,
    /// `tracing` level filter, unless overridden by `debug`.
    pub log_level: String,
}

impl MountOptions {
    /// Build options from the two CLI positionals, before any `-o` overrides
    /// are applied.
    #[must_use]
    pub fn new(remote_url: String, mount_point: PathBuf) -> Self {
        Self {
            remote_url,
            mount_point,
            repo_path: std::env::temp_dir().join(format!("gitfs-{}", std::process::id())),
            uid: nix::unistd::getuid().as_raw(),
            gid: nix::unistd::getgid().as_raw(),
            branch: String::new(),
            username: None,
            password: None,
            ssh_user: None,
            ssh_key: default_ssh_key(),
            foreground: false,
            allow_other: false,
            allow_root: false,
            committer_name: default_committer_name(),
            committer_email: default_committer_email(),
            max_size: default_max_size_mb() * BYTES_PER_MB,
            max_offset: None,
            fetch_timeout_secs: default_fetch_timeout_secs(),
            merge_timeout_secs: default_merge_timeout_secs(),
            idle_fetch_timeout_secs: default_idle_fetch_timeout_secs(),
            min_idle_times: default_min_idle_times(),
            current_path: default_current_path(),
            history_path: default_history_path(),
            ignore_file: None,
            hard_ignore: Vec::new(),
            max_open_files: default_max_open_files(),
            debug: false,
            log: default_log(),
            log_level: default_log_level(),
        }
    }

    /// Parse a `-o key=value,key2=value2` string and apply each pair over
    /// the current values. Boolean keys accept a bare `key` (no `=value`)
    /// as `true`, matching the original's `OptionParser` convention.
    ///
    /// # Errors
    /// Returns [`GitFsError::InvalidOption`] if a key is unrecognized or a
    /// value fails to parse as the expected type.
    pub fn apply_options(&mut self, raw: &str) -> Result<(), GitFsError> {
        for pair in raw.split(',').filter(|s| !s.is_empty()) {
            let (key, value) = pair.split_once('=').map_or((pair, None), |(k, v)| (k, Some(v)));
            self.apply_one(key, value)?;
        }
        Ok(())
    }

    fn apply_one(&mut self, key: &str, value: Option<&str>) -> Result<(), GitFsError> {
        match key {
            "repo_path" => self.repo_path = PathBuf::from(require(key, value)?),
            "user" => self.uid = resolve_uid(require(key, value)?, key)?,
            "group" => self.gid = resolve_gid(require(key, value)?, key)?,
            "branch" => self.branch = require(key, value)?.to_owned(),
            "username" => self.username = Some(require(key, value)?.to_owned()),
            "password" => self.password = Some(require(key, value)?.to_owned()),
            "ssh_user" => self.ssh_user = Some(require(key, value)?.to_owned()),
            "ssh_key" => self.ssh_key = PathBuf::from(require(key, value)?),
            "foreground" => self.foreground = parse_bool(key, value)?,
            "allow_other" => self.allow_other = parse_bool(key, value)?,
            "allow_root" => self.allow_root = parse_bool(key, value)?,
            "committer_name" => self.committer_name = require(key, value)?.to_owned(),
            "committer_email" => self.committer_email = require(key, value)?.to_owned(),
            "max_size" => self.max_size = parse_u64(key, value)? * BYTES_PER_MB,
            "max_offset" => self.max_offset = Some(parse_u64(key, value)? * BYTES_PER_MB),
            "fetch_timeout" => self.fetch_timeout_secs = parse_u64(key, value)?,
            "merge_timeout" => self.merge_timeout_secs = parse_u64(key, value)?,
            "idle_fetch_timeout" => self.idle_fetch_timeout_secs = parse_u64(key, value)?,
            "min_idle_times" => self.min_idle_times = parse_u64(key, value)?,
            "current_path" => self.current_path = normalize_view_path(require(key, value)?),
            "history_path" => self.history_path = normalize_view_path(require(key, value)?),
            "ignore_file" => self.ignore_file = Some(PathBuf::from(require(key, value)?)),
            "hard_ignore" => {
                self.hard_ignore = require(key, value)?.split(':').map(str::to_owned).collect();
            }
            "max_open_files" => self.max_open_files = parse_i64(key, value)?,
            "debug" => self.debug = parse_bool(key, value)?,
            "log" => self.log = require(key, value)?.to_owned(),
            "log_level" => self.log_level = require(key, value)?.to_owned(),
            other => {
                return Err(GitFsError::InvalidOption {
                    key: other.to_owned(),
                    message: "unrecognized mount option".to_owned(),
                })
            }
        }
        Ok(())
    }
}

/// `current`/`history` are stored without a leading slash; the router
/// re-adds it when building route regexes.
fn normalize_view_path(value: &str) -> String {
    value.trim_start_matches('/').to_owned()
}

fn require<'a>(key: &str, value: Option<&'a str>) -> Result<&'a str, GitFsError> {
    value.ok_or_else(|| GitFsError::InvalidOption {
        key: key.to_owned(),
        message: "expects a value".to_owned(),
    })
}

fn parse_bool(key: &str, value: Option<&str>) -> Result<bool, GitFsError> {
    match value {
        None | Some("true" | "1" | "yes") => Ok(true),
        Some("false" | "0" | "no") => Ok(false),
        Some(other) => Err(GitFsError::InvalidOption {
            key: key.to_owned(),
            message: format!("expected a boolean, got `{other}`"),
        }),
    }
}

fn parse_u64(key: &str, value: Option<&str>) -> Result<u64, GitFsError> {
    require(key, value)?.parse().map_err(|_| GitFsError::InvalidOption {
        key: key.to_owned(),
        message: "expected a non-negative integer".to_owned(),
    })
}

fn parse_i64(key: &str, value: Option<&str>) -> Result<i64, GitFsError> {
    require(key, value)?.parse().map_err(|_| GitFsError::InvalidOption {
        key: key.to_owned(),
        message: "expected an integer".to_owned(),
    })
}

fn resolve_uid(value: &str, key: &str) -> Result<u32, GitFsError> {
    if let Ok(uid) = value.parse::<u32>() {
        return Ok(uid);
    }
    Err(GitFsError::InvalidOption {
        key: key.to_owned(),
        message: "expected a numeric uid (username lookup is not available in this build)".to_owned(),
    })
}

fn resolve_gid(value: &str, key: &str) -> Result<u32, GitFsError> {
    if let Ok(gid) = value.parse::<u32>() {
        return Ok(gid);
    }
    Err(GitFsError::InvalidOption {
        key: key.to_owned(),
        message: "expected a numeric gid (group lookup is not available in this build)".to_owned(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn opts() -> MountOptions {
        MountOptions::new("https://example.com/repo.git".to_owned(), PathBuf::from("/mnt/repo"))
    }

    #[test]
    fn defaults_match_spec() {
        let o = opts();
        assert_eq!(o.max_size, 10 * BYTES_PER_MB);
        assert_eq!(o.fetch_timeout_secs, 30);
        assert_eq!(o.merge_timeout_secs, 5);
        assert_eq!(o.current_path, "current");
        assert_eq!(o.history_path, "history");
        assert_eq!(o.max_open_files, -1);
        assert_eq!(o.log, "syslog");
        assert_eq!(o.log_level, "warning");
        assert!(!o.foreground);
    }

    #[test]
    fn parses_comma_separated_pairs() {
        let mut o = opts();
        o.apply_options("branch=main,foreground,max_size=20,log=/var/log/gitfs.log").unwrap();
        assert_eq!(o.branch, "main");
        assert!(o.foreground);
        assert_eq!(o.max_size, 20 * BYTES_PER_MB);
        assert_eq!(o.log, "/var/log/gitfs.log");
    }

    #[test]
    fn bare_boolean_key_means_true() {
        let mut o = opts();
        o.apply_options("allow_other").unwrap();
        assert!(o.allow_other);
    }

    #[test]
    fn unknown_key_is_rejected() {
        let mut o = opts();
        assert!(o.apply_options("frobnicate=1").is_err());
    }

    #[test]
    fn current_path_loses_leading_slash() {
        let mut o = opts();
        o.apply_options("current_path=/").unwrap();
        assert_eq!(o.current_path, "");
    }

    #[test]
    fn hard_ignore_splits_on_colon() {
        let mut o = opts();
        o.apply_options("hard_ignore=foo:bar/baz").unwrap();
        assert_eq!(o.hard_ignore, vec!["foo", "bar/baz"]);
    }
}
