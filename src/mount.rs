//! The mount driver: clone, wire up the router and background workers, bind
//! to FUSE, and tear down cleanly on unmount.
//!
//! Mirrors the original mount tool's `main`: resolve credentials, clone (or
//! open an existing clone at `repo_path`), build the route table, spawn
//! `SyncWorker`/`FetchWorker` as daemon threads, hand the router to the FUSE
//! binding, and block until the kernel unmounts it.

use std::path::Path;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use fuser::MountOption;

use gitfs_core::{CachedIgnore, CommitQueue, Router, SyncState};
use gitfs_core::workers::{FetchWorker, FetchWorkerConfig, SyncWorker, SyncWorkerConfig};
use gitfs_git::{Credentials, Repository, Signature};
use gitfs_lfs::GitLfs;

use crate::config::MountOptions;
use crate::error::GitFsError;
use crate::fuse_adapter::GitFsFilesystem;

/// How often the history view's commit-cache snapshot is rebuilt from the
/// branch tip. There's no dedicated event for "history changed" the way
/// there is for fetch/push, so this runs on its own cadence alongside the
/// fetch worker rather than piggybacking on `SyncState`.
const HISTORY_REFRESH_INTERVAL: Duration = Duration::from_secs(30);

fn credentials(opts: &MountOptions) -> Credentials {
    match (&opts.username, &opts.password) {
        (Some(username), Some(password)) => Credentials::UserPass {
            username: username.clone(),
            password: password.clone(),
        },
        _ if opts.ssh_key.exists() => Credentials::Ssh {
            key_path: opts.ssh_key.clone(),
        },
        _ => Credentials::None,
    }
}

fn apply_open_file_limit(limit: i64) -> std::io::Result<()> {
    if limit < 0 {
        return Ok(());
    }
    let limit = limit as u64;
    nix::sys::resource::setrlimit(nix::sys::resource::Resource::RLIMIT_NOFILE, limit, limit)
        .map_err(|e| std::io::Error::other(e.to_string()))
}

/// Run the mount: clone the repository, start the background workers, serve
/// FUSE requests until the kernel tears the mount down, then clean up.
///
/// # Errors
/// Returns [`GitFsError`] if the clone, router construction, or the FUSE
/// mount syscall itself fails.
pub fn run(opts: &MountOptions) -> Result<(), GitFsError> {
    apply_open_file_limit(opts.max_open_files)?;

    let creds = credentials(opts);
    let repo = if opts.repo_path.join(".git").is_dir() {
        Repository::open(&opts.repo_path, creds)?
    } else {
        Repository::clone(&opts.remote_url, &opts.repo_path, &opts.branch, creds)?
    };
    let repo = Arc::new(repo);

    let branch = if opts.branch.is_empty() {
        repo.current_branch()?
    } else {
        opts.branch.clone()
    };

    let ignore = Arc::new(CachedIgnore::new(
        repo.repo_path(),
        opts.ignore_file.as_deref(),
        &opts.hard_ignore.iter().map(String::as_str).collect::<Vec<_>>(),
    ));

    let mut lfs = GitLfs::new(repo.repo_path());
    lfs.enabled = true;
    let lfs: Arc<dyn gitfs_lfs::LfsHook> = Arc::new(lfs);

    let queue = Arc::new(CommitQueue::default());
    let state = Arc::new(SyncState::new());

    let mount_time = mount_epoch_seconds();
    let router = Arc::new(Router::new(
        Arc::clone(&repo),
        ignore,
        lfs,
        Arc::clone(&queue),
        Arc::clone(&state),
        format!("/{}", opts.current_path),
        format!("/{}", opts.history_path),
        opts.max_size,
        opts.uid,
        opts.gid,
        mount_time,
    )?);
    router.refresh_commit_cache(&branch)?;

    let identity = Signature::new(opts.committer_name.clone(), opts.committer_email.clone());
    let sync_worker = SyncWorker::new(
        Arc::clone(&repo),
        Arc::clone(&queue),
        Arc::clone(&state),
        SyncWorkerConfig {
            remote: "origin".to_owned(),
            branch: branch.clone(),
            author: identity.clone(),
            committer: identity,
            idle_timeout: Duration::from_secs(opts.merge_timeout_secs.max(1)),
        },
    );
    let fetch_worker = FetchWorker::new(
        Arc::clone(&repo),
        Arc::clone(&state),
        FetchWorkerConfig {
            remote: "origin".to_owned(),
            branch: branch.clone(),
            idle_timeout: Duration::from_secs(opts.idle_fetch_timeout_secs.max(1)),
        },
    );

    let sync_handle = thread::Builder::new()
        .name("gitfs-sync".to_owned())
        .spawn(move || sync_worker.work())
        .map_err(GitFsError::Io)?;
    let fetch_handle = thread::Builder::new()
        .name("gitfs-fetch".to_owned())
        .spawn(move || fetch_worker.work())
        .map_err(GitFsError::Io)?;

    let history_state = Arc::clone(&state);
    let history_router = Arc::clone(&router);
    let history_branch = branch.clone();
    let history_handle = thread::Builder::new()
        .name("gitfs-history".to_owned())
        .spawn(move || {
            while !history_state.is_shutting_down() {
                thread::sleep(HISTORY_REFRESH_INTERVAL);
                if let Err(err) = history_router.refresh_commit_cache(&history_branch) {
                    tracing::warn!(error = %err, "failed to refresh history view");
                }
            }
        })
        .map_err(GitFsError::Io)?;

    let options = mount_options(opts)?;
    let filesystem = GitFsFilesystem::new(Arc::clone(&router));

    tracing::info!(mount_point = %opts.mount_point.display(), remote = %opts.remote_url, "mounting");
    let mount_result = fuser::mount2(filesystem, &opts.mount_point, &options).map_err(|err| GitFsError::MountFailed {
        mount_point: opts.mount_point.display().to_string(),
        message: err.to_string(),
    });

    state.begin_shutdown();
    let _ = sync_handle.join();
    let _ = fetch_handle.join();
    let _ = history_handle.join();

    mount_result?;

    if clean_unmount(&opts.mount_point) {
        let _ = std::fs::remove_dir_all(&opts.repo_path);
    }
    Ok(())
}

fn mount_options(opts: &MountOptions) -> Result<Vec<MountOption>, GitFsError> {
    if opts.allow_other && opts.allow_root {
        return Err(GitFsError::InvalidOption {
            key: "allow_other/allow_root".to_owned(),
            message: "allow_other and allow_root are mutually exclusive".to_owned(),
        });
    }
    let mut options = vec![
        MountOption::FSName(opts.remote_url.clone()),
        MountOption::Subtype("gitfs".to_owned()),
        MountOption::RW,
        MountOption::DefaultPermissions,
    ];
    if opts.allow_other {
        options.push(MountOption::AllowOther);
    }
    if opts.allow_root {
        options.push(MountOption::AllowRoot);
    }
    Ok(options)
}

/// Whether the mount point is no longer mounted, meaning the kernel returned
/// from `fuser::mount2` because of a clean `umount` rather than a crash or
/// forced kill — only then is it safe to delete the clone's staging
/// directory, per the exit-behavior contract.
fn clean_unmount(mount_point: &Path) -> bool {
    std::fs::read_to_string("/proc/self/mountinfo")
        .map(|info| !info.lines().any(|line| line.contains(&mount_point.display().to_string())))
        .unwrap_or(true)
}

fn mount_epoch_seconds() -> i64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_secs() as i64)
        .unwrap_or(0)
}
