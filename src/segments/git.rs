use crate::environment::Environment;
use crate::segments::{Properties, Segment};
use crate::utils::debug_with_context;
use futures::future::BoxFuture;
use futures::FutureExt;
use gix::Repository;
use serde::Serialize;
use serde_json::{json, Value};
use std::sync::Arc;
use tokio::task;

const SHA_LENGTH: usize = 7;

/// Counts parsed from `git status --porcelain`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct WorkingStatus {
    pub staged: u32,
    pub modified: u32,
    pub deleted: u32,
    pub untracked: u32,
    pub changed: bool,
    pub string: String,
}

impl WorkingStatus {
    pub fn from_porcelain(output: &str) -> Self {
        let mut status = WorkingStatus::default();
        for line in output.lines() {
            let mut codes = line.chars();
            let (Some(index), Some(worktree)) = (codes.next(), codes.next()) else {
                continue;
            };
            if index == '?' && worktree == '?' {
                status.untracked += 1;
                continue;
            }
            if index != ' ' {
                status.staged += 1;
            }
            match worktree {
                'M' => status.modified += 1,
                'D' => status.deleted += 1,
                _ => {}
            }
        }

        status.changed = status.staged + status.modified + status.deleted + status.untracked > 0;
        status.string = [
            ("+", status.staged),
            ("~", status.modified),
            ("-", status.deleted),
            ("?", status.untracked),
        ]
        .iter()
        .filter(|(_, count)| *count > 0)
        .map(|(mark, count)| format!("{}{}", mark, count))
        .collect::<Vec<_>>()
        .join(" ");
        status
    }
}

#[derive(Debug, Clone, Default)]
pub struct GitInfo {
    pub head: String,
    pub sha: Option<String>,
    pub detached: bool,
    pub repo_name: Option<String>,
    pub working: WorkingStatus,
}

#[derive(Default)]
pub struct Git {
    env: Option<Arc<dyn Environment>>,
    fetch_status: bool,
    info: GitInfo,
}

impl Git {
    async fn load(&mut self) -> bool {
        let Some(env) = self.env.clone() else {
            return false;
        };

        // Discovery walks parent directories; keep it off the async thread.
        let pwd = env.pwd().to_path_buf();
        let discovered = task::spawn_blocking(move || gix::discover(pwd).ok().map(|repo| read_repository(&repo))).await;
        self.info = match discovered {
            Ok(Some(info)) => info,
            Ok(None) => {
                debug_with_context("git", "Not in a git repository");
                return false;
            }
            Err(e) => {
                debug_with_context("git", &format!("repository lookup failed: {}", e));
                return false;
            }
        };

        if self.fetch_status {
            if let Some(output) = env
                .run_command("git", &["--no-optional-locks", "status", "--porcelain"])
                .await
            {
                self.info.working = WorkingStatus::from_porcelain(&output);
            }
        }

        debug_with_context(
            "git",
            &format!(
                "head={}, sha={:?}, detached={}, dirty={}",
                self.info.head, self.info.sha, self.info.detached, self.info.working.changed
            ),
        );
        true
    }
}

fn read_repository(repo: &Repository) -> GitInfo {
    let mut info = GitInfo::default();

    if let Ok(head) = repo.head_commit() {
        info.sha = Some(head.id().to_hex_with_len(SHA_LENGTH).to_string());
    }

    // An unborn branch has a name but no commit; a detached HEAD the reverse.
    match repo.head_name() {
        Ok(Some(name)) => info.head = name.shorten().to_string(),
        _ => {
            info.detached = true;
            info.head = info.sha.clone().unwrap_or_default();
        }
    }

    info.repo_name = repo
        .work_dir()
        .and_then(|path| path.file_name())
        .and_then(|name| name.to_str())
        .map(str::to_string);

    info
}

impl Segment for Git {
    fn init(&mut self, props: Properties, env: Arc<dyn Environment>) {
        self.fetch_status = props.get_bool("fetch_status", false);
        self.env = Some(env);
    }

    fn enabled(&mut self) -> BoxFuture<'_, bool> {
        self.load().boxed()
    }

    fn template(&self) -> &'static str {
        " {{ .HEAD }}{{ if .Working.Changed }} {{ .Working.String }}{{ end }} "
    }

    fn data(&self) -> Value {
        json!({
            "HEAD": self.info.head,
            "Sha": self.info.sha.clone().unwrap_or_default(),
            "RepoName": self.info.repo_name.clone().unwrap_or_default(),
            "Detached": self.info.detached,
            "Working": self.info.working,
            "Dirty": self.info.working.changed,
        })
    }
}
