use std::{
    path::{Path, PathBuf},
    process::{Command, Output},
};

use chrono::NaiveDate;
use tracing::{debug, info};

use crate::error::SyncError;

/// What [`Git::publish`] ended up doing.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Published {
    /// The file had no uncommitted changes; nothing was committed or pushed.
    NothingToDo,
    Pushed,
}

/// Stage, commit and push the updated page with the `git` binary.
///
/// This runs after the file has been written and never undoes that write: a failed push leaves
/// a local commit behind.
pub struct Git {
    workdir: PathBuf,
}

pub fn commit_message(today: NaiveDate) -> String {
    format!("Update publications - {}", today.format("%Y-%m-%d"))
}

impl Git {
    pub fn new(workdir: impl Into<PathBuf>) -> Self {
        Git {
            workdir: workdir.into(),
        }
    }

    fn run(&self, args: &[&str]) -> Result<Output, SyncError> {
        let step = format!("git {}", args.first().copied().unwrap_or_default());
        debug!(?args, workdir = %self.workdir.display(), "running git");
        Command::new("git")
            .args(args)
            .current_dir(&self.workdir)
            .output()
            .map_err(|e| SyncError::PublishFailed {
                step,
                detail: format!("could not run git: {e}"),
            })
    }

    /// Run a step that must succeed, and report it.
    fn step(&self, args: &[&str], description: &str) -> Result<(), SyncError> {
        let output = self.run(args)?;
        if !output.status.success() {
            return Err(SyncError::PublishFailed {
                step: format!("git {}", args[0]),
                detail: failure_detail(&output),
            });
        }
        info!("{description}");
        Ok(())
    }

    /// Whether `file` differs from what is staged.
    pub fn has_changes(&self, file: &Path) -> Result<bool, SyncError> {
        let file = file.to_string_lossy();
        let output = self.run(&["diff", "--quiet", "--", &file])?;
        match output.status.code() {
            Some(0) => Ok(false),
            Some(1) => Ok(true),
            _ => Err(SyncError::PublishFailed {
                step: "git diff".into(),
                detail: failure_detail(&output),
            }),
        }
    }

    pub fn publish(&self, file: &Path, today: NaiveDate) -> Result<Published, SyncError> {
        if !self.has_changes(file)? {
            return Ok(Published::NothingToDo);
        }
        let name = file.to_string_lossy();
        self.step(&["add", "--", &name], &format!("staged {name}"))?;
        self.step(&["commit", "-m", &commit_message(today)], "created commit")?;
        self.step(&["push"], "pushed to remote")?;
        Ok(Published::Pushed)
    }
}

fn failure_detail(output: &Output) -> String {
    let stderr = String::from_utf8_lossy(&output.stderr);
    let stderr = stderr.trim();
    if stderr.is_empty() {
        format!("exited with {}", output.status)
    } else {
        stderr.to_string()
    }
}
