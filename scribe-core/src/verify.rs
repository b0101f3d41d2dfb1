//! Verification collaborator: compile and run one candidate test.
//!
//! [`CommandVerifier`] stages the candidate at its destination path, runs
//! the configured build command, and restores whatever was at that path
//! before. The orchestrator writes the final artifact itself once a
//! candidate passes.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;

use tokio::io::AsyncReadExt;
use tracing::{debug, warn};

use crate::artifact::TestArtifact;
use crate::config::VerifySection;
use crate::error::VerifyError;

/// Placeholder in the verify command replaced by the test class name.
pub const TEST_PLACEHOLDER: &str = "{test}";

/// Result of one verification run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Verification {
    pub success: bool,
    /// Combined stdout and stderr, or a note explaining why the build did not finish.
    pub log: String,
}

#[async_trait::async_trait]
pub trait Verifier: Send + Sync + std::fmt::Debug {
    /// Compile and run the candidate. `Err` means the build tool itself
    /// could not be run; a failing build is `Ok` with `success == false`.
    async fn verify(&self, artifact: &TestArtifact) -> Result<Verification, VerifyError>;
}

/// Runs an external build command in the project root.
#[derive(Debug, Clone)]
pub struct CommandVerifier {
    project_root: PathBuf,
    command: Vec<String>,
    success_marker: Option<String>,
    timeout: Duration,
}

impl CommandVerifier {
    pub fn new(project_root: PathBuf, command: Vec<String>, timeout: Duration) -> Self {
        Self {
            project_root,
            command,
            success_marker: None,
            timeout,
        }
    }

    pub fn from_config(project_root: &Path, verify: &VerifySection) -> Self {
        Self {
            project_root: project_root.to_path_buf(),
            command: verify.command.clone(),
            success_marker: verify.success_marker.clone(),
            timeout: Duration::from_secs(verify.timeout_secs),
        }
    }

    #[must_use]
    pub fn with_success_marker(mut self, marker: impl Into<String>) -> Self {
        self.success_marker = Some(marker.into());
        self
    }

    /// The command argv with `{test}` substituted.
    pub fn argv(&self, test_class: &str) -> Vec<String> {
        self.command
            .iter()
            .map(|arg| arg.replace(TEST_PLACEHOLDER, test_class))
            .collect()
    }

    async fn run_with_timeout(&self, argv: &[String]) -> Result<Verification, VerifyError> {
        let (program, args) = argv
            .split_first()
            .ok_or_else(|| VerifyError::Spawn("verify command is empty".to_string()))?;

        let mut cmd = tokio::process::Command::new(program);
        cmd.args(args)
            .current_dir(&self.project_root)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        // The build runs as its own group leader so a timeout can signal the whole tree.
        #[cfg(unix)]
        cmd.process_group(0);

        let mut child = cmd
            .spawn()
            .map_err(|e| VerifyError::Spawn(format!("{program}: {e}")))?;
        let pid = child.id();
        let stdout = child.stdout.take();
        let stderr = child.stderr.take();

        let finished = tokio::time::timeout(self.timeout, async {
            let (status, out, err) =
                tokio::try_join!(child.wait(), read_all(stdout), read_all(stderr))?;
            Ok::<_, std::io::Error>((status, out, err))
        })
        .await;

        match finished {
            Ok(Ok((status, out, err))) => {
                let mut log = String::from_utf8_lossy(&out).into_owned();
                log.push_str(&String::from_utf8_lossy(&err));
                let marker_ok = self
                    .success_marker
                    .as_deref()
                    .is_none_or(|marker| log.contains(marker));
                Ok(Verification {
                    success: status.success() && marker_ok,
                    log,
                })
            }
            Ok(Err(e)) => {
                terminate(&mut child, pid).await;
                Err(VerifyError::Io(e))
            }
            Err(_) => {
                warn!(timeout_secs = self.timeout.as_secs_f64(), "Verification timed out");
                terminate(&mut child, pid).await;
                Ok(Verification {
                    success: false,
                    log: format!(
                        "verification timed out after {}s",
                        self.timeout.as_secs_f64()
                    ),
                })
            }
        }
    }
}

async fn read_all<R>(pipe: Option<R>) -> std::io::Result<Vec<u8>>
where
    R: tokio::io::AsyncRead + Unpin,
{
    let mut buf = Vec::new();
    if let Some(mut pipe) = pipe {
        pipe.read_to_end(&mut buf).await?;
    }
    Ok(buf)
}

/// SIGKILL the build's process group, then kill and reap the leader.
async fn terminate(child: &mut tokio::process::Child, pid: Option<u32>) {
    #[cfg(unix)]
    if let Some(pgid) = pid.and_then(|p| i32::try_from(p).ok()) {
        use nix::errno::Errno;
        use nix::sys::signal::{Signal, killpg};
        use nix::unistd::Pid;

        match killpg(Pid::from_raw(pgid), Signal::SIGKILL) {
            Ok(()) | Err(Errno::ESRCH) => {}
            Err(e) => warn!(pgid, error = %e, "Cannot kill build process group"),
        }
    }
    #[cfg(not(unix))]
    let _ = pid;

    // Already-reaped leaders report an error here; nothing is left to do then.
    if let Err(e) = child.kill().await {
        debug!(error = %e, "Build process already exited");
    }
}

#[async_trait::async_trait]
impl Verifier for CommandVerifier {
    async fn verify(&self, artifact: &TestArtifact) -> Result<Verification, VerifyError> {
        let staged = StagedFile::stage(&artifact.path, &artifact.render())?;
        let argv = self.argv(&artifact.test_class);
        debug!(command = ?argv, path = %artifact.path.display(), "Running verification");

        let result = self.run_with_timeout(&argv).await;
        staged.restore()?;
        result
    }
}

/// A candidate written over whatever was at `path`; restores the previous
/// state on [`StagedFile::restore`] or on drop, including removing any
/// package directories staging had to create.
#[derive(Debug)]
struct StagedFile {
    path: PathBuf,
    previous: Option<Vec<u8>>,
    /// Directories created for the candidate, deepest first.
    created_dirs: Vec<PathBuf>,
    armed: bool,
}

impl StagedFile {
    fn stage(path: &Path, content: &str) -> std::io::Result<Self> {
        let previous = match std::fs::read(path) {
            Ok(bytes) => Some(bytes),
            Err(e) if e.kind() == ErrorKind::NotFound => None,
            Err(e) => return Err(e),
        };
        let created_dirs: Vec<PathBuf> = path
            .ancestors()
            .skip(1)
            .take_while(|dir| !dir.as_os_str().is_empty() && !dir.exists())
            .map(Path::to_path_buf)
            .collect();
        let staged = Self {
            path: path.to_path_buf(),
            previous,
            created_dirs,
            armed: true,
        };
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, content)?;
        Ok(staged)
    }

    fn restore(mut self) -> std::io::Result<()> {
        self.armed = false;
        self.put_back()
    }

    fn put_back(&self) -> std::io::Result<()> {
        match &self.previous {
            Some(bytes) => std::fs::write(&self.path, bytes)?,
            None => match std::fs::remove_file(&self.path) {
                Err(e) if e.kind() != ErrorKind::NotFound => return Err(e),
                _ => {}
            },
        }
        for dir in &self.created_dirs {
            // Stop at the first directory something else has since written into.
            if std::fs::remove_dir(dir).is_err() {
                break;
            }
        }
        Ok(())
    }
}

impl Drop for StagedFile {
    fn drop(&mut self) {
        if self.armed {
            if let Err(e) = self.put_back() {
                warn!(path = %self.path.display(), error = %e, "Cannot restore staged test file");
            }
        }
    }
}
