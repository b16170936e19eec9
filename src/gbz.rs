// src/gbz.rs

// Bridge to the gbz-base command line tools. A GBZ graph is never parsed here:
// `gbz2db` builds the companion database once and `query` writes the sub-graph
// of one reference interval as GFA, which the rest of the crate then reads.

use std::env;
use std::ffi::OsString;
use std::fs::File;
use std::io;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use log::{debug, error, info};

use crate::error::{PanctError, Result};
use crate::io::{with_appended_suffix, ScratchFile};
use crate::progress::spinner_progress;
use crate::region::Region;

pub const GBZ2DB: &str = "gbz2db";
pub const QUERY: &str = "query";

/// One external command: program, arguments and where its stdout should go.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    pub program: String,
    pub args: Vec<String>,
    /// Captured stdout; inherited from the parent when `None`.
    pub stdout: Option<PathBuf>,
}

impl Invocation {
    pub fn new<I, S>(program: &str, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            program: program.to_string(),
            args: args.into_iter().map(Into::into).collect(),
            stdout: None,
        }
    }

    pub fn capture_to(mut self, path: impl Into<PathBuf>) -> Self {
        self.stdout = Some(path.into());
        self
    }

    pub fn command_line(&self) -> String {
        let mut line = self.program.clone();
        for arg in &self.args {
            line.push(' ');
            line.push_str(arg);
        }
        line
    }
}

/// Outcome of a finished [`Invocation`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolStatus {
    pub success: bool,
    pub code: Option<i32>,
    pub output: Option<PathBuf>,
}

/// Runs external programs. Swapped for a recording fake in tests.
pub trait CommandRunner {
    /// Run to completion. `Err` only when the program could not be started.
    fn run(&self, invocation: &Invocation) -> io::Result<ToolStatus>;

    /// Resolve a program name to an executable, if there is one.
    fn locate(&self, program: &str) -> Option<PathBuf>;
}

/// [`CommandRunner`] over `std::process::Command` and the `PATH` variable.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemRunner;

impl CommandRunner for SystemRunner {
    fn run(&self, invocation: &Invocation) -> io::Result<ToolStatus> {
        debug!("Running {}", invocation.command_line());
        let mut command = Command::new(&invocation.program);
        command.args(&invocation.args).stdin(Stdio::null());
        if let Some(path) = &invocation.stdout {
            command.stdout(File::create(path)?);
        }
        let status = command.status()?;
        Ok(ToolStatus {
            success: status.success(),
            code: status.code(),
            output: invocation.stdout.clone(),
        })
    }

    fn locate(&self, program: &str) -> Option<PathBuf> {
        let candidate = Path::new(program);
        if candidate.components().count() > 1 {
            return candidate.is_file().then(|| candidate.to_path_buf());
        }
        let paths: OsString = env::var_os("PATH")?;
        env::split_paths(&paths)
            .map(|dir| dir.join(program))
            .find(|path| path.is_file())
    }
}

/// GBZ operations implemented by external tools.
pub struct GbzTools<R> {
    runner: R,
}

impl Default for GbzTools<SystemRunner> {
    fn default() -> Self {
        Self::new(SystemRunner)
    }
}

impl<R: CommandRunner> GbzTools<R> {
    pub fn new(runner: R) -> Self {
        Self { runner }
    }

    pub fn runner(&self) -> &R {
        &self.runner
    }

    fn missing_tool(&self) -> Option<&'static str> {
        [GBZ2DB, QUERY]
            .into_iter()
            .find(|tool| self.runner.locate(tool).is_none())
    }

    /// True when both tools resolve. Logs the first one that does not.
    pub fn tooling_available(&self) -> bool {
        match self.missing_tool() {
            Some(tool) => {
                error!("Could not find {}; is gbz-base installed?", tool);
                false
            }
            None => true,
        }
    }

    pub fn require_tooling(&self) -> Result<()> {
        match self.missing_tool() {
            Some(tool) => Err(PanctError::MissingTool {
                tool: tool.to_string(),
            }),
            None => Ok(()),
        }
    }

    /// Make sure `<gbz>.db` exists, building it when it does not.
    pub fn ensure_indexed(&self, gbz: &Path) -> bool {
        let db = with_appended_suffix(gbz, ".db");
        if db.exists() {
            debug!("Using existing index {}", db.display());
            return true;
        }
        info!("Indexing {} to {}", gbz.display(), db.display());
        let pb = spinner_progress("gbz2db", format!("indexing {}", gbz.display()));
        let invocation = Invocation::new(GBZ2DB, [gbz.to_string_lossy()]);
        let result = self.runner.run(&invocation);
        pb.finish_and_clear();
        match result {
            Ok(status) if status.success => {
                if db.exists() {
                    true
                } else {
                    error!("{} finished but {} is missing", GBZ2DB, db.display());
                    false
                }
            }
            Ok(status) => {
                error!("{} exited with {:?}", invocation.command_line(), status.code);
                false
            }
            Err(err) => {
                error!("Could not run {}: {}", GBZ2DB, err);
                false
            }
        }
    }

    /// Extract the sub-graph of `region`, with coordinates on the paths of
    /// `reference`, into a scratch GFA file. `None` when `query` fails.
    pub fn extract_region(
        &self,
        gbz: &Path,
        region: &Region,
        reference: &str,
    ) -> Result<Option<ScratchFile>> {
        let scratch = ScratchFile::new()?;
        let invocation = Invocation::new(
            QUERY,
            [
                "--sample".to_string(),
                reference.to_string(),
                "--contig".to_string(),
                region.chrom.clone(),
                "--interval".to_string(),
                region.interval(),
                gbz.to_string_lossy().into_owned(),
            ],
        )
        .capture_to(scratch.path());

        let pb = spinner_progress("query", format!("extracting {}", region));
        let result = self.runner.run(&invocation);
        pb.finish_and_clear();
        let status = result?;
        if !status.success {
            error!(
                "{} exited with {:?}",
                invocation.command_line(),
                status.code
            );
            return Ok(None);
        }
        Ok(Some(scratch))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::collections::HashSet;

    struct FakeRunner {
        tools: HashSet<&'static str>,
        succeed: bool,
        calls: RefCell<Vec<Invocation>>,
    }

    impl FakeRunner {
        fn new(tools: &[&'static str], succeed: bool) -> Self {
            Self {
                tools: tools.iter().copied().collect(),
                succeed,
                calls: RefCell::new(Vec::new()),
            }
        }
    }

    impl CommandRunner for FakeRunner {
        fn run(&self, invocation: &Invocation) -> io::Result<ToolStatus> {
            self.calls.borrow_mut().push(invocation.clone());
            if self.succeed {
                if let Some(path) = &invocation.stdout {
                    std::fs::write(path, "S\t1\tACGT\n")?;
                }
            }
            Ok(ToolStatus {
                success: self.succeed,
                code: Some(if self.succeed { 0 } else { 1 }),
                output: invocation.stdout.clone(),
            })
        }

        fn locate(&self, program: &str) -> Option<PathBuf> {
            self.tools
                .contains(program)
                .then(|| PathBuf::from("/usr/bin").join(program))
        }
    }

    #[test]
    fn test_tooling_checks() {
        let tools = GbzTools::new(FakeRunner::new(&[GBZ2DB, QUERY], true));
        assert!(tools.tooling_available());
        assert!(tools.require_tooling().is_ok());

        let tools = GbzTools::new(FakeRunner::new(&[GBZ2DB], true));
        assert!(!tools.tooling_available());
        match tools.require_tooling() {
            Err(PanctError::MissingTool { tool }) => assert_eq!(tool, QUERY),
            other => panic!("expected MissingTool, got {:?}", other),
        }
    }

    #[test]
    fn test_ensure_indexed_skips_existing_db() {
        let dir = tempfile::tempdir().unwrap();
        let gbz = dir.path().join("graph.gbz");
        std::fs::write(dir.path().join("graph.gbz.db"), "").unwrap();
        let tools = GbzTools::new(FakeRunner::new(&[GBZ2DB, QUERY], true));
        assert!(tools.ensure_indexed(&gbz));
        assert!(tools.runner().calls.borrow().is_empty());
    }

    #[test]
    fn test_ensure_indexed_runs_gbz2db() {
        let dir = tempfile::tempdir().unwrap();
        let gbz = dir.path().join("graph.gbz");
        let tools = GbzTools::new(FakeRunner::new(&[GBZ2DB, QUERY], false));
        assert!(!tools.ensure_indexed(&gbz));
        let calls = tools.runner().calls.borrow();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].program, GBZ2DB);
        assert_eq!(calls[0].args, vec![gbz.to_string_lossy().into_owned()]);
    }

    #[test]
    fn test_extract_region_arguments() {
        let tools = GbzTools::new(FakeRunner::new(&[GBZ2DB, QUERY], true));
        let region: Region = "chr1:100-200".parse().unwrap();
        let scratch = tools
            .extract_region(Path::new("graph.gbz"), &region, "GRCh38")
            .unwrap()
            .unwrap();
        assert_eq!(std::fs::read_to_string(scratch.path()).unwrap(), "S\t1\tACGT\n");

        let calls = tools.runner().calls.borrow();
        assert_eq!(calls[0].program, QUERY);
        assert_eq!(
            calls[0].args,
            vec!["--sample", "GRCh38", "--contig", "chr1", "--interval", "100..200", "graph.gbz"]
        );
        assert_eq!(calls[0].stdout.as_deref(), Some(scratch.path()));
    }

    #[test]
    fn test_extract_region_failure_is_none() {
        let tools = GbzTools::new(FakeRunner::new(&[GBZ2DB, QUERY], false));
        let region: Region = "chr1:100-200".parse().unwrap();
        assert!(tools
            .extract_region(Path::new("graph.gbz"), &region, "GRCh38")
            .unwrap()
            .is_none());
    }

    #[test]
    fn test_system_runner_locate() {
        assert!(SystemRunner.locate("definitely-not-a-real-tool-xyz").is_none());
    }
}
