use super::config::SimulatorConfig;
use super::error::EngineError;
use super::stage::StageKind;
use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Read, Write};
use std::path::Path;
use std::process::{Command, Stdio};
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

pub const STDOUT_FILE: &str = "lammps.stdout";
pub const STDERR_FILE: &str = "lammps.stderr";

/// A prepared stage directory ready to be executed.
#[derive(Debug, Clone, Copy)]
pub struct SimulationJob<'a> {
    pub stage: StageKind,
    pub directory: &'a Path,
    pub input_file: &'a str,
    pub total_steps: u64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RunReport {
    pub elapsed: Duration,
    pub output_lines: usize,
}

/// The seam between the workflow and the external simulator.
///
/// Implementors execute a job whose directory already holds the input deck
/// and initial data file, forwarding every line of simulator output to
/// `on_output`. Returning `Ok` means the simulator exited successfully; the
/// workflow checks for `final.data` itself.
pub trait SimulatorRunner {
    fn run(
        &self,
        job: &SimulationJob<'_>,
        on_output: &mut dyn FnMut(&str),
    ) -> Result<RunReport, EngineError>;

    /// Human-readable command line, for logs.
    fn describe(&self) -> String;
}

/// Runs LAMMPS as a child process, optionally under an MPI launcher.
#[derive(Debug, Clone)]
pub struct ProcessRunner {
    config: SimulatorConfig,
}

impl ProcessRunner {
    pub fn new(config: SimulatorConfig) -> Self {
        Self { config }
    }

    /// `[launcher, -n, P, command, -i, input, extra...]`, or without the launcher part.
    pub fn argv(&self, input_file: &str) -> Vec<String> {
        let mut argv = Vec::new();
        if let Some(launcher) = &self.config.launcher {
            argv.push(launcher.clone());
            argv.push("-n".to_string());
            argv.push(self.config.processors.to_string());
        }
        argv.push(self.config.command.clone());
        argv.push("-i".to_string());
        argv.push(input_file.to_string());
        argv.extend(self.config.extra_args.iter().cloned());
        argv
    }
}

impl SimulatorRunner for ProcessRunner {
    fn run(
        &self,
        job: &SimulationJob<'_>,
        on_output: &mut dyn FnMut(&str),
    ) -> Result<RunReport, EngineError> {
        let argv = self.argv(job.input_file);
        let (program, args) = (&argv[0], &argv[1..]);

        let stdout_path = job.directory.join(STDOUT_FILE);
        let stderr_path = job.directory.join(STDERR_FILE);
        let stderr_file =
            File::create(&stderr_path).map_err(|e| EngineError::io(&stderr_path, e))?;
        let tee = File::create(&stdout_path).map_err(|e| EngineError::io(&stdout_path, e))?;

        info!(
            "Launching '{}' in {:?} for stage '{}'.",
            argv.join(" "),
            job.directory,
            job.stage.name()
        );
        let started = Instant::now();

        let mut child = Command::new(program)
            .args(args)
            .current_dir(job.directory)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::from(stderr_file))
            .spawn()
            .map_err(|e| EngineError::Launch {
                program: program.clone(),
                source: e,
            })?;

        let streamed = match child.stdout.take() {
            Some(stdout) => stream_output(stdout, tee, &stdout_path, on_output),
            None => Ok(0),
        };
        let output_lines = match streamed {
            Ok(n) => n,
            Err(e) => {
                warn!(
                    "Lost the output of stage '{}'; stopping the simulator.",
                    job.stage.name()
                );
                if let Err(kill_err) = child.kill() {
                    debug!("Failed to kill simulator: {}", kill_err);
                }
                let _ = child.wait();
                return Err(e);
            }
        };

        let status = child
            .wait()
            .map_err(|e| EngineError::io(job.directory, e))?;
        let elapsed = started.elapsed();
        debug!(
            "Stage '{}' simulator exited with {} after {:.1}s.",
            job.stage.name(),
            status,
            elapsed.as_secs_f64()
        );

        if !status.success() {
            return Err(EngineError::SimulatorFailed {
                stage: job.stage.name(),
                status: status.to_string(),
            });
        }

        Ok(RunReport {
            elapsed,
            output_lines,
        })
    }

    fn describe(&self) -> String {
        self.argv("<input>").join(" ")
    }
}

/// Copies simulator stdout line by line into `tee` and `on_output`.
///
/// Bytes that are not valid UTF-8 are replaced rather than treated as errors.
fn stream_output(
    stdout: impl Read,
    tee: File,
    tee_path: &Path,
    on_output: &mut dyn FnMut(&str),
) -> Result<usize, EngineError> {
    let mut reader = BufReader::new(stdout);
    let mut tee = BufWriter::new(tee);
    let mut buf = Vec::new();
    let mut lines = 0;
    loop {
        buf.clear();
        let read = reader
            .read_until(b'\n', &mut buf)
            .map_err(|e| EngineError::io(tee_path, e))?;
        if read == 0 {
            break;
        }
        let text = String::from_utf8_lossy(&buf);
        let line = text.trim_end_matches(['\n', '\r']);
        writeln!(tee, "{}", line).map_err(|e| EngineError::io(tee_path, e))?;
        on_output(line);
        lines += 1;
    }
    tee.flush().map_err(|e| EngineError::io(tee_path, e))?;
    Ok(lines)
}
