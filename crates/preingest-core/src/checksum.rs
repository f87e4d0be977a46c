//! Fixity verification of a collection's container file.

use std::path::Path;
use std::sync::Arc;
use std::time::SystemTime;

use chrono::{DateTime, Utc};

use crate::action::{ActionResult, ResultPayload, Summary};
use crate::error::{PreingestError, Result};
use crate::fixity::{ChecksumAlgorithm, FixityClient};
use crate::step::{diagnostic_trace, ActionRun, Step, StepBase, StepContext};

pub const CHECKSUM_STEP_NAME: &str = "ContainerChecksumHandler";

/// Outcome of asking for a digest. `Unavailable` is an ordinary value, not a
/// fault: an unknown algorithm or an empty answer from the service.
#[derive(Debug, PartialEq)]
enum Calculation {
    Digest(String),
    Unavailable,
}

struct Verdict {
    result: ActionResult,
    summary: Summary,
    data: Vec<String>,
}

/// Computes a digest of the container file through the remote fixity service
/// and optionally compares it with a digest delivered by the submitter.
pub struct ChecksumStep {
    base: StepBase,
    client: Arc<dyn FixityClient>,
    algorithm: String,
    expected: Option<String>,
}

impl ChecksumStep {
    pub fn new(
        ctx: StepContext,
        client: Arc<dyn FixityClient>,
        algorithm: impl Into<String>,
    ) -> Self {
        Self {
            base: StepBase::new(CHECKSUM_STEP_NAME, ctx),
            client,
            algorithm: algorithm.into(),
            expected: None,
        }
    }

    /// Digest to compare against. Blank values are treated as absent.
    pub fn with_expected(mut self, expected: Option<String>) -> Self {
        self.expected = expected
            .map(|e| e.trim().to_string())
            .filter(|e| !e.is_empty());
        self
    }

    pub fn algorithm(&self) -> &str {
        &self.algorithm
    }

    pub fn expected(&self) -> Option<&str> {
        self.expected.as_deref()
    }

    fn calculate(&self, run: &mut ActionRun, target: &Path) -> Result<Calculation> {
        if !target.is_file() || std::fs::File::open(target).is_err() {
            return Err(PreingestError::TargetNotFound(target.to_path_buf()));
        }

        let Some(algorithm) = ChecksumAlgorithm::parse(&self.algorithm) else {
            let message = format!(
                "Checksum {} not defined. No calculation available.",
                self.algorithm
            );
            tracing::warn!(process_id = %self.process_id(), "{message}");
            run.push_message(message);
            return Ok(Calculation::Unavailable);
        };

        run.executing(format!(
            "Calculate checksum for container '{}' with {algorithm}.",
            target.display()
        ));
        let digest = self.client.calculate(algorithm, target)?;
        let digest = digest.trim();
        if digest.is_empty() {
            return Ok(Calculation::Unavailable);
        }
        Ok(Calculation::Digest(digest.to_string()))
    }

    fn verdict(&self, digest: &str) -> Verdict {
        let mut data = vec![self.algorithm.clone(), digest.to_string()];
        let Some(expected) = self.expected.as_deref() else {
            return Verdict {
                result: ActionResult::Success,
                summary: Summary::new(1, 1, 0),
                data,
            };
        };

        let same = expected.eq_ignore_ascii_case(digest);
        data.push(format!(
            "{expected} {} {digest}",
            if same { "=" } else { "≠" }
        ));
        if same {
            Verdict {
                result: ActionResult::Success,
                summary: Summary::new(1, 1, 0),
                data,
            }
        } else {
            Verdict {
                result: ActionResult::Error,
                summary: Summary::new(1, 0, 1),
                data,
            }
        }
    }
}

impl Step for ChecksumStep {
    fn base(&self) -> &StepBase {
        &self.base
    }

    fn execute(&mut self) -> Result<ResultPayload> {
        let target = self.base.collection().target();
        tracing::info!(
            process_id = %self.base.process_id(),
            target = %target.display(),
            algorithm = %self.algorithm,
            service = %self.base.settings().services.utilities.base_url(),
            "calculate checksum"
        );

        let mut run = self.base.begin(format!(
            "Start calculate checksum for container '{}'.",
            target.display()
        ))?;
        let failure = format!(
            "Calculation checksum from file : '{}' failed!",
            target.display()
        );

        match self.calculate(&mut run, &target) {
            Ok(Calculation::Digest(digest)) => {
                let verdict = self.verdict(&digest);
                push_file_metadata(&mut run, &target);
                for data in verdict.data {
                    run.push_data(data);
                }
                Ok(run.complete(
                    verdict.result,
                    verdict.summary,
                    "Checksum calculation is done.",
                ))
            }
            Ok(Calculation::Unavailable) => {
                tracing::error!(process_id = %self.process_id(), "{failure}");
                let empty = PreingestError::FixityService(
                    "Calculation returned nothing or empty value!".to_string(),
                );
                run.push_message(failure);
                run.push_message("Calculation returned nothing or empty value!");
                run.push_message(diagnostic_trace(&empty));
                push_file_metadata(&mut run, &target);
                Ok(run.fail("Checksum calculation returned no value."))
            }
            Err(e) => {
                tracing::error!(process_id = %self.process_id(), error = %e, "{failure}");
                run.push_fault(failure, &e);
                push_file_metadata(&mut run, &target);
                Ok(run.fail("An exception occurred while calculating the checksum!"))
            }
        }
    }
}

// ---------------------------------------------------------------------------
// File metadata
// ---------------------------------------------------------------------------

fn format_time(time: std::io::Result<SystemTime>) -> String {
    match time {
        Ok(t) => DateTime::<Utc>::from(t).to_rfc3339(),
        Err(_) => "unavailable".to_string(),
    }
}

/// Audit lines describing `path`. Empty when the file cannot be inspected.
fn file_metadata(path: &Path) -> Vec<String> {
    let Ok(meta) = std::fs::metadata(path) else {
        return Vec::new();
    };
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let extension = path
        .extension()
        .map(|e| format!(".{}", e.to_string_lossy()))
        .unwrap_or_default();
    vec![
        format!("Name : {name}"),
        format!("Extension : {extension}"),
        format!("Size : {}", meta.len()),
        format!("CreationTime : {}", format_time(meta.created())),
        format!("LastAccessTime : {}", format_time(meta.accessed())),
        format!("LastWriteTime : {}", format_time(meta.modified())),
    ]
}

fn push_file_metadata(run: &mut ActionRun, path: &Path) {
    for line in file_metadata(path) {
        run.push_message(line);
    }
}
