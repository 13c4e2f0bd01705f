//! `MergePdfs`: concatenate uploaded PDFs into one output blob.
//!
//! Inputs are copied out of the blob store into a per-job scratch
//! directory, merged by an external tool, and the result is stored back as
//! a new blob.

use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::{Map, Value, json};
use tokio::process::Command;
use tracing;

use toolhub_core::config::MergePdfsConfig;
use toolhub_core::error::{AppError, ErrorKind};
use toolhub_core::types::id::{BlobId, JobId};
use toolhub_entity::blob::NewBlob;

use crate::executor::{CommandContext, CommandHandler, HandlerError};

/// Registry key.
pub const COMMAND_NAME: &str = "MergePdfs";

const DEFAULT_OUTPUT_FILENAME: &str = "merged.pdf";
const PDF_CONTENT_TYPE: &str = "application/pdf";

/// Validated `MergePdfs` arguments.
#[derive(Debug, Clone, PartialEq)]
pub struct MergeArgs {
    pub file_ids: Vec<BlobId>,
    pub user_id: Option<String>,
    pub user_email: Option<String>,
    pub output_filename: String,
}

impl MergeArgs {
    /// Validate the raw argument map.
    pub fn parse(args: &Map<String, Value>) -> Result<Self, HandlerError> {
        let raw_ids = args
            .get("file_ids")
            .and_then(Value::as_array)
            .ok_or_else(|| HandlerError::Validation("file_ids must be a list".into()))?;

        if raw_ids.len() < 2 {
            return Err(HandlerError::Validation(format!(
                "file_ids must contain at least 2 entries, got {}",
                raw_ids.len()
            )));
        }

        let file_ids = raw_ids
            .iter()
            .map(|v| {
                let s = v.as_str().ok_or_else(|| {
                    HandlerError::Validation(format!("file_ids entries must be strings, got {v}"))
                })?;
                BlobId::parse(s)
                    .ok_or_else(|| HandlerError::Validation(format!("Invalid file ID: '{s}'")))
            })
            .collect::<Result<Vec<_>, _>>()?;

        let optional = |key: &str| -> Result<Option<String>, HandlerError> {
            match args.get(key) {
                None | Some(Value::Null) => Ok(None),
                Some(Value::String(s)) => Ok(Some(s.clone())),
                Some(other) => Err(HandlerError::Validation(format!(
                    "{key} must be a string, got {other}"
                ))),
            }
        };

        let output_filename = optional("output_filename")?
            .map(|name| sanitize_filename(&name))
            .filter(|name| !name.is_empty())
            .unwrap_or_else(|| DEFAULT_OUTPUT_FILENAME.to_string());

        Ok(Self {
            file_ids,
            user_id: optional("user_id")?,
            user_email: optional("user_email")?,
            output_filename,
        })
    }
}

/// Keep only the final path component and force a `.pdf` extension.
fn sanitize_filename(name: &str) -> String {
    let base = name
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or_default()
        .trim()
        .to_string();
    if base.is_empty() || base.to_lowercase().ends_with(".pdf") {
        base
    } else {
        format!("{base}.pdf")
    }
}

/// Merges PDFs with an external tool such as `qpdf`.
#[derive(Debug, Clone)]
pub struct MergePdfsHandler {
    config: MergePdfsConfig,
    temp_root: PathBuf,
}

impl MergePdfsHandler {
    /// Create a handler writing scratch files under `temp_root/merge`.
    pub fn new(config: MergePdfsConfig, temp_root: PathBuf) -> Self {
        Self { config, temp_root }
    }

    fn work_dir(&self, job_id: JobId) -> PathBuf {
        self.temp_root.join("merge").join(job_id.to_string())
    }

    /// Expand the argument template. `{inputs}` must stand alone and becomes
    /// one argument per input.
    pub fn substitute_args(&self, inputs: &[PathBuf], output: &Path) -> Vec<String> {
        let output_str = output.to_string_lossy();
        let output_dir = output
            .parent()
            .map(|p| p.to_string_lossy().to_string())
            .unwrap_or_default();

        self.config
            .args
            .iter()
            .flat_map(|arg| {
                if arg == "{inputs}" {
                    inputs
                        .iter()
                        .map(|p| p.to_string_lossy().to_string())
                        .collect::<Vec<_>>()
                } else {
                    vec![
                        arg.replace("{output}", &output_str)
                            .replace("{output_dir}", &output_dir),
                    ]
                }
            })
            .collect()
    }

    async fn merge(
        &self,
        ctx: &CommandContext<'_>,
        args: &MergeArgs,
        work_dir: &Path,
    ) -> Result<Value, HandlerError> {
        let mut inputs = Vec::with_capacity(args.file_ids.len());
        for (index, id) in args.file_ids.iter().enumerate() {
            let blob = ctx
                .blobs
                .fetch(*id)
                .await?
                .ok_or_else(|| HandlerError::Failed(format!("File {id} not found")))?;

            let path = work_dir.join(format!("input_{index:03}.pdf"));
            tokio::fs::write(&path, &blob.content).await.map_err(|e| {
                AppError::with_source(
                    ErrorKind::Storage,
                    format!("Failed to stage input {id}"),
                    e,
                )
            })?;
            inputs.push(path);
        }

        let output_path = work_dir.join("merged.pdf");
        self.run_tool(&inputs, &output_path).await?;

        let content = tokio::fs::read(&output_path).await.map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                HandlerError::Failed(format!(
                    "{} did not produce an output file",
                    self.config.program
                ))
            } else {
                AppError::with_source(ErrorKind::Storage, "Failed to read merged output", e).into()
            }
        })?;
        let size_bytes = content.len();

        let mut blob = NewBlob::new(args.output_filename.clone(), content)
            .content_type(PDF_CONTENT_TYPE)
            .meta("purpose", "merge_output")
            .meta("source_job_id", ctx.job_id.to_string());
        if let Some(user_id) = &args.user_id {
            blob = blob.meta("user_id", user_id.clone());
        }
        if let Some(user_email) = &args.user_email {
            blob = blob.meta("user_email", user_email.clone());
        }
        let output_id = ctx.blobs.store(blob).await?;

        tracing::info!(
            job_id = %ctx.job_id,
            output_id = %output_id,
            inputs = inputs.len(),
            size_bytes,
            "Merged PDFs"
        );

        Ok(json!({
            "output_id": output_id.to_string(),
            "filename": args.output_filename,
            "size_bytes": size_bytes,
            "input_count": inputs.len(),
        }))
    }

    async fn run_tool(&self, inputs: &[PathBuf], output: &Path) -> Result<(), HandlerError> {
        let args = self.substitute_args(inputs, output);
        tracing::debug!(program = %self.config.program, ?args, "Running merge tool");

        let mut cmd = Command::new(&self.config.program);
        cmd.args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let timeout = Duration::from_secs(self.config.timeout_seconds);
        let output = match tokio::time::timeout(timeout, cmd.output()).await {
            Err(_) => {
                return Err(HandlerError::Failed(format!(
                    "{} timed out after {} seconds",
                    self.config.program, self.config.timeout_seconds
                )));
            }
            Ok(Err(e)) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(HandlerError::Failed(format!(
                    "Merge tool '{}' not found",
                    self.config.program
                )));
            }
            Ok(Err(e)) => {
                return Err(AppError::with_source(
                    ErrorKind::ExternalService,
                    format!("Failed to run {}", self.config.program),
                    e,
                )
                .into());
            }
            Ok(Ok(output)) => output,
        };

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            let code = output
                .status
                .code()
                .map_or_else(|| "signal".to_string(), |c| c.to_string());
            return Err(HandlerError::Failed(format!(
                "{} exited with {}: {}",
                self.config.program,
                code,
                stderr.trim().chars().take(2000).collect::<String>()
            )));
        }
        Ok(())
    }
}

#[async_trait]
impl CommandHandler for MergePdfsHandler {
    fn name(&self) -> &str {
        COMMAND_NAME
    }

    async fn handle(&self, ctx: CommandContext<'_>) -> Result<Value, HandlerError> {
        let args = MergeArgs::parse(ctx.arguments)?;

        let work_dir = self.work_dir(ctx.job_id);
        tokio::fs::create_dir_all(&work_dir).await.map_err(|e| {
            AppError::with_source(
                ErrorKind::Storage,
                format!("Failed to create {}", work_dir.display()),
                e,
            )
        })?;

        let result = self.merge(&ctx, &args, &work_dir).await;

        if let Err(e) = tokio::fs::remove_dir_all(&work_dir).await {
            tracing::warn!(path = %work_dir.display(), error = %e, "Failed to remove merge scratch directory");
        }
        result
    }
}
