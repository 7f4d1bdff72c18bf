//! CLI subcommand handlers.

use crate::Commands;
use crate::ConfigAction;
use autofit_core::jobs::{JobFailure, JobState, JobStatusResponse};
use autofit_core::{
    JobId, JobService, PollPolicy, TaskType, TrainingRequest, load_config, wait_for_completion,
};
use std::path::{Path, PathBuf};

/// Handle a CLI subcommand.
pub async fn handle_command(command: Commands, workspace: &Path, quiet: bool) -> anyhow::Result<()> {
    match command {
        Commands::Train {
            dataset,
            target,
            task,
            user,
            json,
        } => handle_train(workspace, dataset, target, task, user, json, quiet).await,
        Commands::Status { id } => handle_status(workspace, &id).await,
        Commands::Config { action } => handle_config(action, workspace).await,
    }
}

async fn handle_train(
    workspace: &Path,
    dataset: PathBuf,
    target: String,
    task: TaskType,
    user: Option<String>,
    json: bool,
    quiet: bool,
) -> anyhow::Result<()> {
    let config = load_config(Some(workspace), None)
        .map_err(|e| anyhow::anyhow!("Configuration error: {}", e))?;
    let service = JobService::from_config(&config);

    let mut request = TrainingRequest::new(dataset, target, task);
    if let Some(user) = user {
        request = request.with_user(user);
    }
    let submitted = service.submit(request).await?;
    if !quiet {
        eprintln!("Submitted job {}", submitted.task_id);
    }

    let policy = PollPolicy::from(&config.poll);
    let status = wait_for_completion(&service, &submitted.task_id, &policy, |s| {
        if !quiet {
            print_update(s);
        }
    })
    .await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&status)?);
    } else {
        print_summary(&status);
    }
    match status.state {
        JobState::Failure(JobFailure { error_kind, message }) => {
            anyhow::bail!("Job failed ({error_kind}): {message}")
        }
        _ => Ok(()),
    }
}

async fn handle_status(workspace: &Path, id: &str) -> anyhow::Result<()> {
    let config = load_config(Some(workspace), None)
        .map_err(|e| anyhow::anyhow!("Configuration error: {}", e))?;
    let id: JobId = id.parse()?;
    let status = JobService::from_config(&config).status(&id).await?;
    println!("{}", serde_json::to_string_pretty(&status)?);
    Ok(())
}

async fn handle_config(action: ConfigAction, workspace: &Path) -> anyhow::Result<()> {
    match action {
        ConfigAction::Init => {
            let config_dir = workspace.join(".autofit");
            std::fs::create_dir_all(&config_dir)?;

            let config_path = config_dir.join("config.toml");
            if config_path.exists() {
                println!(
                    "Configuration file already exists at: {}",
                    config_path.display()
                );
                return Ok(());
            }

            let default_config = autofit_core::AutoFitConfig::default();
            let toml_str = toml::to_string_pretty(&default_config)?;
            std::fs::write(&config_path, &toml_str)?;
            println!(
                "Created default configuration at: {}",
                config_path.display()
            );
            Ok(())
        }
        ConfigAction::Show => {
            let config = load_config(Some(workspace), None)
                .map_err(|e| anyhow::anyhow!("Failed to load config: {}", e))?;
            let toml_str = toml::to_string_pretty(&config)?;
            println!("{}", toml_str);
            Ok(())
        }
    }
}

fn print_update(status: &JobStatusResponse) {
    match &status.state {
        JobState::Pending => eprintln!("  pending"),
        JobState::Progress(event) => eprintln!(
            "  [{}/{}] {} {}",
            event.current, event.total, event.step, event.model
        ),
        JobState::Success(_) => eprintln!("  done"),
        JobState::Failure(failure) => eprintln!("  failed: {}", failure.error_kind),
    }
}

fn print_summary(status: &JobStatusResponse) {
    let JobState::Success(outcome) = &status.state else {
        return;
    };
    println!(
        "Best model: {} ({} = {:.4})",
        outcome.best_model.model_name,
        outcome.best_model.metric.name(),
        outcome.best_model.best_score
    );
    for result in &outcome.all_results {
        println!(
            "  {:<28} {} {:.4}",
            result.model_name,
            result.metric.name(),
            result.best_score
        );
    }
    for failure in &outcome.failed_models {
        println!("  {:<28} failed: {}", failure.model_name, failure.error);
    }
}
