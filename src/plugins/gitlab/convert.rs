//! Tool to domain conversion

use super::models::{
    GitlabDeployment, GitlabProject, RAW_DEPLOYMENT_TABLE, RAW_PROJECT_TABLE,
    TOOL_DEPLOYMENT_TABLE, TOOL_PROJECT_TABLE,
};
use super::GitlabTaskData;
use crate::convert::DataConverter;
use crate::didgen::DomainIdGenerator;
use crate::domain::{CicdDeploymentCommit, CicdScope, DomainRecord, OutputKind};
use crate::error::{Error, Result};
use crate::rules::{get_result, get_status};
use crate::subtask::{SubTaskContext, SubTaskMeta};
use crate::types::DomainType;

pub const CONVERT_PROJECT: SubTaskMeta<GitlabTaskData> = SubTaskMeta {
    name: "ConvertProject",
    entry_point: convert_project,
    enabled_by_default: true,
    description: "Convert tool layer table _tool_gitlab_projects into domain layer table cicd_scopes",
    domain_types: &[DomainType::Cicd],
    dependencies: &["ExtractProject"],
};

pub const CONVERT_DEPLOYMENT: SubTaskMeta<GitlabTaskData> = SubTaskMeta {
    name: "ConvertDeployment",
    entry_point: convert_deployment,
    enabled_by_default: true,
    description: "Convert gitlab deployment from tool layer to domain layer",
    domain_types: &[DomainType::Cicd],
    dependencies: &["ExtractDeployment", "ExtractProject"],
};

fn convert_project(ctx: &SubTaskContext<'_, GitlabTaskData>) -> Result<()> {
    let data = ctx.data;
    let raw = data.raw_args(RAW_PROJECT_TABLE)?;
    let input = ctx.store.cursor(TOOL_PROJECT_TABLE, &data.scope_filter())?;
    let scope_ids = DomainIdGenerator::of::<GitlabProject>();

    let stats = DataConverter::new(ctx.store, &raw, input, |project: &GitlabProject| {
        let scope = CicdScope {
            id: scope_ids.generate(project.connection_id, project.gitlab_id),
            name: project.path_with_namespace.clone(),
            description: project.description.clone(),
            url: project.web_url.clone(),
            created_date: project.created_date,
            updated_date: project.updated_date,
        };
        Ok(vec![DomainRecord::from(scope)])
    })
    .with_outputs([OutputKind::CicdScope.table()])
    .with_batch_size(data.batch_size)
    .with_cancellation(ctx.cancel.clone())
    .execute()?;

    tracing::info!(subtask = ctx.subtask, rows = stats.rows_read, "projects converted");
    Ok(())
}

fn convert_deployment(ctx: &SubTaskContext<'_, GitlabTaskData>) -> Result<()> {
    let data = ctx.data;
    let raw = data.raw_args(RAW_DEPLOYMENT_TABLE)?;
    let filter = data.scope_filter();

    let row = ctx
        .store
        .first(TOOL_PROJECT_TABLE, &filter)?
        .ok_or_else(|| {
            Error::not_found(
                "GitlabProject",
                format!(
                    "connection {} project {}",
                    data.options.connection_id, data.options.project_id
                ),
            )
        })?;
    let project: GitlabProject = serde_json::from_value(row.data)?;

    let input = ctx.store.cursor(TOOL_DEPLOYMENT_TABLE, &filter)?;
    let stats = DataConverter::new(ctx.store, &raw, input, |deployment: &GitlabDeployment| {
        Ok(deployment_to_domain(deployment, &project, data))
    })
    .with_outputs([
        OutputKind::CicdDeploymentCommit.table(),
        OutputKind::CicdDeployment.table(),
    ])
    .with_batch_size(data.batch_size)
    .with_cancellation(ctx.cancel.clone())
    .execute()?;

    tracing::info!(
        subtask = ctx.subtask,
        rows = stats.rows_read,
        records = stats.records_written,
        "deployments converted"
    );
    Ok(())
}

/// Map one tool deployment to its deployment commit and deployment
pub fn deployment_to_domain(
    deployment: &GitlabDeployment,
    project: &GitlabProject,
    data: &GitlabTaskData,
) -> Vec<DomainRecord> {
    let connection_id = data.options.connection_id;
    let ids = DomainIdGenerator::of::<GitlabDeployment>();
    let project_id =
        DomainIdGenerator::of::<GitlabProject>().generate(connection_id, data.options.project_id);
    let id = ids.generate(connection_id, deployment.deployment_id);

    let environment = match &data.environment {
        Some(table) => table.normalize(&deployment.environment),
        None => deployment.environment.clone(),
    };

    let commit = CicdDeploymentCommit {
        id: id.clone(),
        cicd_scope_id: project_id.clone(),
        cicd_deployment_id: id,
        name: format!("{}:{}", deployment.name, deployment.deployment_id),
        result: get_result(&data.result_rule, &deployment.status),
        status: get_status(&data.status_rule, &deployment.status),
        original_status: deployment.status.clone(),
        environment,
        original_environment: deployment.environment.clone(),
        created_date: Some(deployment.created_date),
        started_date: deployment.deployable_started_at,
        finished_date: deployment.deployable_finished_at,
        duration_sec: deployment.duration_sec(),
        commit_sha: deployment.sha.clone(),
        ref_name: deployment.ref_name.clone(),
        repo_id: project_id,
        repo_url: project.web_url.clone(),
    };
    let view = commit.to_deployment();

    vec![commit.into(), view.into()]
}
