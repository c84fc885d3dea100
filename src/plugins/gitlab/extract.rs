//! Raw payload extraction

use super::models::{
    ApiDeployment, ApiProject, GitlabDeployment, GitlabProject, RAW_DEPLOYMENT_TABLE,
    RAW_PROJECT_TABLE, TOOL_DEPLOYMENT_TABLE, TOOL_PROJECT_TABLE,
};
use super::GitlabTaskData;
use crate::convert::DataConverter;
use crate::error::Result;
use crate::store::RowFilter;
use crate::subtask::{SubTaskContext, SubTaskMeta};
use crate::types::DomainType;

pub const EXTRACT_PROJECT: SubTaskMeta<GitlabTaskData> = SubTaskMeta {
    name: "ExtractProject",
    entry_point: extract_project,
    enabled_by_default: true,
    description: "Extract raw project data into tool layer table _tool_gitlab_projects",
    domain_types: &[DomainType::Code, DomainType::Cicd],
    dependencies: &[],
};

pub const EXTRACT_DEPLOYMENT: SubTaskMeta<GitlabTaskData> = SubTaskMeta {
    name: "ExtractDeployment",
    entry_point: extract_deployment,
    enabled_by_default: true,
    description: "Extract raw deployment data into tool layer table _tool_gitlab_deployments",
    domain_types: &[DomainType::Cicd],
    dependencies: &[],
};

fn extract_project(ctx: &SubTaskContext<'_, GitlabTaskData>) -> Result<()> {
    let data = ctx.data;
    let raw = data.raw_args(RAW_PROJECT_TABLE)?;
    let input = ctx
        .store
        .cursor(RAW_PROJECT_TABLE, &RowFilter::new().lineage(raw.batch()))?;
    let connection_id = data.options.connection_id;

    let stats = DataConverter::new(ctx.store, &raw, input, |api: &ApiProject| {
        Ok(vec![GitlabProject::from_api(connection_id, api)])
    })
    .with_outputs([TOOL_PROJECT_TABLE])
    .with_batch_size(data.batch_size)
    .with_cancellation(ctx.cancel.clone())
    .execute()?;

    tracing::info!(subtask = ctx.subtask, rows = stats.rows_read, "projects extracted");
    Ok(())
}

fn extract_deployment(ctx: &SubTaskContext<'_, GitlabTaskData>) -> Result<()> {
    let data = ctx.data;
    let raw = data.raw_args(RAW_DEPLOYMENT_TABLE)?;
    let input = ctx
        .store
        .cursor(RAW_DEPLOYMENT_TABLE, &RowFilter::new().lineage(raw.batch()))?;
    let options = data.options;

    let stats = DataConverter::new(ctx.store, &raw, input, |api: &ApiDeployment| {
        Ok(vec![GitlabDeployment::from_api(
            options.connection_id,
            options.project_id,
            api,
        )])
    })
    .with_outputs([TOOL_DEPLOYMENT_TABLE])
    .with_batch_size(data.batch_size)
    .with_cancellation(ctx.cancel.clone())
    .execute()?;

    tracing::info!(
        subtask = ctx.subtask,
        rows = stats.rows_read,
        "deployments extracted"
    );
    Ok(())
}
