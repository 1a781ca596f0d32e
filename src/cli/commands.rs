//! Command implementations for the comment-forest CLI.

use crate::{
    cli::utils::{read_forest, render_forest, require_file},
    config::{ClientConfig, EngineConfig},
    context::ContextKey,
    controller::{DiscussionController, Outcome, Submission},
    error::ForestError,
    service::RpcCommentService,
    session::Session,
    tree::{CommentId, DisplayPolicy},
    Result,
};
use std::path::Path;
use std::sync::Arc;
use tracing::{info, warn};

fn display_policy(config: &EngineConfig, keep_replies: bool) -> DisplayPolicy {
    if keep_replies {
        DisplayPolicy::KeepReplies
    } else {
        config.display_policy
    }
}

/// Builds a controller against the configured service and loads `context`.
async fn open(context: &ContextKey) -> Result<(DiscussionController, ClientConfig)> {
    let client = ClientConfig::from_env()?;
    let engine = EngineConfig::from_env()?;
    let service = Arc::new(RpcCommentService::new(client.rpc_url.clone()));
    let (controller, _events) = DiscussionController::new(service, engine)?;
    controller.load(context.clone()).await?;
    Ok((controller, client))
}

/// Waits for a submission and turns a rollback into an error.
async fn finish(submission: Submission) -> Result<()> {
    let kind = submission.kind();
    let target = submission.target();
    match submission.settled().await {
        Outcome::Confirmed(id) => {
            info!(kind = %kind, id = %id, "✅ Accepted by comment service");
            println!("{}", id);
            Ok(())
        }
        Outcome::RolledBack { reason } => {
            warn!(kind = %kind, comment = %target, "Change rolled back");
            Err(ForestError::RemoteRejected(reason))
        }
        Outcome::Discarded => Err(ForestError::ContextChanged),
    }
}

/// Execute show command
pub async fn show(context: &ContextKey, keep_replies: bool) -> Result<()> {
    let (controller, _) = open(context).await?;
    let policy = display_policy(controller.config(), keep_replies);
    let forest = controller.forest();
    info!(
        context = %context,
        comments = forest.node_count(),
        policy = %policy,
        "Loaded discussion"
    );
    print!("{}", render_forest(&forest, policy));
    Ok(())
}

/// Execute show-file command
pub fn show_file(file: &Path, keep_replies: bool) -> Result<()> {
    require_file(file)?;
    let config = EngineConfig::from_env()?;
    let forest = read_forest(file)?;
    info!(file = %file.display(), comments = forest.node_count(), "Read discussion file");
    print!("{}", render_forest(&forest, display_policy(&config, keep_replies)));
    Ok(())
}

/// Runs one mutating command against a freshly loaded context.
async fn mutate<F>(context: &ContextKey, submit: F) -> Result<()>
where
    F: FnOnce(&DiscussionController, &Session) -> Result<Submission>,
{
    let (controller, client) = open(context).await?;
    let session = client.require_session()?;
    let submission = submit(&controller, session)?;
    finish(submission).await
}

/// Execute comment command
pub async fn comment(context: &ContextKey, body: &str) -> Result<()> {
    mutate(context, |controller, session| {
        controller.submit_root_comment(session, body)
    })
    .await
}

/// Execute reply command
pub async fn reply(context: &ContextKey, parent: CommentId, body: &str) -> Result<()> {
    mutate(context, |controller, session| {
        controller.submit_reply(session, parent, body)
    })
    .await
}

/// Execute edit command
pub async fn edit(context: &ContextKey, id: CommentId, body: &str) -> Result<()> {
    mutate(context, |controller, session| {
        controller.submit_edit(session, id, body)
    })
    .await
}

/// Execute delete command
pub async fn delete(context: &ContextKey, id: CommentId) -> Result<()> {
    mutate(context, |controller, session| controller.submit_delete(session, id)).await
}

/// Execute restore command
pub async fn restore(context: &ContextKey, id: CommentId) -> Result<()> {
    mutate(context, |controller, session| controller.submit_restore(session, id)).await
}
