//! Given steps for product sign-off BDD scenarios.

use super::world::{SignoffWorld, change_opened_payload, run_async};
use eyre::WrapErr;
use product_signoff::{
    integration::{
        domain::{AccountId, BoardId, ColumnId, ServiceKind},
        ports::{BoardSummary, ColumnSummary, ExternalApiError},
        services::WatchColumnRequest,
    },
    reconciler::{LinkReviewRequest, LinkTarget, PullRequestEvent},
    review::domain::ChangeId,
};
use rstest_bdd_macros::given;

const BOARD: &str = "board-1";

#[given(r#"an account that registered repository {repo:u64} and watches column "{column}""#)]
fn onboarded_account(
    world: &mut SignoffWorld,
    repo: u64,
    column: String,
) -> Result<(), eyre::Report> {
    let owner = AccountId::new();
    run_async(
        world
            .registry
            .register_credential(owner, ServiceKind::CodeReview, "gh-token"),
    )
    .wrap_err("link code-review service")?;
    run_async(
        world
            .registry
            .register_credential(owner, ServiceKind::TaskBoard, "tr-token"),
    )
    .wrap_err("link task board")?;
    run_async(world.registry.register_repository(owner, repo)).wrap_err("register repository")?;

    world.task_board.add_board(
        BoardSummary {
            id: BoardId::new(BOARD)?,
            name: "Product".to_owned(),
        },
        vec![ColumnSummary {
            id: ColumnId::new(column.as_str())?,
            name: "Accepted".to_owned(),
        }],
    )?;
    run_async(
        world
            .registry
            .watch_column(WatchColumnRequest::new(owner, BOARD, column)),
    )
    .wrap_err("watch column")?;

    world.owner = Some(owner);
    Ok(())
}

#[given(r#"change {change:u64} on branch "{branch}" was opened in repository {repo:u64}"#)]
fn change_was_opened(
    world: &mut SignoffWorld,
    change: u64,
    branch: String,
    repo: u64,
) -> Result<(), eyre::Report> {
    let event = PullRequestEvent::from_slice(&change_opened_payload(change, &branch, repo))?;
    run_async(world.reconciler.handle_change_opened(&event))
        .wrap_err_with(|| format!("open change {change}"))?;
    Ok(())
}

#[given(r#"change {change:u64} is linked to column "{column}""#)]
fn change_is_linked(
    world: &mut SignoffWorld,
    change: u64,
    column: String,
) -> Result<(), eyre::Report> {
    let request = LinkReviewRequest {
        requested_by: world.owner()?,
        target: LinkTarget::Change(ChangeId::new(change)?),
        column_id: ColumnId::new(column)?,
    };
    run_async(world.reconciler.link_review(&request))
        .wrap_err_with(|| format!("link change {change}"))?;
    Ok(())
}

#[given("the code-review service is unavailable")]
fn code_review_unavailable(world: &mut SignoffWorld) -> Result<(), eyre::Report> {
    world
        .code_review
        .fail_with(ExternalApiError::UnexpectedStatus {
            status: 503,
            body: "maintenance".to_owned(),
        })?;
    Ok(())
}
