//! When steps for product sign-off BDD scenarios.

use super::world::{SignoffWorld, card_moved_payload, change_opened_payload, run_async};
use eyre::WrapErr;
use product_signoff::{
    integration::domain::ServiceKind,
    reconciler::{CardMovedEvent, PullRequestEvent},
};
use rstest_bdd_macros::when;

#[when(r#"change {change:u64} on branch "{branch}" is opened in repository {repo:u64}"#)]
fn change_is_opened(
    world: &mut SignoffWorld,
    change: u64,
    branch: String,
    repo: u64,
) -> Result<(), eyre::Report> {
    let event = PullRequestEvent::from_slice(&change_opened_payload(change, &branch, repo))?;
    run_async(world.reconciler.handle_change_opened(&event))
        .wrap_err_with(|| format!("deliver change-opened for change {change}"))?;
    Ok(())
}

#[when(r#""{actor}" moves a card into column "{column}""#)]
fn card_is_moved(
    world: &mut SignoffWorld,
    actor: String,
    column: String,
) -> Result<(), eyre::Report> {
    let event = CardMovedEvent::from_slice(&card_moved_payload(&actor, &column))?;
    world.last_card_moved = Some(run_async(world.reconciler.handle_column_card_moved(&event)));
    Ok(())
}

#[when("the account revokes its task-board link")]
fn account_revokes_task_board(world: &mut SignoffWorld) -> Result<(), eyre::Report> {
    let owner = world.owner()?;
    run_async(world.registry.revoke(owner, ServiceKind::TaskBoard))
        .wrap_err("revoke task board")?;
    Ok(())
}
