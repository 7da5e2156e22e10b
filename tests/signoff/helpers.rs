//! Shared wiring for end-to-end sign-off tests.

use std::sync::Arc;

use eyre::WrapErr;
use mockable::DefaultClock;
use product_signoff::{
    integration::{
        adapters::memory::{
            InMemoryIntegrationRepository, RecordingCodeReviewClient, RecordingTaskBoardClient,
        },
        domain::{AccountId, BoardId, ColumnId, ServiceKind},
        ports::{BoardSummary, ColumnSummary},
        services::{IntegrationRegistryService, WatchColumnRequest},
    },
    reconciler::{
        CardMovedEvent, CardMovedOutcome, EventReconciler, FanOutReport, LinkReviewRequest,
        LinkTarget, PullRequestEvent, ReconcilerSettings,
    },
    review::{adapters::memory::InMemoryReviewStore, domain::ChangeId},
};
use rstest::fixture;
use serde_json::json;

/// Public callback URL registered for watched columns.
pub const CALLBACK_URL: &str = "https://signoff.example.com/trello/integration";

/// Status URL template used by every test repository.
pub const STATUSES_URL: &str = "https://api.github.com/repos/acme/shop/statuses/{sha}";

/// Board every test column lives on.
pub const BOARD: &str = "board-1";

/// Registry service over in-memory adapters.
pub type TestRegistry = IntegrationRegistryService<
    InMemoryIntegrationRepository,
    InMemoryReviewStore,
    RecordingCodeReviewClient,
    RecordingTaskBoardClient,
    DefaultClock,
>;

/// Reconciler over in-memory adapters.
pub type TestReconciler = EventReconciler<
    InMemoryIntegrationRepository,
    InMemoryReviewStore,
    RecordingCodeReviewClient,
    DefaultClock,
>;

/// Fully wired application over in-memory adapters.
pub struct Stack {
    pub registry_repository: Arc<InMemoryIntegrationRepository>,
    pub store: Arc<InMemoryReviewStore>,
    pub code_review: Arc<RecordingCodeReviewClient>,
    pub task_board: Arc<RecordingTaskBoardClient>,
    pub registry: TestRegistry,
    pub reconciler: Arc<TestReconciler>,
}

impl Stack {
    /// Wires a fresh application with default reconciler settings.
    #[must_use]
    pub fn new() -> Self {
        let registry_repository = Arc::new(InMemoryIntegrationRepository::new());
        let store = Arc::new(InMemoryReviewStore::new());
        let code_review = Arc::new(RecordingCodeReviewClient::new());
        let task_board = Arc::new(RecordingTaskBoardClient::new());
        let registry = IntegrationRegistryService::new(
            Arc::clone(&registry_repository),
            Arc::clone(&store),
            Arc::clone(&code_review),
            Arc::clone(&task_board),
            Arc::new(DefaultClock),
            CALLBACK_URL,
        );
        let reconciler = Arc::new(EventReconciler::new(
            Arc::clone(&registry_repository),
            Arc::clone(&store),
            Arc::clone(&code_review),
            Arc::new(DefaultClock),
            ReconcilerSettings::default(),
        ));
        Self {
            registry_repository,
            store,
            code_review,
            task_board,
            registry,
            reconciler,
        }
    }

    /// Links both services for a new account, registers `repos`, and
    /// watches `columns` on [`BOARD`].
    ///
    /// # Errors
    ///
    /// Returns an error when any onboarding step fails.
    pub async fn onboard(&self, repos: &[u64], columns: &[&str]) -> eyre::Result<AccountId> {
        let owner = AccountId::new();
        self.registry
            .register_credential(owner, ServiceKind::CodeReview, "gh-token")
            .await
            .wrap_err("link code-review service")?;
        self.registry
            .register_credential(owner, ServiceKind::TaskBoard, "tr-token")
            .await
            .wrap_err("link task board")?;
        for repo in repos {
            self.registry
                .register_repository(owner, *repo)
                .await
                .wrap_err_with(|| format!("register repository {repo}"))?;
        }

        let catalog = columns
            .iter()
            .map(|column| -> eyre::Result<ColumnSummary> {
                Ok(ColumnSummary {
                    id: ColumnId::new(*column)?,
                    name: format!("Column {column}"),
                })
            })
            .collect::<eyre::Result<Vec<_>>>()?;
        self.task_board.add_board(
            BoardSummary {
                id: BoardId::new(BOARD)?,
                name: "Product".to_owned(),
            },
            catalog,
        )?;
        for column in columns {
            self.registry
                .watch_column(WatchColumnRequest::new(owner, BOARD, *column))
                .await
                .wrap_err_with(|| format!("watch column {column}"))?;
        }
        Ok(owner)
    }

    /// Delivers a change-opened event for change `change` on `repo`.
    ///
    /// # Errors
    ///
    /// Returns an error when the reconciler rejects the event.
    pub async fn open_change(&self, change: u64, repo: u64, sha: &str) -> eyre::Result<()> {
        self.reconciler
            .handle_change_opened(&change_opened(change, repo, sha)?)
            .await
            .wrap_err_with(|| format!("open change {change}"))?;
        Ok(())
    }

    /// Links a change to a watched column on behalf of `owner`.
    ///
    /// # Errors
    ///
    /// Returns an error when the link is rejected.
    pub async fn link(&self, owner: AccountId, change: u64, column: &str) -> eyre::Result<()> {
        self.reconciler
            .link_review(&LinkReviewRequest {
                requested_by: owner,
                target: LinkTarget::Change(ChangeId::new(change)?),
                column_id: ColumnId::new(column)?,
            })
            .await
            .wrap_err_with(|| format!("link change {change} to {column}"))?;
        Ok(())
    }

    /// Delivers a card-moved event and returns the fan-out report.
    ///
    /// # Errors
    ///
    /// Returns an error when the delivery fails or the column is not
    /// watched.
    pub async fn move_card(&self, column: &str, actor: &str) -> eyre::Result<FanOutReport> {
        match self
            .reconciler
            .handle_column_card_moved(&card_moved(column, actor)?)
            .await?
        {
            CardMovedOutcome::Reconciled(report) => Ok(report),
            other => Err(eyre::eyre!("expected a fan-out report, got {other:?}")),
        }
    }
}

impl Default for Stack {
    fn default() -> Self {
        Self::new()
    }
}

/// Provides a freshly wired application.
#[fixture]
pub fn stack() -> Stack {
    Stack::new()
}

/// Builds the raw body of a change-opened delivery.
#[must_use]
pub fn change_opened_body(change: u64, repo: u64, sha: &str) -> Vec<u8> {
    json!({
        "action": "opened",
        "pull_request": {
            "id": change,
            "head": {
                "sha": sha,
                "ref": "feature/x",
                "repo": { "id": repo, "statuses_url": STATUSES_URL }
            }
        }
    })
    .to_string()
    .into_bytes()
}

/// Builds the raw body of a card-moved delivery.
#[must_use]
pub fn card_moved_body(column: &str, actor: &str) -> Vec<u8> {
    json!({
        "action": {
            "type": "updateCard",
            "data": { "listAfter": { "id": column } },
            "memberCreator": { "fullName": actor, "username": "someone" }
        }
    })
    .to_string()
    .into_bytes()
}

/// Decodes a change-opened event.
///
/// # Errors
///
/// Returns an error when the body does not decode.
pub fn change_opened(change: u64, repo: u64, sha: &str) -> eyre::Result<PullRequestEvent> {
    Ok(PullRequestEvent::from_slice(&change_opened_body(
        change, repo, sha,
    ))?)
}

/// Decodes a card-moved event.
///
/// # Errors
///
/// Returns an error when the body does not decode.
pub fn card_moved(column: &str, actor: &str) -> eyre::Result<CardMovedEvent> {
    Ok(CardMovedEvent::from_slice(&card_moved_body(column, actor))?)
}

/// Builds a change id.
///
/// # Errors
///
/// Returns an error for zero.
pub fn change_id(value: u64) -> eyre::Result<ChangeId> {
    Ok(ChangeId::new(value)?)
}
