//! Shared world state for product sign-off BDD scenarios.

use std::sync::Arc;

use mockable::DefaultClock;
use product_signoff::{
    integration::{
        adapters::memory::{
            InMemoryIntegrationRepository, RecordingCodeReviewClient, RecordingTaskBoardClient,
        },
        domain::AccountId,
        services::IntegrationRegistryService,
    },
    reconciler::{
        CardMovedOutcome, EventReconciler, ReconcileError, ReconcilerSettings,
    },
    review::adapters::memory::InMemoryReviewStore,
};
use rstest::fixture;
use serde_json::json;

/// Callback URL registered for watched columns.
pub const CALLBACK_URL: &str = "https://signoff.example.com/trello/integration";

/// Status URL template shared by scenario repositories.
pub const STATUSES_URL: &str = "https://api.github.com/repos/acme/shop/statuses/{sha}";

/// Registry service used by the BDD world.
pub type TestRegistry = IntegrationRegistryService<
    InMemoryIntegrationRepository,
    InMemoryReviewStore,
    RecordingCodeReviewClient,
    RecordingTaskBoardClient,
    DefaultClock,
>;

/// Reconciler used by the BDD world.
pub type TestReconciler = EventReconciler<
    InMemoryIntegrationRepository,
    InMemoryReviewStore,
    RecordingCodeReviewClient,
    DefaultClock,
>;

/// Scenario world for sign-off behaviour tests.
pub struct SignoffWorld {
    pub store: Arc<InMemoryReviewStore>,
    pub code_review: Arc<RecordingCodeReviewClient>,
    pub task_board: Arc<RecordingTaskBoardClient>,
    pub registry: TestRegistry,
    pub reconciler: TestReconciler,
    pub owner: Option<AccountId>,
    pub last_card_moved: Option<Result<CardMovedOutcome, ReconcileError>>,
}

impl SignoffWorld {
    /// Creates a world with no accounts and no records.
    #[must_use]
    pub fn new() -> Self {
        let repository = Arc::new(InMemoryIntegrationRepository::new());
        let store = Arc::new(InMemoryReviewStore::new());
        let code_review = Arc::new(RecordingCodeReviewClient::new());
        let task_board = Arc::new(RecordingTaskBoardClient::new());
        let registry = IntegrationRegistryService::new(
            Arc::clone(&repository),
            Arc::clone(&store),
            Arc::clone(&code_review),
            Arc::clone(&task_board),
            Arc::new(DefaultClock),
            CALLBACK_URL,
        );
        let reconciler = EventReconciler::new(
            repository,
            Arc::clone(&store),
            Arc::clone(&code_review),
            Arc::new(DefaultClock),
            ReconcilerSettings::default(),
        );
        Self {
            store,
            code_review,
            task_board,
            registry,
            reconciler,
            owner: None,
            last_card_moved: None,
        }
    }

    /// Returns the onboarded account.
    ///
    /// # Errors
    ///
    /// Returns an error when no account was onboarded.
    pub fn owner(&self) -> Result<AccountId, eyre::Report> {
        self.owner
            .ok_or_else(|| eyre::eyre!("missing onboarded account in scenario world"))
    }
}

impl Default for SignoffWorld {
    fn default() -> Self {
        Self::new()
    }
}

/// Fixture that creates a new scenario world.
#[fixture]
pub fn world() -> SignoffWorld {
    SignoffWorld::default()
}

/// Runs an async operation within sync step definitions.
pub fn run_async<T>(future: impl std::future::Future<Output = T>) -> T {
    tokio::task::block_in_place(|| tokio::runtime::Handle::current().block_on(future))
}

/// Deterministic head sha for a change.
#[must_use]
pub fn sha_for(change: u64) -> String {
    format!("{change:07x}")
}

/// Raw change-opened payload.
#[must_use]
pub fn change_opened_payload(change: u64, branch: &str, repo: u64) -> Vec<u8> {
    json!({
        "action": "opened",
        "pull_request": {
            "id": change,
            "head": {
                "sha": sha_for(change),
                "ref": branch,
                "repo": { "id": repo, "statuses_url": STATUSES_URL }
            }
        }
    })
    .to_string()
    .into_bytes()
}

/// Raw card-moved payload.
#[must_use]
pub fn card_moved_payload(actor: &str, column: &str) -> Vec<u8> {
    json!({
        "action": {
            "type": "updateCard",
            "data": { "listAfter": { "id": column } },
            "memberCreator": { "fullName": actor }
        }
    })
    .to_string()
    .into_bytes()
}
