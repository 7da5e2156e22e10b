//! Application services for the integration registry.

mod registry;

pub use registry::{
    IntegrationRegistryService, IntegrationServiceError, IntegrationServiceResult,
    RevocationOutcome, WatchColumnRequest,
};
