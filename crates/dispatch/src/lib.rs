//! Campaign dispatch and delivery tracking: the campaign/delivery-log
//! store, the per-channel dispatch loops, webhook event application, and
//! the email retry path.

pub mod dispatcher;
pub mod store;

pub use dispatcher::{
    CampaignDispatcher, DispatchFailure, DispatchRequest, DispatchResult, GeneratedLink,
    RetryReport, SyncReport,
};
pub use store::{CampaignDraft, CampaignStore, DeliverySummary, EventOutcome};
