pub mod hubspot_client;

pub use hubspot_client::{build_payload, interpret_response, HubSpotTarget, PageContext, SubmissionPayload};
