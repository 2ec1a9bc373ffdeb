pub mod campaign_validator;

pub use campaign_validator::{CampaignValidationResult, CampaignValidator, FieldError};
