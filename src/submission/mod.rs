pub mod controller;
pub mod model;

pub use controller::SubmissionController;
pub use model::{PendingSubmission, SubmissionError, SubmissionOutcome, SubmissionState};
