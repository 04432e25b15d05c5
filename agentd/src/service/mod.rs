//! Task lifecycle service: HTTP intake, the task registry, the background
//! worker, and webhook delivery.

mod http;
mod registry;
mod webhook;
mod worker;

pub use http::{router, AppState};
pub use registry::{RegisterResult, TaskRegistry};
pub use webhook::{SessionData, WebhookPayload, WebhookSender};
pub use worker::execute;
