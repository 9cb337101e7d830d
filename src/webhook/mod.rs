//! Skill-request handling: answer through the responder, then deliver the
//! answer to the platform's callback URL.

pub mod dispatcher;
pub mod handler;
pub mod payload;

pub use dispatcher::CallbackDispatcher;
pub use handler::{CallbackTask, WebhookResponder};
pub use payload::{CallbackPayload, SkillRequest, UserRequest};
