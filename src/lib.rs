pub mod agent;
pub mod chat;
pub mod core;
pub mod llm;
pub mod rag;
pub mod responder;
pub mod state;
pub mod tools;
pub mod webhook;

#[cfg(test)]
mod test_support;
