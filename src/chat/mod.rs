pub mod session;

pub use session::{ChatSession, TurnOutcome, APOLOGY};
