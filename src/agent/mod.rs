pub mod function_calling;

pub use function_calling::{AgentSettings, FunctionCallingAgent};
