use crate::BoxError;

/// Request/response link to a physical motion controller.
///
/// One transport belongs to exactly one controller adapter; nothing shares it.
pub trait Transport {
    fn connect(&mut self) -> Result<(), BoxError>;
    fn disconnect(&mut self) -> Result<(), BoxError>;

    /// Send one command and block for its reply, without the prompt.
    fn query(&mut self, request: &str) -> Result<String, BoxError>;

    /// Cheap liveness check; never fails.
    fn is_alive(&mut self) -> bool;
}
