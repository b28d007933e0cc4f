//! Error types for the routing layer.

/// Errors raised while registering routes.
///
/// Resolution never fails: a path nothing matches is a miss (`None`),
/// and the dispatcher decides what a miss means.
#[derive(Debug, thiserror::Error)]
pub enum RouterError {
    /// A static router already has a handler for this exact path.
    #[error("static route {path} is already registered under top-level route {top_level}")]
    DuplicateRoute { top_level: String, path: String },

    /// An empty match expression would match every path (dynamic) or
    /// none (static); both are registration mistakes.
    #[error("route match expression must not be empty")]
    EmptyExpression,
}
