/// Alias for `Result<T, CoreError>`.
pub type CoreResult<T> = Result<T, CoreError>;

/// Errors raised at the string boundary of the data model.
///
/// Inside the engine every body part, resource and component is a closed
/// enum, so these only surface when parsing names supplied from outside.
#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    /// The name does not match any body part.
    #[error("unknown body part: \"{0}\"")]
    UnknownBodyPart(String),

    /// The name does not match any resource kind.
    #[error("unknown resource: \"{0}\"")]
    UnknownResource(String),

    /// The name does not match any component kind.
    #[error("unknown component: \"{0}\"")]
    UnknownComponent(String),
}
