use m9312::PromError;

/// A failure to convert, ready to show the user.
pub struct ConvertError(pub String);

impl From<PromError> for ConvertError {
    fn from(e: PromError) -> Self {
        ConvertError(e.message().to_string())
    }
}
