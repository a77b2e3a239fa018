#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Tensor data error: {0}")]
    TensorData(String),

    #[error("Validation error: {0} should be {1}")]
    Validation(String, String),
}

impl Error {
    #[inline]
    pub(crate) fn validation(
        subject: impl Into<String>,
        expectation: impl Into<String>,
    ) -> Self {
        Self::Validation(subject.into(), expectation.into())
    }
}
