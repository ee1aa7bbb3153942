#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PublicErrorCode {
    InvalidInput,
    MissingInput,
    PayloadTooLarge,
    Internal,
}

impl PublicErrorCode {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::InvalidInput => "INVALID_INPUT",
            Self::MissingInput => "MISSING_INPUT",
            Self::PayloadTooLarge => "PAYLOAD_TOO_LARGE",
            Self::Internal => "INTERNAL",
        }
    }
}
