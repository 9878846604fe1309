use derive_more::{Display, Error};

#[derive(Debug, Display, Error)]
pub enum ConfigError {
    #[display("failed to read config file")]
    ReadFile,
    #[display("failed to parse config: {reason}")]
    Parse { reason: String },
    #[display("invalid config: {field}")]
    Validation { field: String },
}

#[derive(Debug, Display, Error)]
pub enum SourceError {
    #[display("request for {symbol} failed")]
    Request { symbol: String },
    #[display("failed to parse response for {symbol}")]
    ResponseParse { symbol: String },
    #[display("no price history for {symbol}")]
    EmptyHistory { symbol: String },
    #[display("no metadata for {symbol}")]
    EmptyMetadata { symbol: String },
    #[display("fetch for {symbol} timed out")]
    Timeout { symbol: String },
    #[display("provider rejected the session for {symbol}")]
    Unauthorized { symbol: String },
}

#[derive(Debug, Display, Error)]
pub enum IndicatorError {
    #[display("insufficient data: need {required}, got {available}")]
    InsufficientData { required: usize, available: usize },
    #[display("invalid parameter: {name}")]
    InvalidParameter { name: String },
}

#[derive(Debug, Display, Error)]
pub enum ReportError {
    #[display("failed to create report file")]
    Create,
    #[display("failed to write report")]
    Write,
}
