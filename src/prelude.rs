//! Convenient re-exports for the common call surface: the two facades,
//! queries, responses, the error taxonomy, and configuration.
pub use crate::{
    AsyncBojClient, BojApiError, BojClient, Config, ConfigBuilder, ConfigError, DataCodeQuery, DataCodeResponse,
    DataLayerQuery, DataLayerResponse, FailureCause, MetadataQuery, MetadataResponse, PartialOutcome, TimeSeries,
    TimeSeriesPoint,
};
