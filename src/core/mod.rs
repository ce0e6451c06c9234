pub mod catalog;
pub mod codec;
pub mod etl;
pub mod lookup;
pub mod pipeline;
pub mod status;

pub use crate::domain::model::{
    Artifact, Cnpj, EnrichedRow, Header, LookupRecord, ParsedTable, Phase, RawRow, RowOutcome,
    RunSummary, Upload,
};
pub use crate::domain::ports::{ConfigProvider, LookupService, StatusObserver, Storage};
pub use crate::utils::error::Result;
