//! Request processing pipeline
//!
//! Every write endpoint funnels through [`ProcessPipeline`]: the request is
//! merged into one map, a registered handler validates it, and either the
//! error carried on the validated data or the handler's `create` result is
//! rendered as a response envelope. Read endpoints use the accessors in
//! [`queryset`] directly.

pub mod pagination;
pub mod process;
pub mod queryset;
pub mod request;
pub mod response;

pub use pagination::{Page, Paginator};
pub use process::{PipelineError, PipelineRequest, PipelineStage, ProcessPipeline};
pub use queryset::{FieldFilter, LookupError, NoFilter, ObjectAccessor, PkScope, QuerysetAccessor, RecordFilter};
pub use request::{merge_request_data, RequestParts};
pub use response::{ApiResponse, Envelope, ResponseBuilder};
