#![warn(warnings)]
#![deny(clippy::all)]

pub mod coerce;
pub mod config;
pub mod field;
pub mod form;
pub mod functions;
pub mod gateway;
pub mod host;
pub mod logging;
pub mod store;

pub use config::ClientConfig;
pub use field::{FieldDescriptor, FieldOption, FieldSchema, FieldType};
pub use form::{FormSession, FormState, PanelView, SubmitOutcome, Widget};
pub use functions::{run_function, FunctionContext, ServerlessResponse, ServerlessStatus};
pub use gateway::{GatewayError, LifecyclePhase, LifecycleWriteError, PropertyGateway};
pub use host::{LocalHost, PanelHost};
pub use store::{HubSpotStore, MemoryStore, ObjectStore, PropertyMetadata, RecordSnapshot, StoreError};
