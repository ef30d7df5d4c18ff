//! Fathom media worker: consumes upload-completion events and drives each
//! media item through download, decode, processing, and status persistence.

mod consumer;
mod event_service;
mod media_store;
mod media_worker;

pub use consumer::{
    BatchHandler, ConsumerConfig, ConsumerError, ContainerController, EventMessage, ShutdownHandle,
};
pub use event_service::MediaWorkerEventService;
pub use media_store::{MediaStore, PgMediaStore};
pub use media_worker::MediaWorker;
