pub mod http_store;
pub mod reconciler;
pub mod selection;
pub mod session;
pub mod storage;
