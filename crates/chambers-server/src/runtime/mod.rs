pub(crate) mod server_runtime_app;
pub(crate) mod server_runtime_core;
