pub mod endpoint_cache;

pub use endpoint_cache::EndpointCache;
