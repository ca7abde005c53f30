pub mod device_routes;
pub mod ingest_routes;
