pub mod controller_client;
pub mod discoverd;
pub mod http_transport;
pub mod provider_server;
pub mod recorder;
