pub mod mock_server;

mod client_http;
mod executor;
mod query_http;
