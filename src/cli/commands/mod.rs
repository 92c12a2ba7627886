pub mod auth;
pub mod sensor;
pub mod server;
pub mod users;
pub mod watch;
