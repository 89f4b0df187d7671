pub mod constants;
pub mod gamepad;
pub mod hub;
pub mod server;
