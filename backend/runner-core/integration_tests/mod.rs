mod helpers;
mod runner;
mod server;
