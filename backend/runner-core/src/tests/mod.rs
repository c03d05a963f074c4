mod command;
mod config;
mod port;
mod resolver;
mod server;
