mod cli;
mod commands;
mod display;
