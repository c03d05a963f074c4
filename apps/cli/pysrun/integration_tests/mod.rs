mod child;
mod gen_command;
