mod cli;
mod error_messages;
mod sql;
mod statements;
