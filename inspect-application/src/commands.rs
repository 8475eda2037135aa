pub mod inspect_commands;
