mod commands;
mod save_pipeline;
mod settings;
