//! Interactive mode for the server.
//!
//! Prompts the user for the bind address, port, and data locations before
//! starting the server.

use std::path::PathBuf;

use dialoguer::{Confirm, Input};

use crate::ServerConfig;

/// Runs the server in interactive mode, prompting for configuration.
///
/// Each prompt defaults to the value already in `config`. The answers are
/// applied to `config`, which is then handed to
/// [`super::run_server_with`].
///
/// # Errors
///
/// Returns an `std::io::Result` error if the underlying server fails to
/// start.
#[allow(clippy::future_not_send)]
pub async fn run(mut config: ServerConfig) -> std::io::Result<()> {
    println!("Crash Cause Server");
    println!();

    config.bind_addr = Input::new()
        .with_prompt("Bind address")
        .default(config.bind_addr.clone())
        .interact_text()
        .unwrap_or(config.bind_addr);

    config.port = Input::new()
        .with_prompt("Port")
        .default(config.port)
        .interact_text()
        .unwrap_or(config.port);

    config.data_dir = prompt_dir("Dataset directory", config.data_dir);
    config.model_dir = prompt_dir("Model directory", config.model_dir);

    if !Confirm::new()
        .with_prompt(format!(
            "Start server on {}:{}?",
            config.bind_addr, config.port
        ))
        .default(true)
        .interact()
        .unwrap_or(true)
    {
        println!("Cancelled.");
        return Ok(());
    }

    super::run_server_with(config).await
}

fn prompt_dir(prompt: &str, current: PathBuf) -> PathBuf {
    Input::<String>::new()
        .with_prompt(prompt)
        .default(current.display().to_string())
        .interact_text()
        .map_or(current, PathBuf::from)
}
