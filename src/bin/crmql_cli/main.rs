mod app;
mod client;
mod commands;
mod context;
mod formatters;
mod repl;
mod utils;

use anyhow::Result;

fn main() -> Result<()> {
    // Le logger est initialisé par l'application, selon la verbosité
    app::run()
}
