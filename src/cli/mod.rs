//! Command-line interface for comment-forest.
//!
//! Reads and changes discussions on a comment service. Mutating commands
//! wait for the service's verdict and fail when the change was rolled back.

pub mod args;
pub mod commands;
pub mod utils;

use crate::Result;

pub use args::Command;

/// Main entry point for the CLI application
pub async fn run() -> Result<()> {
    let command = args::parse_args().inspect_err(|_| args::print_usage())?;

    match command {
        Command::Help => {
            args::print_usage();
            Ok(())
        }
        Command::Show {
            context,
            keep_replies,
        } => commands::show(&context, keep_replies).await,
        Command::ShowFile { file, keep_replies } => commands::show_file(&file, keep_replies),
        Command::Comment { context, body } => commands::comment(&context, &body).await,
        Command::Reply {
            context,
            parent,
            body,
        } => commands::reply(&context, parent, &body).await,
        Command::Edit { context, id, body } => commands::edit(&context, id, &body).await,
        Command::Delete { context, id } => commands::delete(&context, id).await,
        Command::Restore { context, id } => commands::restore(&context, id).await,
    }
}
