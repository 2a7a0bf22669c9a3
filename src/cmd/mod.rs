//! Subcommand dispatch and execution.
//!
//! The [`dispatch`] function routes the parsed CLI to the appropriate
//! subcommand handler: [`render`], [`validate`], or [`init`]. Each handler
//! lives in its own submodule.

pub mod init;
pub mod render;
pub mod validate;

use crate::cli::{Cli, Commands};
use crate::error::SwitchyardError;

pub async fn dispatch(cli: Cli) -> Result<(), SwitchyardError> {
    match cli.command {
        Some(Commands::Render(args)) => render::execute(*args).await,
        Some(Commands::Validate(ref args)) => validate::execute(args).await,
        Some(Commands::Init(ref args)) => init::execute(args),
        None => {
            print_welcome();
            Ok(())
        }
    }
}

fn print_welcome() {
    println!(
        "\n  switchyard {} - routing configuration compiler for HAProxy\n\n  \
         No command provided. To get started:\n\n    \
         switchyard init -t ./tmpl                      Write a starter skeleton\n    \
         switchyard validate services.yaml              Check a services file\n    \
         switchyard render -s services.yaml -t ./tmpl   Compile /cfg/haproxy.cfg\n    \
         switchyard --help                              See all commands and options\n",
        crate::LONG_VERSION
    );
}
