pub mod check;
pub mod init;
pub mod serve;

use clap::Subcommand;

#[derive(Subcommand)]
pub enum Command {
    /// Serve the object storage API
    Serve(serve::ServeArgs),
    /// Write a configuration file for one backend
    Init(init::InitArgs),
    /// Verify the configured backend is reachable
    Check(check::CheckArgs),
}
