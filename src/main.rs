//! # csstar
//!
//! Command-line converter between cryoSPARC `.cs` metadata and STAR tables.
//!
//! ## Usage
//!
//! ```bash
//! # Convert particles with their passthrough array
//! csstar convert J42_particles.cs P1_J42_passthrough_particles.cs particles.star
//!
//! # Export a STAR particle table and its stacks
//! csstar link Select/job009/particles.star export/
//!
//! # Inspect or check files
//! csstar info J42_particles.cs
//! csstar validate particles.star
//! ```

mod cli;

use cli::Cli;

fn main() {
    let cli = Cli::parse_args();
    cli::init_logging(cli.loglevel());

    if let Err(e) = cli::dispatch(cli) {
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}
