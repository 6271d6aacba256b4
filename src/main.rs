use clap::Parser;
use miette::Result;
use npi::cli::{Cli, Commands};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

fn main() -> Result<()> {
    // Reset SIGPIPE to default behavior (terminate silently) for proper Unix piping.
    // Without this, piping to `head`, `grep -q`, etc. causes a panic on broken pipe.
    #[cfg(unix)]
    {
        unsafe {
            libc::signal(libc::SIGPIPE, libc::SIG_DFL);
        }
    }
    // Install miette's fancy error handler
    miette::set_hook(Box::new(|_| {
        Box::new(
            miette::MietteHandlerOpts::new()
                .terminal_links(true)
                .unicode(true)
                .context_lines(2)
                .tab_width(4)
                .build(),
        )
    }))?;

    let cli = Cli::parse();
    let global = cli.global;

    // Logs go to stderr; RUST_LOG overrides the default level
    let default_level = if global.verbose { "npi=info" } else { "npi=warn" };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_level.into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    match cli.command {
        Commands::Init(args) => npi::cli::commands::init::run(args),
        Commands::Scan(args) => npi::cli::commands::scan::run(args, &global),
        Commands::Resolve(args) => npi::cli::commands::resolve::run(args, &global),
        Commands::Pack(args) => npi::cli::commands::pack::run(args, &global),
        Commands::Run(args) => npi::cli::commands::run::run(args, &global),
        Commands::Status(args) => npi::cli::commands::status::run(args, &global),
        Commands::Completions(args) => npi::cli::commands::completions::run(args),
    }
}
