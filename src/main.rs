use std::process;
use std::sync::Arc;

use clap::CommandFactory;
use knifeboot::cli::{self, Commands};
use knifeboot::executor::{CommandExecutor, RealCommandExecutor};
use tracing::error;

fn main() {
    let args = match cli::parse_args() {
        Ok(args) => args,
        Err(e) => {
            eprintln!("{:#}", e);
            process::exit(1);
        }
    };

    let result = match &args.command {
        Commands::Apply(opts) => knifeboot::init_logging(opts.common.log_level).and_then(|_| {
            let executor: Arc<dyn CommandExecutor> = Arc::new(RealCommandExecutor {
                dry_run: opts.dry_run,
            });
            knifeboot::run_apply(opts, executor)
        }),
        Commands::Validate(opts) => knifeboot::init_logging(opts.common.log_level)
            .and_then(|_| knifeboot::run_validate(opts)),
        Commands::Completions(opts) => {
            let mut cmd = cli::Cli::command();
            let name = cmd.get_name().to_string();
            clap_complete::generate(opts.shell, &mut cmd, name, &mut std::io::stdout());
            Ok(())
        }
    };

    if let Err(e) = result {
        error!("{:#}", e);
        process::exit(1);
    }
}
