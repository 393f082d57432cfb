use std::process::ExitCode;

use rallyclient::cli::shell::debug_requested;
use rallyclient::cli::Shell;
use rallyclient::core::Environment;
use rallyclient::ShellError;

fn main() -> ExitCode {
    // Reset SIGPIPE to default behavior (terminate silently) for proper Unix piping.
    #[cfg(unix)]
    {
        unsafe {
            libc::signal(libc::SIGPIPE, libc::SIG_DFL);
        }
    }
    let hook = miette::set_hook(Box::new(|_| {
        Box::new(
            miette::MietteHandlerOpts::new()
                .terminal_links(true)
                .unicode(true)
                .context_lines(2)
                .tab_width(4)
                .build(),
        )
    }));

    let argv: Vec<String> = std::env::args_os()
        .skip(1)
        .map(|a| a.to_string_lossy().into_owned())
        .collect();

    let mut shell = Shell::new(Environment::capture());
    let outcome = shell.main(&argv);
    if let Err(err) = hook {
        tracing::warn!(%err, "could not install the error report handler");
    }
    match outcome {
        Ok(code) => ExitCode::from(code),
        Err(ShellError::Argument(err)) => err.exit(),
        Err(err) => {
            if debug_requested(&argv) || shell.debug_by_default() {
                eprintln!("{:?}", miette::Report::new(err));
            } else {
                eprintln!("{err}");
            }
            ExitCode::from(1)
        }
    }
}
