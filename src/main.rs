use anyhow::Result;
use minishell::Interpreter;
use tracing_subscriber::EnvFilter;

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let mut sh = Interpreter::new()?;
    sh.bootstrap();
    sh.repl()?;
    Ok(())
}
