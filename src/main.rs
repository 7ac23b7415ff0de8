use std::io::Write;
use std::path::PathBuf;
use std::time::SystemTime;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use totp_viewer::scheduler::DisplayState;
use totp_viewer::secret::{generate_secret, secret_to_base32};
use totp_viewer::totp::unix_millis;
use totp_viewer::{
    Clipboard, Config, Countdown, JsonFileStore, Osc52Clipboard, OtpConfig, RefreshScheduler,
    Secret, Session, SystemClock, TotpEngine,
};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Config file (defaults to $TOTP_VIEWER_CONFIG, then the user config dir)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Override the credential store location
    #[arg(long, global = true)]
    store: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Load an otpauth://totp/ URI, remember it and watch its codes
    Add { uri: String },
    /// Watch codes for the remembered secret
    Show,
    /// Print the current code once
    Code {
        /// Also copy it to the terminal clipboard
        #[arg(long)]
        copy: bool,
    },
    /// Forget the remembered secret
    Delete,
    /// Create a random secret and print its URI
    Generate {
        #[arg(short, long, default_value = "")]
        label: String,

        #[arg(short, long, default_value = "")]
        issuer: String,

        /// Secret length in bytes
        #[arg(long, default_value_t = 20)]
        length: usize,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let mut config = Config::resolve(args.config.as_deref())?;
    if let Some(store) = args.store {
        config.store_path = store;
    }

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| config.log_filter.as_str().into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    info!(store = %config.store_path.display(), "totp-viewer v{}", env!("CARGO_PKG_VERSION"));

    let store = JsonFileStore::new(&config.store_path);
    let scheduler = RefreshScheduler::new(TotpEngine::default(), SystemClock);
    let mut session = Session::new(store, scheduler);

    match args.command {
        Command::Add { uri } => {
            let otp = session.load(&uri)?;
            println!("Saved {}", describe(&otp));
            watch(&session, config.progress_width).await?;
        }
        Command::Show => match session.restore()? {
            Some(otp) => {
                println!("{}", describe(&otp));
                watch(&session, config.progress_width).await?;
            }
            None => println!("No secret saved. Use `totp-viewer add <URI>` first."),
        },
        Command::Code { copy } => {
            let otp = session
                .stored()?
                .context("No secret saved. Use `totp-viewer add <URI>` first.")?;
            let now = SystemTime::now();
            let secret = Secret::from_base32(&otp.secret)?;
            let code = TotpEngine::default().compute(&secret, now).await?;
            let countdown = Countdown::at(unix_millis(now));

            println!("{} (valid for {} seconds)", code, countdown.remaining_seconds);
            if copy {
                Osc52Clipboard::new(std::io::stdout()).copy_text(code.as_str())?;
            }
        }
        Command::Delete => {
            session.delete()?;
            println!("Secret deleted");
        }
        Command::Generate {
            label,
            issuer,
            length,
        } => {
            anyhow::ensure!(length > 0, "secret length must be positive");
            let otp = OtpConfig {
                secret: secret_to_base32(&generate_secret(length)),
                issuer,
                label,
            };
            println!("{}", otp.to_uri());
        }
    }

    Ok(())
}

fn describe(otp: &OtpConfig) -> String {
    match (otp.issuer.is_empty(), otp.label.is_empty()) {
        (true, true) => "unnamed secret".to_string(),
        (true, false) => otp.label.clone(),
        (false, true) => otp.issuer.clone(),
        (false, false) => format!("{} ({})", otp.label, otp.issuer),
    }
}

/// Redraw the code line on every published state until Ctrl-C.
async fn watch(session: &Session<JsonFileStore>, width: usize) -> anyhow::Result<()> {
    let mut updates = session.scheduler().subscribe();
    let mut stdout = std::io::stdout();
    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);

    loop {
        let state = updates.borrow_and_update().clone();
        print!("\r\x1b[2K  {}", render(&state, width));
        stdout.flush()?;

        tokio::select! {
            changed = updates.changed() => {
                if changed.is_err() {
                    break;
                }
            }
            _ = &mut ctrl_c => break,
        }
    }

    println!();
    Ok(())
}

fn render(state: &DisplayState, width: usize) -> String {
    let filled = ((width as f64) * state.countdown.fraction) as usize;
    let filled = filled.min(width);
    let bar = "|".repeat(width - filled) + &"-".repeat(filled);
    format!(
        "{}  [{}] {} seconds",
        state.code, bar, state.countdown.remaining_seconds
    )
}
