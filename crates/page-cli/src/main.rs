//! page: age-format file encryption CLI
//!
//! Commands:
//!   encrypt (-r RECIPIENT... | -p) [-a] [-o OUT] [INPUT]  - encrypt a file or stdin
//!   decrypt (-i IDENTITY... | -p) [-o OUT] [INPUT]        - decrypt a file or stdin
//!   keygen [-o OUT]                                       - generate an X25519 identity
//!   config show                                           - display current configuration

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use secrecy::{ExposeSecret, SecretString};
use std::io::{Read, Write};
use std::path::{Path, PathBuf};

use page_core::config::PageConfig;
use page_crypto::{scrypt, x25519, Decryptor, Encryptor, Identity, IdentityKey};

/// Environment variable consulted before prompting for a passphrase.
const PASSPHRASE_ENV: &str = "PAGE_PASSPHRASE";

// ── CLI structure ──────────────────────────────────────────────────────────────

#[derive(Parser, Debug)]
#[command(
    name = "page",
    version,
    about = "Encrypt files to age recipients or a passphrase",
    long_about = "page: encrypt and decrypt age-encryption.org/v1 files with X25519 keys, \
                  ssh-ed25519 keys, or a passphrase"
)]
struct Cli {
    /// Path to page.toml configuration file
    #[arg(long, short = 'c', env = "PAGE_CONFIG", default_value = "page.toml")]
    config: PathBuf,

    /// Log format (json, text); overrides the config file
    #[arg(long, env = "PAGE_LOG_FORMAT")]
    log_format: Option<LogFormat>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Encrypt INPUT (or stdin) to recipients or a passphrase
    Encrypt {
        /// Recipient: age1..., or an "ssh-ed25519 AAAA..." public key line
        #[arg(long, short = 'r', required_unless_present = "passphrase", conflicts_with = "passphrase")]
        recipient: Vec<String>,
        /// Encrypt under a passphrase (from PAGE_PASSPHRASE or a prompt)
        #[arg(long, short = 'p')]
        passphrase: bool,
        /// Emit ASCII armor (also enabled by crypto.armor in the config)
        #[arg(long, short = 'a')]
        armor: bool,
        /// Output path (default: stdout)
        #[arg(long, short = 'o')]
        output: Option<PathBuf>,
        /// Input path (default: stdin)
        input: Option<PathBuf>,
    },

    /// Decrypt INPUT (or stdin) with identity files or a passphrase
    Decrypt {
        /// Identity file: AGE-SECRET-KEY-1... lines or an OpenSSH ed25519 private key
        #[arg(long, short = 'i', required_unless_present = "passphrase", conflicts_with = "passphrase")]
        identity: Vec<PathBuf>,
        /// Decrypt with a passphrase (from PAGE_PASSPHRASE or a prompt)
        #[arg(long, short = 'p')]
        passphrase: bool,
        /// Output path (default: stdout)
        #[arg(long, short = 'o')]
        output: Option<PathBuf>,
        /// Input path (default: stdin)
        input: Option<PathBuf>,
    },

    /// Generate a new X25519 identity
    Keygen {
        /// Output path (default: stdout)
        #[arg(long, short = 'o')]
        output: Option<PathBuf>,
    },

    /// Configuration management
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand, Debug)]
enum ConfigAction {
    /// Print the active configuration as TOML
    Show,
}

#[derive(Clone, Debug, ValueEnum, PartialEq)]
enum LogFormat {
    Json,
    Text,
}

impl LogFormat {
    fn from_config(value: &str) -> Self {
        if value.eq_ignore_ascii_case("json") {
            LogFormat::Json
        } else {
            LogFormat::Text
        }
    }
}

// ── Entry point ────────────────────────────────────────────────────────────────

fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = PageConfig::load(&cli.config)
        .with_context(|| format!("loading config: {}", cli.config.display()))?;

    let format = cli
        .log_format
        .clone()
        .unwrap_or_else(|| LogFormat::from_config(&config.log.format));
    init_logging(&config.log.level, &format);

    match cli.command {
        Commands::Encrypt {
            recipient,
            passphrase,
            armor,
            output,
            input,
        } => cmd_encrypt(
            &config,
            &recipient,
            passphrase,
            armor,
            input.as_deref(),
            output.as_deref(),
        ),
        Commands::Decrypt {
            identity,
            passphrase,
            output,
            input,
        } => cmd_decrypt(&config, &identity, passphrase, input.as_deref(), output.as_deref()),
        Commands::Keygen { output } => cmd_keygen(output.as_deref()),
        Commands::Config {
            action: ConfigAction::Show,
        } => cmd_config_show(&config, &cli.config),
    }
}

fn init_logging(level: &str, format: &LogFormat) {
    use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    // Logs go to stderr; stdout may carry ciphertext or plaintext
    match format {
        LogFormat::Json => {
            tracing_subscriber::registry()
                .with(filter)
                .with(fmt::layer().json().with_writer(std::io::stderr))
                .init();
        }
        LogFormat::Text => {
            tracing_subscriber::registry()
                .with(filter)
                .with(fmt::layer().with_writer(std::io::stderr))
                .init();
        }
    }
}

// ── I/O helpers ────────────────────────────────────────────────────────────────

fn read_input(input: Option<&Path>) -> Result<Vec<u8>> {
    match input {
        Some(path) => {
            std::fs::read(path).with_context(|| format!("reading input: {}", path.display()))
        }
        None => {
            let mut buf = Vec::new();
            std::io::stdin()
                .read_to_end(&mut buf)
                .context("reading stdin")?;
            Ok(buf)
        }
    }
}

fn write_output(output: Option<&Path>, data: &[u8]) -> Result<()> {
    match output {
        Some(path) => {
            std::fs::write(path, data).with_context(|| format!("writing output: {}", path.display()))
        }
        None => {
            let mut stdout = std::io::stdout().lock();
            stdout.write_all(data).context("writing stdout")?;
            stdout.flush().context("flushing stdout")
        }
    }
}

/// Passphrase from PAGE_PASSPHRASE, otherwise an interactive prompt.
fn read_passphrase(confirm: bool) -> Result<SecretString> {
    if let Ok(value) = std::env::var(PASSPHRASE_ENV) {
        tracing::debug!("using passphrase from {PASSPHRASE_ENV}");
        return Ok(SecretString::from(value));
    }

    let first = SecretString::from(
        rpassword::prompt_password("Passphrase: ").context("reading passphrase")?,
    );
    if confirm {
        let second = SecretString::from(
            rpassword::prompt_password("Confirm passphrase: ").context("reading passphrase")?,
        );
        if first.expose_secret() != second.expose_secret() {
            anyhow::bail!("passphrases do not match");
        }
    }
    if first.expose_secret().is_empty() {
        anyhow::bail!("empty passphrase");
    }
    Ok(first)
}

// ── `page encrypt` ─────────────────────────────────────────────────────────────

fn cmd_encrypt(
    config: &PageConfig,
    recipients: &[String],
    passphrase: bool,
    armor: bool,
    input: Option<&Path>,
    output: Option<&Path>,
) -> Result<()> {
    let encryptor = if passphrase {
        Encryptor::with_passphrase(read_passphrase(true)?)
            .with_work_factor(config.crypto.scrypt_work_factor)
    } else {
        let parsed = recipients
            .iter()
            .map(|r| page_crypto::parse_recipient(r).with_context(|| format!("recipient {r:?}")))
            .collect::<Result<Vec<_>>>()?;
        Encryptor::with_recipients(parsed)?
    };

    let plaintext = read_input(input)?;
    let message = encryptor
        .armored(armor || config.crypto.armor)
        .encrypt(&plaintext)
        .context("encrypting")?;

    tracing::info!(
        bytes = plaintext.len(),
        encrypted = message.len(),
        "encrypted input"
    );
    write_output(output, &message)
}

// ── `page decrypt` ─────────────────────────────────────────────────────────────

fn cmd_decrypt(
    config: &PageConfig,
    identity_files: &[PathBuf],
    passphrase: bool,
    input: Option<&Path>,
    output: Option<&Path>,
) -> Result<()> {
    let message = read_input(input)?;
    let decryptor = Decryptor::new(&message).context("parsing encrypted input")?;

    let keys: Vec<IdentityKey> = if passphrase {
        if !decryptor.is_scrypt() {
            anyhow::bail!("input was not encrypted to a passphrase");
        }
        let identity = scrypt::Identity::new(read_passphrase(false)?)
            .with_max_work_factor(config.crypto.max_scrypt_work_factor);
        vec![IdentityKey::Scrypt(identity)]
    } else {
        let mut keys = Vec::new();
        for path in identity_files {
            let identity = Identity::from_file(path)
                .with_context(|| format!("loading identity: {}", path.display()))?;
            keys.extend(identity.keys().iter().cloned());
        }
        keys
    };

    let plaintext = decryptor.decrypt(&keys).context("decrypting")?;
    tracing::info!(bytes = plaintext.len(), "decrypted input");
    write_output(output, &plaintext)
}

// ── `page keygen` ──────────────────────────────────────────────────────────────

fn cmd_keygen(output: Option<&Path>) -> Result<()> {
    let identity = x25519::Identity::generate();
    let secret = identity.to_secret_string()?;
    let public = identity.to_public().to_string();

    let file = SecretString::from(format!(
        "# public key: {public}\n{}\n",
        secret.expose_secret()
    ));
    write_output(output, file.expose_secret().as_bytes())?;
    if output.is_some() {
        eprintln!("Public key: {public}");
    }
    Ok(())
}

// ── `page config show` ─────────────────────────────────────────────────────────

fn cmd_config_show(config: &PageConfig, config_path: &Path) -> Result<()> {
    if config_path.exists() {
        println!("# Configuration from: {}", config_path.display());
    } else {
        println!("# Configuration: defaults (no file at {})", config_path.display());
    }
    println!();
    let rendered = toml::to_string_pretty(config).context("serializing config to TOML")?;
    print!("{rendered}");
    Ok(())
}
