//! ETM CLI: encrypt-then-MAC envelopes from the shell
//!
//! Usage:
//!   etm keygen  [--output <FILE>]
//!   etm seal    --key <KEY_FILE> [--input <FILE>] [--output <FILE>]
//!   etm open    --key <KEY_FILE> [--input <FILE>] [--output <FILE>]
//!   etm inspect [--input <FILE>]
//!   etm derive  --password <P> --salt <S> [--rounds <N>] [--length <L>] [--hash <H>] [--offset <O>]
//!   etm rand    --min <MIN> --max <MAX>

use std::fs;
use std::io::{self, Read, Write};
use std::num::NonZeroU32;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use etm_envelope::config::{ENV_ITERATIONS, ENV_SUITE};
use etm_envelope::{kdf, wire, Cipher, CipherConfig, HashAlgorithm, Suite};

/// Encrypt-then-MAC envelopes (PBKDF2 + AES-256-CBC + HMAC-SHA256)
#[derive(Parser, Debug)]
#[command(name = "etm")]
#[command(version)]
struct Args {
    /// PBKDF2 iterations used by seal/open
    #[arg(long, global = true, env = ENV_ITERATIONS, default_value = "1000")]
    iterations: NonZeroU32,

    /// Wire suite: standard or compat
    #[arg(long, global = true, env = ENV_SUITE, default_value = "standard")]
    suite: Suite,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, global = true, default_value = "warn")]
    log_level: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Generate a 64-byte base key
    Keygen {
        /// Write the key here (mode 600) instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Encrypt stdin or a file to a base64 blob
    Seal {
        #[arg(short, long)]
        key: PathBuf,
        #[arg(short, long)]
        input: Option<PathBuf>,
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Verify and decrypt a base64 blob
    Open {
        #[arg(short, long)]
        key: PathBuf,
        #[arg(short, long)]
        input: Option<PathBuf>,
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Show blob metadata (no decryption)
    Inspect {
        #[arg(short, long)]
        input: Option<PathBuf>,
    },
    /// Run PBKDF2 and print the derived key as hex
    Derive {
        #[arg(long)]
        password: String,
        #[arg(long)]
        salt: String,
        #[arg(long, default_value = "1000")]
        rounds: u32,
        #[arg(long, default_value = "32")]
        length: usize,
        #[arg(long, default_value = "sha256")]
        hash: HashAlgorithm,
        #[arg(long, default_value = "0")]
        offset: usize,
    },
    /// Print a random integer in [min, max)
    Rand {
        #[arg(long, allow_hyphen_values = true)]
        min: i64,
        #[arg(long, allow_hyphen_values = true)]
        max: i64,
    },
}

fn main() -> ExitCode {
    let args = Args::parse();
    init_logging(&args.log_level);

    let config = CipherConfig::default()
        .with_iterations(args.iterations)
        .with_suite(args.suite);

    let result = match args.command {
        Command::Keygen { output } => cmd_keygen(output.as_deref()),
        Command::Seal { key, input, output } => {
            cmd_seal(config, &key, input.as_deref(), output.as_deref())
        }
        Command::Open { key, input, output } => {
            cmd_open(config, &key, input.as_deref(), output.as_deref())
        }
        Command::Inspect { input } => cmd_inspect(config.suite, input.as_deref()),
        Command::Derive {
            password,
            salt,
            rounds,
            length,
            hash,
            offset,
        } => cmd_derive(&password, &salt, rounds, length, hash, offset),
        Command::Rand { min, max } => cmd_rand(min, max),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {}", e);
            ExitCode::FAILURE
        }
    }
}

/// Logs go to stderr so stdout stays clean for blobs and keys.
fn init_logging(level: &str) {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    let json = std::env::var("ETM_LOG_FORMAT").map(|v| v == "json").unwrap_or(false);
    if json {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(env_filter)
            .with_writer(io::stderr)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(env_filter)
            .with_writer(io::stderr)
            .init();
    }
}

type CmdResult = Result<(), Box<dyn std::error::Error>>;

fn cmd_keygen(output: Option<&Path>) -> CmdResult {
    let key = etm_envelope::generate_key()?;

    match output {
        Some(path) => {
            fs::write(path, key.as_bytes())?;

            // Restrict key file permissions (Unix only)
            #[cfg(unix)]
            {
                use std::os::unix::fs::PermissionsExt;
                let mut perms = fs::metadata(path)?.permissions();
                perms.set_mode(0o600);
                fs::set_permissions(path, perms)?;
            }

            tracing::info!(path = %path.display(), "wrote base key");
            eprintln!("key written to {} (mode 600)", path.display());
        }
        None => println!("{}", key.as_str()),
    }

    Ok(())
}

fn cmd_seal(config: CipherConfig, key: &Path, input: Option<&Path>, output: Option<&Path>) -> CmdResult {
    let base_key = read_key(key)?;
    let plaintext = read_input(input)?;

    let blob = Cipher::with_config(config)
        .seal(&base_key, &plaintext)
        .map_err(|e| format!("encryption failed: {}", e))?;

    if plaintext.is_empty() {
        tracing::warn!("sealed an empty plaintext; it will not open");
    }

    write_output(output, blob.as_bytes(), true)?;
    eprintln!("sealed {} bytes -> {} chars ({} suite)", plaintext.len(), blob.len(), config.suite);
    Ok(())
}

fn cmd_open(config: CipherConfig, key: &Path, input: Option<&Path>, output: Option<&Path>) -> CmdResult {
    let base_key = read_key(key)?;
    let blob = String::from_utf8(read_input(input)?).map_err(|_| "decryption failed")?;

    let plaintext = Cipher::with_config(config)
        .open(&base_key, &blob)
        .map_err(|_| "decryption failed (wrong key, wrong suite/iterations, or corrupted blob)")?;

    write_output(output, &plaintext, false)?;
    Ok(())
}

fn cmd_inspect(suite: Suite, input: Option<&Path>) -> CmdResult {
    let blob = String::from_utf8(read_input(input)?).map_err(|_| "invalid blob encoding")?;
    let info = wire::inspect(&blob, suite).map_err(|_| "invalid blob format")?;

    println!("ETM Envelope");
    println!("============");
    println!("Suite:           {}", info.suite);
    println!("Header:          {} bytes", suite.header_bytes());
    println!("Salt:            {}", info.salt_hex);
    println!("Total Size:      {} bytes ({} base64 chars)", info.total_bytes, blob.trim().len());
    println!("Cipher Bytes:    {}", info.cipher_bytes);
    println!(
        "Plaintext Size:  {}..={} bytes",
        info.cipher_bytes - wire::BLOCK_BYTES,
        info.max_plaintext_bytes
    );

    Ok(())
}

fn cmd_derive(
    password: &str,
    salt: &str,
    rounds: u32,
    length: usize,
    hash: HashAlgorithm,
    offset: usize,
) -> CmdResult {
    let dk = kdf::derive_key(password.as_bytes(), salt.as_bytes(), rounds, length, hash, offset)?;
    println!("{}", hex::encode(&dk[..]));
    Ok(())
}

fn cmd_rand(min: i64, max: i64) -> CmdResult {
    println!("{}", etm_envelope::uniform_random_int(min, max)?);
    Ok(())
}

/// Key files are used verbatim apart from trailing whitespace.
fn read_key(path: &Path) -> Result<Vec<u8>, Box<dyn std::error::Error>> {
    let mut bytes = fs::read(path).map_err(|e| format!("read {}: {}", path.display(), e))?;
    while bytes.last().is_some_and(u8::is_ascii_whitespace) {
        bytes.pop();
    }
    if bytes.is_empty() {
        return Err(format!("key file {} is empty", path.display()).into());
    }
    Ok(bytes)
}

fn read_input(path: Option<&Path>) -> Result<Vec<u8>, Box<dyn std::error::Error>> {
    match path {
        Some(p) => Ok(fs::read(p).map_err(|e| format!("read {}: {}", p.display(), e))?),
        None => {
            let mut buf = Vec::new();
            io::stdin().read_to_end(&mut buf)?;
            Ok(buf)
        }
    }
}

fn write_output(path: Option<&Path>, data: &[u8], newline: bool) -> CmdResult {
    match path {
        Some(p) => fs::write(p, data).map_err(|e| format!("write {}: {}", p.display(), e))?,
        None => {
            let mut out = io::stdout().lock();
            out.write_all(data)?;
            if newline {
                out.write_all(b"\n")?;
            }
            out.flush()?;
        }
    }
    Ok(())
}
