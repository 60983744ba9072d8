//! fsec CLI tools: protocol demo, password keys, challenge/response.

#![forbid(unsafe_code)]

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use fsec_auth::password::{self, PasswordKey, PasswordParams};
use fsec_crypto::{import_peer_identity, Identity};
use rand::rngs::OsRng;
use tracing::{info, warn};

#[derive(Parser, Debug)]
#[command(name = "fsec")]
#[command(about = "fsec CLI tools")]
struct Args {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run a full handshake between two in-process identities
    Demo {
        /// Message sent from the first party to the second
        #[arg(short, long, default_value = "hello world")]
        message: String,
    },

    /// Derive a salted password key and print it as salt_hex:key_hex
    HashPassword {
        #[arg(long, env = "FSEC_PASSWORD", hide_env_values = true)]
        password: String,

        /// PBKDF2 iteration count
        #[arg(long, env = "FSEC_ITERATIONS", default_value_t = PasswordParams::DEFAULT_ITERATIONS)]
        iterations: u32,
    },

    /// Check a password against a stored salt_hex:key_hex
    VerifyPassword {
        /// Stored key as printed by hash-password
        #[arg(long)]
        hash: String,

        #[arg(long, env = "FSEC_PASSWORD", hide_env_values = true)]
        password: String,

        /// PBKDF2 iteration count used when the key was derived
        #[arg(long, env = "FSEC_ITERATIONS", default_value_t = PasswordParams::DEFAULT_ITERATIONS)]
        iterations: u32,
    },

    /// Challenge every client that connects (verifier side)
    ServeChallenge {
        /// Listen address (host:port)
        #[arg(short, long, default_value = "127.0.0.1:7400")]
        listen: String,

        #[arg(long, env = "FSEC_PASSWORD", hide_env_values = true)]
        password: String,
    },

    /// Answer a server's challenge (prover side)
    Authenticate {
        /// Server address (host:port)
        #[arg(short, long)]
        server: String,

        #[arg(long, env = "FSEC_PASSWORD", hide_env_values = true)]
        password: String,
    },

    /// Show version information
    Version,
}

fn main() -> Result<()> {
    fsec_common::init_tracing();

    let args = Args::parse();

    match args.command {
        Command::Demo { message } => demo(&message)?,
        Command::HashPassword {
            password,
            iterations,
        } => {
            let params = PasswordParams {
                iterations,
                ..PasswordParams::default()
            };
            let key = password::derive_key(&password, &params, &mut OsRng)?;
            println!("{key}");
        }
        Command::VerifyPassword {
            hash,
            password,
            iterations,
        } => {
            let stored: PasswordKey = hash.parse().context("invalid --hash")?;
            let params = PasswordParams {
                iterations,
                key_len: stored.key.len(),
                salt_len: stored.salt.len(),
            };
            if !password::match_password(&password, &stored, &params) {
                anyhow::bail!("password does not match");
            }
            println!("ok");
        }
        Command::ServeChallenge { listen, password } => {
            runtime()?.block_on(serve_challenge(&listen, password))?;
        }
        Command::Authenticate { server, password } => {
            runtime()?.block_on(async {
                let mut stream = tokio::net::TcpStream::connect(&server)
                    .await
                    .with_context(|| format!("failed to connect to {server}"))?;
                fsec_auth::challenge::authenticate(&mut stream, &password).await?;
                println!("authenticated to {server}");
                Ok::<(), anyhow::Error>(())
            })?;
        }
        Command::Version => {
            println!("fsec {}", env!("CARGO_PKG_VERSION"));
        }
    }

    Ok(())
}

fn runtime() -> Result<tokio::runtime::Runtime> {
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("failed to build tokio runtime")
}

fn demo(message: &str) -> Result<()> {
    let alice = Identity::generate(&mut OsRng)?;
    let bob = Identity::generate(&mut OsRng)?;
    println!("Alice: {}", alice.id());
    println!("Bob:   {}", bob.id());

    let mut alice_session = alice.new_session_key(&mut OsRng)?;
    let mut bob_session = bob.new_session_key(&mut OsRng)?;
    println!("Signed session key: {} bytes", alice_session.public().len());

    alice_session.peer_session_key(&import_peer_identity(bob.public())?, bob_session.public())?;
    bob_session.peer_session_key(&import_peer_identity(alice.public())?, alice_session.public())?;

    let envelope = alice_session.encrypt(message.as_bytes(), &mut OsRng)?;
    println!("Envelope ({} bytes): {}", envelope.len(), hex::encode(&envelope));

    let received = bob_session.decrypt(&envelope)?;
    println!("Bob received: {}", String::from_utf8_lossy(&received));

    let reply = bob_session.encrypt(b"ack", &mut OsRng)?;
    let received = alice_session.decrypt(&reply)?;
    println!("Alice received: {}", String::from_utf8_lossy(&received));

    Ok(())
}

async fn serve_challenge(listen: &str, password: String) -> Result<()> {
    let listener = tokio::net::TcpListener::bind(listen)
        .await
        .with_context(|| format!("failed to bind {listen}"))?;
    info!(addr = %listener.local_addr()?, "waiting for clients");

    let password = std::sync::Arc::new(password);
    loop {
        let (mut stream, peer) = listener.accept().await?;
        let password = password.clone();
        tokio::spawn(async move {
            match fsec_auth::challenge::challenge(&mut stream, &password, &mut OsRng).await {
                Ok(()) => info!(%peer, "client authenticated"),
                Err(e) => warn!(%peer, error = %e, "client failed authentication"),
            }
        });
    }
}
