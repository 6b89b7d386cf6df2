//! Interactive CLI for creating and managing Telegram client sessions.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use tg_sessions::account::{self, InfoChoice, InfoDetail};
use tg_sessions::api::AccountInfo;
use tg_sessions::grammers::GrammersApi;
use tg_sessions::manager::{self, OutputMode, SessionFormat, StringSource};
use tg_sessions::prompt::{self, Credentials};
use tg_sessions::{login, telethon, Error};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Create a Telethon session file or string session
    Telethon(CreateArgs),
    /// Create a Pyrogram session file or string session
    Pyrogram(CreateArgs),
    /// Log in with an existing session and print the next incoming login code
    Login(SessionArgs),
    /// Set a new Two-Step Verification (2FA) password
    #[command(name = "set-2fa")]
    Set2fa {
        #[command(flatten)]
        session: SessionArgs,
        /// The new 2FA password (prompted when omitted)
        #[arg(long)]
        new_password: Option<String>,
    },
    /// Show account info, connected devices or created groups/channels
    Userinfo {
        #[command(flatten)]
        session: SessionArgs,
        /// Detail section: 1 = devices, 2 = groups/channels, 3 = exit
        #[arg(long)]
        choice: Option<String>,
    },
}

#[derive(Args, Debug)]
struct CreateArgs {
    /// Create a session file
    #[arg(long)]
    session_file: bool,
    /// Generate a string session
    #[arg(long)]
    session_string: bool,
    /// Telegram API ID (https://my.telegram.org)
    #[arg(long)]
    api_id: Option<i32>,
    /// Telegram API hash
    #[arg(long)]
    api_hash: Option<String>,
    /// Phone number in international format (e.g. +1234567890)
    #[arg(long)]
    phone: Option<String>,
    /// 2-Step Verification password, if the account has one
    #[arg(long)]
    password: Option<String>,
}

#[derive(Args, Debug)]
struct SessionArgs {
    /// Existing Telethon session file
    #[arg(long)]
    session: Option<PathBuf>,
    /// Telegram API ID (https://my.telegram.org)
    #[arg(long)]
    api_id: Option<i32>,
    /// Telegram API hash
    #[arg(long)]
    api_hash: Option<String>,
}

fn status(msg: &str) {
    println!("\n―― 🟢 {msg}");
}

fn note(msg: &str) {
    println!("―― {msg}");
}

fn warn(msg: &str) {
    println!("\n―― ⚠️ {msg}");
}

fn fail(msg: &str) {
    println!("\n―― ❌ {msg}");
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "tg_sessions=warn".into()),
        )
        .init();

    let cli = Cli::parse();
    if let Err(err) = run(cli).await {
        match err {
            Error::AmbiguousSessionMode
            | Error::InvalidChoice { .. }
            | Error::InvalidSessionFile { .. }
            | Error::InvalidSessionString { .. }
            | Error::Unauthorized
            | Error::TwoFaAlreadyEnabled => warn(&err.to_string()),
            other => fail(&format!("An error has occurred: {other}")),
        }
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), Error> {
    match cli.command {
        Command::Telethon(args) => create(SessionFormat::Telethon, args).await,
        Command::Pyrogram(args) => create(SessionFormat::Pyrogram, args).await,
        Command::Login(session) => login_cmd(session).await,
        Command::Set2fa {
            session,
            new_password,
        } => set_2fa_cmd(session, new_password).await,
        Command::Userinfo { session, choice } => userinfo_cmd(session, choice).await,
    }
}

async fn create(format: SessionFormat, args: CreateArgs) -> Result<(), Error> {
    // Validate the mode before touching credentials or the network
    let mode = manager::select_output_mode(args.session_file, args.session_string)?;

    let creds = Credentials {
        api_id: args.api_id,
        api_hash: args.api_hash,
        phone: args.phone,
        password: args.password,
    }
    .resolve()?;

    let source = if mode == OutputMode::String {
        note("[1]. Create a string session by logging in");
        note("[2]. Generate a string session from an existing session file");
        let choice = prompt::choice("Choose how you want to create the session string")?;
        StringSource::from_choice(&choice, || {
            prompt::input(&format!("Enter your {format} session file name"))
        })?
    } else {
        StringSource::FreshLogin
    };

    let (api_id, api_hash) = (creds.api_id, creds.api_hash.clone());
    let outcome = manager::create_session(
        format,
        args.session_file,
        args.session_string,
        creds,
        source,
        move || async move { GrammersApi::connect_fresh(api_id, &api_hash).await },
        || prompt::input("Enter the login code you received"),
    )
    .await?;

    if let Some(string) = &outcome.session_string {
        println!("\n{string}");
        status(&format!("{format} string session created successfully!"));
        if outcome.copied_to_clipboard {
            note("🟢 String copied to clipboard!");
        }
    }
    if let Some(file) = &outcome.file {
        status(&format!(
            "{format} session file created successfully: {}",
            file.display()
        ));
    }

    Ok(())
}

/// Resolve the common session-file arguments, prompting for the missing ones.
fn resolve_session_args(args: SessionArgs) -> Result<(i32, String, PathBuf), Error> {
    let api_id = match args.api_id {
        Some(id) => id,
        None => prompt::int_input("Enter your API ID")?,
    };
    let api_hash = match args.api_hash {
        Some(hash) => hash,
        None => prompt::input("Enter your API HASH")?,
    };
    let session = match args.session {
        Some(path) => path,
        None => PathBuf::from(prompt::input("Enter your Telethon session file name")?),
    };
    Ok((api_id, api_hash, session))
}

async fn login_cmd(args: SessionArgs) -> Result<(), Error> {
    let (api_id, api_hash, session) = resolve_session_args(args)?;

    let auth = telethon::read_session_file(&session)?;
    let api = GrammersApi::connect_with_auth(&auth, api_id, &api_hash).await?;

    let code = login::login(api, || {
        status("User authorized!");
        note("Please request a login code in your Telegram app.");
        note("📲 Listening for the incoming code ...");
    })
    .await?;

    match code {
        Some(code) => {
            println!("\n―― Login code received ✅\n―― Your login code: {code}");
        }
        None => warn("Connection closed before a login code arrived."),
    }

    Ok(())
}

async fn set_2fa_cmd(args: SessionArgs, new_password: Option<String>) -> Result<(), Error> {
    let (api_id, api_hash, session) = resolve_session_args(args)?;
    let new_password = match new_password {
        Some(password) => password,
        None => prompt::password("Enter your new 2FA password")?,
    };

    let auth = telethon::read_session_file(&session)?;
    let api = GrammersApi::connect_with_auth(&auth, api_id, &api_hash).await?;

    account::set_two_step_password(api, new_password).await?;
    status("2FA password has been set successfully!");
    Ok(())
}

async fn userinfo_cmd(args: SessionArgs, choice: Option<String>) -> Result<(), Error> {
    let (api_id, api_hash, session) = resolve_session_args(args)?;

    let auth = telethon::read_session_file(&session)?;
    let api = GrammersApi::connect_with_auth(&auth, api_id, &api_hash).await?;

    let report = account::userinfo(api, move |info| {
        print_profile(info);
        let choice = match choice {
            Some(choice) => choice,
            None => prompt::choice("Choose an option by typing its number")?,
        };
        choice.parse::<InfoChoice>()
    })
    .await?;

    match report.detail {
        InfoDetail::Devices(devices) => {
            println!("\n  [CONNECTED DEVICES]\n");
            for device in devices {
                let marker = if device.current { " (current)" } else { "" };
                let official = if device.official_app { "official" } else { "third-party" };
                println!(
                    "  {} {} — {} {} ({official}){marker}",
                    device.device_model, device.system_version, device.app_name, device.app_version
                );
                println!("    Platform: {}", device.platform);
                println!("    IP: {} ({})", device.ip, device.country);
            }
        }
        InfoDetail::Dialogs { created, tally } => {
            for dialog in &created {
                println!("\nName: {}", dialog.title);
                println!("ID: {}", dialog.id);
                match &dialog.username {
                    Some(username) => {
                        println!("Username: @{username}");
                        println!("Link: https://t.me/{username}");
                    }
                    None => {
                        println!("Username: [Private]");
                        println!("Link: [Private]");
                    }
                }
                println!("Creation Date: {}", format_date(dialog.created_at));
            }
            println!(
                "\nPublic Groups: {}\nPrivate Groups: {}\nPublic Channels: {}\nPrivate Channels: {}",
                tally.public_groups,
                tally.private_groups,
                tally.public_channels,
                tally.private_channels
            );
        }
        InfoDetail::None => {}
    }

    Ok(())
}

fn print_profile(info: &AccountInfo) {
    println!("\n  [ACCOUNT INFO]\n");
    println!("  Name: {}", info.name.as_deref().unwrap_or("-"));
    match &info.username {
        Some(username) => println!("  Username: @{username}"),
        None => println!("  Username: -"),
    }
    println!("  ID: {}", info.user_id);
    match &info.phone {
        Some(phone) => println!("  Phone Number: +{phone}"),
        None => println!("  Phone Number: -"),
    }
    println!("\n1. View all connected devices.\n2. See a list of created groups and channels.\n3. Exit.");
}

fn format_date(timestamp: i64) -> String {
    chrono::DateTime::from_timestamp(timestamp, 0)
        .map(|date| date.format("%Y-%m-%d").to_string())
        .unwrap_or_else(|| "-".to_string())
}
