use std::{error::Error, path::PathBuf};

use clap::{Parser, Subcommand};
use depot::{DatabaseConfig, Store, model::{Developer, PublishState}};

#[derive(Parser)]
#[command(version, about, long_about = None)]
struct Cli {
    /// Path to the store database
    database: PathBuf,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Create the store tables
    Init,
    /// Register a developer account
    AddDeveloper {
        username: String,
        #[arg(long)]
        password: String,
        #[arg(long)]
        email: Option<String>,
        #[arg(long)]
        admin: bool,
    },
    /// Check a developer password
    CheckPassword { username: String, password: String },
    ListDevelopers,
    /// Change the publish state of a plugin version
    SetPublishState {
        plugin: i32,
        version: i32,
        state: PublishState,
    },
}

fn main() -> Result<(), Box<dyn Error>> {
    env_logger::init();

    let cli = Cli::parse();
    let store = Store::open(DatabaseConfig::new(cli.database).with_connections(1))?;

    match cli.command {
        Command::Init => println!("store ready"),
        Command::AddDeveloper {
            username,
            password,
            email,
            admin,
        } => {
            let developer = Developer {
                username: username.to_lowercase(),
                password,
                email: email.unwrap_or_default(),
                is_admin: admin,
                ..Default::default()
            };
            store.create_developer(&developer)?;
            println!("added {}", developer.username);
        }
        Command::CheckPassword { username, password } => {
            let username = username.to_lowercase();
            if store.check_developer_password(&username, &password)? {
                println!("password correct");
            } else {
                eprintln!("password incorrect");
                std::process::exit(1);
            }
        }
        Command::ListDevelopers => {
            for developer in store.get_developers()? {
                let role = if developer.is_admin { "admin" } else { "developer" };
                println!("{}\t{}\t{role}", developer.username, developer.email);
            }
        }
        Command::SetPublishState {
            plugin,
            version,
            state,
        } => match store.get_source(plugin, version)? {
            Some(_) => {
                store.update_source_publish_state(plugin, version, state)?;
                println!("{plugin}/{version} is now {state}");
            }
            None => {
                eprintln!("no source {plugin}/{version}");
                std::process::exit(1);
            }
        },
    }

    store.close();
    Ok(())
}
