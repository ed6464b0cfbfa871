//! Command-line client for the task API.

pub mod api;
pub mod token_file;

use clap::Subcommand;
use tracing::warn;
use uuid::Uuid;

use crate::auth::dto::{LoginRequest, RegisterRequest};
use crate::tasks::dto::{TaskResponse, UpdateTaskRequest};
use api::ApiClient;
use token_file::TokenFile;

#[derive(Debug, Subcommand)]
pub enum ClientCommand {
    /// Create an account
    Register {
        username: String,
        password: String,
        #[arg(long)]
        email: String,
    },
    /// Log in and store the session token
    Login { username: String, password: String },
    /// End the current session and forget the token
    Logout,
    /// Show the logged-in user
    Whoami,
    /// Show a user's public profile
    User { id: Uuid },
    /// List your tasks
    List,
    /// Show one task
    Get { id: Uuid },
    /// Create a task
    Create {
        #[arg(required = true, num_args = 1..)]
        title: Vec<String>,
    },
    /// Change a task's title or completion state
    Update {
        id: Uuid,
        #[arg(long)]
        title: Option<String>,
        #[arg(long, conflicts_with = "undone")]
        done: bool,
        #[arg(long)]
        undone: bool,
    },
    /// Delete a task
    Delete { id: Uuid },
}

pub async fn run(command: ClientCommand, server: &str, tokens: &TokenFile) -> anyhow::Result<()> {
    let api = ApiClient::new(server)?;

    match command {
        ClientCommand::Register {
            username,
            password,
            email,
        } => {
            let resp = api
                .register(&RegisterRequest {
                    username,
                    password,
                    email,
                })
                .await?;
            println!("User registered: {}", resp.id);
        }
        ClientCommand::Login { username, password } => {
            let resp = api.login(&LoginRequest { username, password }).await?;
            tokens.save(&resp.token)?;
            println!(
                "Logged in. Session valid until {}; token saved to {}.",
                resp.expires_at,
                tokens.path().display()
            );
        }
        ClientCommand::Logout => {
            let token = tokens.require()?;
            let outcome = api.logout(&token).await;
            tokens.clear()?;
            if let Err(e) = outcome {
                warn!(error = %e, "server did not confirm logout");
                println!("Local token removed; server said: {e}");
            } else {
                println!("Logged out.");
            }
        }
        ClientCommand::Whoami => {
            let me = api.me(&tokens.require()?).await?;
            println!("{} <{}> ({})", me.username, me.email, me.id);
        }
        ClientCommand::User { id } => {
            let user = api.user(id).await?;
            println!("{} <{}> ({})", user.username, user.email, user.id);
        }
        ClientCommand::List => {
            let tasks = api.list_tasks(&tokens.require()?).await?;
            if tasks.is_empty() {
                println!("No tasks.");
            }
            for task in &tasks {
                println!("{}", render(task));
            }
        }
        ClientCommand::Get { id } => {
            let task = api.get_task(&tokens.require()?, id).await?;
            println!("{}", render(&task));
        }
        ClientCommand::Create { title } => {
            let task = api.create_task(&tokens.require()?, &title.join(" ")).await?;
            println!("Task created: {}", render(&task));
        }
        ClientCommand::Update {
            id,
            title,
            done,
            undone,
        } => {
            let body = update_body(title, done, undone);
            let task = api.update_task(&tokens.require()?, id, &body).await?;
            println!("Task updated: {}", render(&task));
        }
        ClientCommand::Delete { id } => {
            api.delete_task(&tokens.require()?, id).await?;
            println!("Task deleted: {id}");
        }
    }
    Ok(())
}

fn update_body(title: Option<String>, done: bool, undone: bool) -> UpdateTaskRequest {
    let completed = match (done, undone) {
        (true, _) => Some(true),
        (_, true) => Some(false),
        _ => None,
    };
    UpdateTaskRequest { title, completed }
}

fn render(task: &TaskResponse) -> String {
    let mark = if task.completed { "x" } else { " " };
    format!("[{}] {}  ({})", mark, task.title, task.id)
}
