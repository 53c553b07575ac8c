use chrono::NaiveDate;
use clap::Subcommand;
use lifedash::dto::CreateTodoDto;
use lifedash::models::TodoPriority;

use crate::client::LifedashClient;
use crate::output::{self, OutputConfig};

/// Todo commands
#[derive(Subcommand, Debug)]
pub enum TodoCommands {
    /// List todos, open ones first
    List {
        /// Hide completed todos
        #[clap(long)]
        open: bool,
    },
    /// Add a new todo
    Add {
        /// The title of the todo
        title: String,
        /// Due date (YYYY-MM-DD)
        #[clap(long)]
        due: Option<NaiveDate>,
        /// low, medium or high
        #[clap(long)]
        priority: Option<TodoPriority>,
    },
    /// Mark a todo done, or open again if it already is
    Toggle {
        /// The todo ID
        id: String,
    },
    /// Pull todos from the workspace todo database
    Sync,
}

/// Executes a todo command
pub async fn execute(
    client: &LifedashClient,
    cmd: TodoCommands,
    config: &OutputConfig,
) -> Result<(), Box<dyn std::error::Error>> {
    match cmd {
        TodoCommands::List { open } => {
            let mut todos = client.list_todos().await?;
            if open {
                todos.retain(|t| !t.done);
            }
            output::print_todos(&todos, config);
        }

        TodoCommands::Add { title, due, priority } => {
            let todo = client.create_todo(&CreateTodoDto { title, due, priority }).await?;
            output::print_todo(&todo, config);
        }

        TodoCommands::Toggle { id } => {
            let todo = client.toggle_todo(&id).await?;
            output::print_todo(&todo, config);
        }

        TodoCommands::Sync => {
            let report = client.sync_todos().await?;
            output::print_sync_report(&report, config);
        }
    }
    Ok(())
}
